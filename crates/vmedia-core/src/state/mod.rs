//! State machine module.

pub mod machine;
pub mod stages;
pub mod status;

pub use machine::{MediaContext, MediaStateMachine};
pub use stages::{AttachRecord, AttachState, AttachStep, DetachStep, NetworkShare, Outcome};
pub use status::MountStatus;
