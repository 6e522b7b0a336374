//! Transport layer module.

pub mod ipmitool;
pub mod mock;
pub mod traits;

pub use ipmitool::IpmitoolTransport;
pub use mock::{MockReply, MockTransport};
pub use traits::{BmcTransport, TransportError};
