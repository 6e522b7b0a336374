//! vmedia-core: BMC virtual media attach/detach over OEM IPMI raw commands.
//!
//! Drives a baseboard management controller so that a boot image on an NFS
//! share appears to the server as a locally attached CD/floppy, and tears
//! the configuration down again afterwards.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Protocol**: OEM command catalog, `ipmitool` command model, response parsing
//! - **Transport**: BMC communication abstraction (ipmitool, mock)
//! - **Retry**: Bounded poll-until-confirmed loop
//! - **State**: Get/set primitives with read-back confirmation, attach stages
//! - **Recovery**: Cold reset and liveness wait
//! - **Vendor**: Per hardware family attach/detach sequences
//! - **Events**: Observer pattern for UI decoupling
//! - **Session**: High-level orchestrator
//!
//! # Example
//!
//! ```no_run
//! use vmedia_core::{DriverConfig, NodeHandle, VmediaSession};
//!
//! let node = NodeHandle::new("8f1c", "compute-0")
//!     .with_info("provisioning_server", "192.168.1.10")
//!     .with_info("provisioning_server_http_port", "8080")
//!     .with_info("vendor", "ampere")
//!     .with_info("product_family", "falcon")
//!     .with_info("ipmi_address", "10.0.0.5");
//!
//! let session = VmediaSession::new(node, DriverConfig::default()).expect("bad node");
//! session.setup_for_boot("deploy.img").expect("attach failed");
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod node;
pub mod protocol;
pub mod recovery;
pub mod retry;
pub mod session;
pub mod state;
pub mod transport;
pub mod vendor;

// Re-exports for convenience
pub use config::{DriverConfig, TimingConfig};
pub use error::{Result, VmediaError};
pub use events::{
    LogLevel, NullObserver, Operation, RecordingObserver, TracingObserver, VmediaEvent,
    VmediaObserver,
};
pub use node::{DriverInfo, IpmiConnection, NodeHandle};
pub use protocol::{BootDevice, IpmiCommand, MediaType, RawCommand, RawResponse};
pub use recovery::RecoveryController;
pub use retry::{PollPolicy, RecordingSleeper, Sleeper, ThreadSleeper, poll_until};
pub use session::VmediaSession;
pub use state::{AttachState, AttachStep, DetachStep, MountStatus, Outcome};
pub use transport::{BmcTransport, IpmitoolTransport, MockReply, MockTransport, TransportError};
pub use vendor::{VirtualMediaHw, hw_for};
