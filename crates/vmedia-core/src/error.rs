//! Driver error type.

use thiserror::Error;

use crate::protocol::CommandError;
use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum VmediaError {
    #[error("Node driver_info is missing required parameters: {}", .missing.join(", "))]
    MissingParameter { missing: Vec<String> },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("No virtual media driver for vendor {vendor:?} product family {product_family:?}")]
    UnsupportedHardware {
        vendor: String,
        product_family: String,
    },

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("IPMI failure: {0}")]
    Transport(#[from] TransportError),

    /// The controller never answered again after a cold reset.
    #[error("BMC unresponsive after cold reset ({attempts} liveness probes)")]
    ControllerUnresponsive { attempts: u32 },

    /// The controller reported a share-level failure (NFS unreachable,
    /// export missing). Fix the share, not the hardware.
    #[error("NFS mount failed: {reason}")]
    NfsMountFailed { reason: String },

    #[error("Failed to attach virtual media after {attempts} attempts")]
    AttachFailed { attempts: u32 },
}

impl VmediaError {
    /// Conditions no automatic retry can fix.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VmediaError::ControllerUnresponsive { .. } | VmediaError::NfsMountFailed { .. }
        )
    }
}

pub type Result<T, E = VmediaError> = std::result::Result<T, E>;
