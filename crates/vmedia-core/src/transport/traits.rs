//! BMC transport layer abstraction.
//!
//! Defines the `BmcTransport` trait for management-controller communication,
//! allowing different implementations (ipmitool, mock, etc.).

use crate::protocol::{IpmiCommand, RawResponse};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to spawn {program}: {message}")]
    SpawnFailed { program: String, message: String },

    #[error("Command `{command}` failed (exit code {code:?}): {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Controller unreachable")]
    Disconnected,
}

/// Abstract BMC transport interface.
///
/// One round-trip per call: the command is an opaque pre-encoded frame
/// and the response is raw text to be parsed by the caller. Calls block
/// and may take seconds.
pub trait BmcTransport: Send + Sync {
    fn send(&self, command: &IpmiCommand) -> Result<RawResponse, TransportError>;
}

impl<T: BmcTransport + ?Sized> BmcTransport for &T {
    fn send(&self, command: &IpmiCommand) -> Result<RawResponse, TransportError> {
        (**self).send(command)
    }
}
