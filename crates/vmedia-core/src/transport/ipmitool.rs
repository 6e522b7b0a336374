//! ipmitool-based transport implementation.

use std::process::Command;

use tracing::{debug, instrument};

use super::traits::{BmcTransport, TransportError};
use crate::node::IpmiConnection;
use crate::protocol::{IpmiCommand, RawResponse};

/// Transport that runs one `ipmitool` process per command.
///
/// The password is handed over through `IPMI_PASSWORD` (`-E`) so it never
/// shows up in the process list.
pub struct IpmitoolTransport {
    program: String,
    conn: IpmiConnection,
}

impl IpmitoolTransport {
    pub fn new(conn: IpmiConnection) -> Self {
        Self::with_program("ipmitool", conn)
    }

    /// Use a different binary (wrapper scripts, absolute paths).
    pub fn with_program(program: impl Into<String>, conn: IpmiConnection) -> Self {
        Self {
            program: program.into(),
            conn,
        }
    }

    fn connection_args(&self) -> Vec<String> {
        let mut args = vec![
            "-I".to_string(),
            self.conn.interface.clone(),
            "-H".to_string(),
            self.conn.address.clone(),
        ];
        if !self.conn.username.is_empty() {
            args.push("-U".into());
            args.push(self.conn.username.clone());
        }
        if !self.conn.password.is_empty() {
            args.push("-E".into());
        }
        if let Some(port) = self.conn.port {
            args.push("-p".into());
            args.push(port.to_string());
        }
        args
    }
}

impl BmcTransport for IpmitoolTransport {
    #[instrument(skip(self), fields(host = %self.conn.address, command = %command))]
    fn send(&self, command: &IpmiCommand) -> Result<RawResponse, TransportError> {
        let output = Command::new(&self.program)
            .args(self.connection_args())
            .args(command.args())
            .env("IPMI_PASSWORD", &self.conn.password)
            .output()
            .map_err(|e| TransportError::SpawnFailed {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(TransportError::CommandFailed {
                command: command.to_string(),
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        debug!(stdout = %stdout.trim(), "Command complete");
        Ok(RawResponse { stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> IpmiConnection {
        IpmiConnection {
            address: "10.1.1.5".into(),
            username: "admin".into(),
            password: "secret".into(),
            port: Some(1623),
            interface: "lanplus".into(),
        }
    }

    #[test]
    fn test_connection_args_hide_password() {
        let t = IpmitoolTransport::new(conn());
        let args = t.connection_args();
        assert_eq!(
            args,
            ["-I", "lanplus", "-H", "10.1.1.5", "-U", "admin", "-E", "-p", "1623"]
        );
        assert!(!args.iter().any(|a| a == "secret"));
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let t = IpmitoolTransport::with_program("/nonexistent/ipmitool", conn());
        let err = t.send(&IpmiCommand::ControllerInfo).unwrap_err();
        assert!(matches!(err, TransportError::SpawnFailed { .. }));
    }
}
