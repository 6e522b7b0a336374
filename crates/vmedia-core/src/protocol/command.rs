//! Command frames sent to the BMC.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::constants::MAX_DEVICE_SLOTS;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown media type tag: {0:?}")]
    UnknownMediaType(String),

    #[error("Slot count {count} out of range 0..={max}")]
    SlotCountOutOfRange { count: u8, max: u8 },

    #[error("Slot count of {0} media is not settable")]
    NotSettable(MediaType),

    #[error("Empty {0} argument")]
    EmptyArgument(&'static str),
}

/// Virtual media device kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Cd,
    Floppy,
    HardDisk,
}

impl MediaType {
    /// Short tag used in configuration and logs.
    pub fn tag(&self) -> &'static str {
        match self {
            MediaType::Cd => "CD",
            MediaType::Floppy => "FD",
            MediaType::HardDisk => "HD",
        }
    }

    /// Validate a slot count for this media type.
    pub fn check_slot_count(&self, count: u8) -> Result<(), CommandError> {
        if *self == MediaType::Floppy {
            return Err(CommandError::NotSettable(*self));
        }
        if count > MAX_DEVICE_SLOTS {
            return Err(CommandError::SlotCountOutOfRange {
                count,
                max: MAX_DEVICE_SLOTS,
            });
        }
        Ok(())
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for MediaType {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CD" => Ok(MediaType::Cd),
            "FD" => Ok(MediaType::Floppy),
            "HD" => Ok(MediaType::HardDisk),
            _ => Err(CommandError::UnknownMediaType(s.to_string())),
        }
    }
}

/// Boot device selectable through `chassis bootdev`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootDevice {
    Floppy,
}

impl BootDevice {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootDevice::Floppy => "floppy",
        }
    }
}

/// A raw (vendor OEM) IPMI request: network function, command and data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawCommand {
    pub netfn: u8,
    pub cmd: u8,
    pub data: Vec<u8>,
}

impl RawCommand {
    pub fn new(netfn: u8, cmd: u8, data: impl Into<Vec<u8>>) -> Self {
        Self {
            netfn,
            cmd,
            data: data.into(),
        }
    }

    /// All frame bytes in wire order.
    pub fn bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() + 2);
        out.push(self.netfn);
        out.push(self.cmd);
        out.extend_from_slice(&self.data);
        out
    }
}

impl fmt::Display for RawCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.bytes();
        for (i, b) in bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "0x{:02x}", b)?;
        }
        Ok(())
    }
}

/// Any request the core sends through a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpmiCommand {
    /// Vendor OEM raw command.
    Raw(RawCommand),
    /// `mc reset cold`.
    ColdReset,
    /// `mc info`, used as the liveness probe.
    ControllerInfo,
    /// `chassis bootdev <dev> [options=persistent]`.
    SetBootDevice { device: BootDevice, persistent: bool },
}

impl IpmiCommand {
    /// Argument vector as understood by `ipmitool`.
    pub fn args(&self) -> Vec<String> {
        match self {
            IpmiCommand::Raw(raw) => std::iter::once("raw".to_string())
                .chain(raw.bytes().iter().map(|b| format!("0x{:02x}", b)))
                .collect(),
            IpmiCommand::ColdReset => vec!["mc".into(), "reset".into(), "cold".into()],
            IpmiCommand::ControllerInfo => vec!["mc".into(), "info".into()],
            IpmiCommand::SetBootDevice { device, persistent } => {
                let mut args = vec![
                    "chassis".to_string(),
                    "bootdev".to_string(),
                    device.as_str().to_string(),
                ];
                if *persistent {
                    args.push("options=persistent".into());
                }
                args
            }
        }
    }
}

impl From<RawCommand> for IpmiCommand {
    fn from(raw: RawCommand) -> Self {
        IpmiCommand::Raw(raw)
    }
}

impl fmt::Display for IpmiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_tags() {
        assert_eq!("cd".parse::<MediaType>().unwrap(), MediaType::Cd);
        assert_eq!(" HD ".parse::<MediaType>().unwrap(), MediaType::HardDisk);
        assert_eq!("FD".parse::<MediaType>().unwrap(), MediaType::Floppy);
        assert!(matches!(
            "USB".parse::<MediaType>(),
            Err(CommandError::UnknownMediaType(_))
        ));
    }

    #[test]
    fn test_slot_count_validation() {
        assert!(MediaType::Cd.check_slot_count(0).is_ok());
        assert!(MediaType::HardDisk.check_slot_count(4).is_ok());
        assert_eq!(
            MediaType::Cd.check_slot_count(5),
            Err(CommandError::SlotCountOutOfRange { count: 5, max: 4 })
        );
        assert_eq!(
            MediaType::Floppy.check_slot_count(1),
            Err(CommandError::NotSettable(MediaType::Floppy))
        );
    }

    #[test]
    fn test_ipmitool_args() {
        let raw = IpmiCommand::from(RawCommand::new(0x32, 0xcb, [0x04, 0x01]));
        assert_eq!(raw.to_string(), "raw 0x32 0xcb 0x04 0x01");
        assert_eq!(IpmiCommand::ColdReset.to_string(), "mc reset cold");
        let boot = IpmiCommand::SetBootDevice {
            device: BootDevice::Floppy,
            persistent: true,
        };
        assert_eq!(
            boot.to_string(),
            "chassis bootdev floppy options=persistent"
        );
    }
}
