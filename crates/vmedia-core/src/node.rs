//! Node handle and driver info, as owned by the orchestration framework.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VmediaError};

/// Properties every node using this driver must carry.
pub const REQUIRED_PROPERTIES: &[(&str, &str)] = &[
    (
        "provisioning_server",
        "Provisioning server IP hosting deployment ISO and metadata floppy images.",
    ),
    (
        "provisioning_server_http_port",
        "Provisioning server port where the images can be obtained with http requests.",
    ),
    ("vendor", "Vendor for the installed hardware."),
    ("product_family", "Product family for the hardware."),
    ("ipmi_address", "IP address or hostname of the node's BMC."),
];

/// A bare-metal node. Read-only for the duration of one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeHandle {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub driver_info: BTreeMap<String, String>,
}

impl NodeHandle {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            driver_info: BTreeMap::new(),
        }
    }

    /// Builder-style driver_info insert.
    pub fn with_info(mut self, key: &str, value: impl Into<String>) -> Self {
        self.driver_info.insert(key.to_string(), value.into());
        self
    }

    pub fn parse_driver_info(&self) -> Result<DriverInfo> {
        DriverInfo::from_map(&self.driver_info)
    }
}

/// BMC connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpmiConnection {
    pub address: String,
    pub username: String,
    pub password: String,
    pub port: Option<u16>,
    /// ipmitool interface, `lanplus` unless overridden.
    pub interface: String,
}

/// Validated driver_info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverInfo {
    pub provisioning_server: String,
    pub provisioning_server_http_port: u16,
    pub vendor: String,
    pub product_family: String,
    pub ipmi: IpmiConnection,
}

impl DriverInfo {
    pub fn from_map(info: &BTreeMap<String, String>) -> Result<Self> {
        let get = |key: &str| info.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let missing: Vec<String> = REQUIRED_PROPERTIES
            .iter()
            .filter(|(key, _)| get(*key).is_none())
            .map(|(key, _)| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(VmediaError::MissingParameter { missing });
        }

        let http_port = get("provisioning_server_http_port").unwrap_or_default();
        let provisioning_server_http_port = http_port.parse().map_err(|_| {
            VmediaError::InvalidParameter(format!(
                "provisioning_server_http_port {http_port:?} is not a port number"
            ))
        })?;

        let port = match get("ipmi_port") {
            Some(p) => Some(p.parse().map_err(|_| {
                VmediaError::InvalidParameter(format!("ipmi_port {p:?} is not a port number"))
            })?),
            None => None,
        };

        Ok(Self {
            provisioning_server: get("provisioning_server").unwrap_or_default().to_string(),
            provisioning_server_http_port,
            vendor: get("vendor").unwrap_or_default().to_string(),
            product_family: get("product_family").unwrap_or_default().to_string(),
            ipmi: IpmiConnection {
                address: get("ipmi_address").unwrap_or_default().to_string(),
                username: get("ipmi_username").unwrap_or_default().to_string(),
                password: info.get("ipmi_password").cloned().unwrap_or_default(),
                port,
                interface: get("ipmi_interface").unwrap_or("lanplus").to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> NodeHandle {
        NodeHandle::new("8f1c", "compute-0")
            .with_info("provisioning_server", "192.168.1.10")
            .with_info("provisioning_server_http_port", "8080")
            .with_info("vendor", "Ampere")
            .with_info("product_family", "FALCON")
            .with_info("ipmi_address", "10.0.0.5")
            .with_info("ipmi_username", "admin")
            .with_info("ipmi_password", "pw")
    }

    #[test]
    fn test_parse_driver_info() {
        let info = node().parse_driver_info().unwrap();
        assert_eq!(info.provisioning_server, "192.168.1.10");
        assert_eq!(info.provisioning_server_http_port, 8080);
        assert_eq!(info.ipmi.interface, "lanplus");
        assert_eq!(info.ipmi.port, None);
    }

    #[test]
    fn test_missing_parameters_listed() {
        let mut n = node();
        n.driver_info.remove("vendor");
        n.driver_info.insert("provisioning_server".into(), "  ".into());
        match n.parse_driver_info() {
            Err(VmediaError::MissingParameter { missing }) => {
                assert_eq!(missing, ["provisioning_server", "vendor"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_ports() {
        let n = node().with_info("provisioning_server_http_port", "http");
        assert!(matches!(
            n.parse_driver_info(),
            Err(VmediaError::InvalidParameter(_))
        ));
        let n = node().with_info("ipmi_port", "70000");
        assert!(matches!(
            n.parse_driver_info(),
            Err(VmediaError::InvalidParameter(_))
        ));
    }
}
