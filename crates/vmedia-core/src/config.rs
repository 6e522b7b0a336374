//! Driver configuration.

use std::path::Path;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::retry::PollPolicy;

/// Default root of the network share as seen by the controller.
pub const DEFAULT_SHARE_ROOT: &str = "/remote_image_share_root/";

/// Poll budgets and fixed delays of the attach/detach sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Delay around the share path write.
    pub path_settle_ms: u64,
    /// Delay after starting a share mount on simple families.
    pub mount_settle_ms: u64,
    /// Pause between whole-attach retries.
    pub attach_retry_ms: u64,
    /// Device-slot count read-back.
    pub slot_count: PollPolicy,
    /// CD/DVD mount enable bit read-back.
    pub mount_bit: PollPolicy,
    /// Virtual media service start.
    pub media_service: PollPolicy,
    /// Remote image becoming visible.
    pub image_present: PollPolicy,
    /// Disk attachment leaving "mounting".
    pub disk_attach: PollPolicy,
    /// Controller answering again after a cold reset.
    pub bmc_liveness: PollPolicy,
}

impl TimingConfig {
    /// Reject poll budgets that would never send a single read.
    pub fn validate(&self) -> Result<()> {
        let policies = [
            ("slot_count", &self.slot_count),
            ("mount_bit", &self.mount_bit),
            ("media_service", &self.media_service),
            ("image_present", &self.image_present),
            ("disk_attach", &self.disk_attach),
            ("bmc_liveness", &self.bmc_liveness),
        ];
        for (name, policy) in policies {
            if policy.attempts == 0 {
                bail!("timing.{name}.attempts must be at least 1");
            }
        }
        Ok(())
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            path_settle_ms: 2000,
            mount_settle_ms: 1000,
            attach_retry_ms: 1000,
            slot_count: PollPolicy::new(40, 5),
            mount_bit: PollPolicy::new(60, 2),
            media_service: PollPolicy::new(60, 5),
            image_present: PollPolicy::new(60, 10),
            disk_attach: PollPolicy::new(10, 1),
            bmc_liveness: PollPolicy::new(10, 10),
        }
    }
}

/// Configuration for the virtual media driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Share root exported to the controllers.
    pub remote_image_share_root: String,
    /// Extra whole-attach attempts after the first one fails.
    pub attach_retries: u32,
    pub timing: TimingConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            remote_image_share_root: DEFAULT_SHARE_ROOT.to_string(),
            attach_retries: 2,
            timing: TimingConfig::default(),
        }
    }
}

impl DriverConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DriverConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the timing table and that the share root exists locally.
    pub fn validate(&self) -> Result<()> {
        self.timing.validate()?;
        self.validate_share_root()
    }

    /// Check that the share root exists locally.
    pub fn validate_share_root(&self) -> Result<()> {
        if self.remote_image_share_root.is_empty() {
            bail!("remote_image_share_root is empty");
        }
        if !Path::new(&self.remote_image_share_root).is_dir() {
            bail!(
                "Value '{}' for remote_image_share_root isn't a directory or doesn't exist",
                self.remote_image_share_root
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_firmware_budgets() {
        let t = TimingConfig::default();
        assert_eq!(t.slot_count, PollPolicy::new(40, 5));
        assert_eq!(t.mount_bit.attempts, 60);
        assert_eq!(t.image_present.interval_ms, 10_000);
        assert_eq!(t.bmc_liveness, PollPolicy::new(10, 10));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: DriverConfig = toml::from_str(
            r#"
            remote_image_share_root = "/srv/images/"

            [timing]
            path_settle_ms = 500

            [timing.mount_bit]
            attempts = 3
            interval_ms = 10
            "#,
        )
        .unwrap();
        assert_eq!(cfg.remote_image_share_root, "/srv/images/");
        assert_eq!(cfg.attach_retries, 2);
        assert_eq!(cfg.timing.path_settle_ms, 500);
        assert_eq!(cfg.timing.mount_bit, PollPolicy { attempts: 3, interval_ms: 10 });
        assert_eq!(cfg.timing.slot_count, PollPolicy::new(40, 5));
    }

    #[test]
    fn test_roundtrip_file() {
        let path = std::env::temp_dir().join(format!("vmedia-cfg-{}.toml", std::process::id()));
        let mut cfg = DriverConfig::default();
        cfg.attach_retries = 0;
        cfg.save_to_file(&path).unwrap();
        let loaded = DriverConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_validate_share_root() {
        let mut cfg = DriverConfig::default();
        cfg.remote_image_share_root = std::env::temp_dir().display().to_string();
        assert!(cfg.validate().is_ok());
        cfg.remote_image_share_root = "/definitely/not/here".into();
        assert!(cfg.validate().is_err());
        assert!(cfg.timing.validate().is_ok());
    }

    #[test]
    fn test_zero_attempt_budget_rejected() {
        let mut cfg = DriverConfig::default();
        cfg.remote_image_share_root = std::env::temp_dir().display().to_string();
        cfg.timing.disk_attach = PollPolicy::new(0, 1);

        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("timing.disk_attach.attempts"));

        cfg.timing.disk_attach = PollPolicy::new(1, 0);
        cfg.timing.bmc_liveness.attempts = 0;
        let err = cfg.timing.validate().unwrap_err();
        assert!(err.to_string().contains("bmc_liveness"));
    }
}
