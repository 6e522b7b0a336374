//! Disk attachment status.

use std::fmt;

use crate::protocol::constants::{HW17_STATUS_MOUNTED, HW17_STATUS_MOUNTING, HW17_STATUS_NFS_ERROR};

/// Mount status of the remote image as reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountStatus {
    Unmounted,
    /// Mount in progress, or the two status signals disagree.
    Mounting,
    Mounted,
    /// Share-level failure (NFS unreachable, export missing).
    Error,
}

impl MountStatus {
    /// Combine the remote-image service health and the presented image count.
    ///
    /// | service | images | status   |
    /// |---------|--------|----------|
    /// | healthy | > 0    | Mounted  |
    /// | healthy | 0      | Mounting |
    /// | failed  | > 0    | Mounting |
    /// | failed  | 0      | Error    |
    ///
    /// Disagreement is never reported as success or as a share error: it
    /// resolves to `Mounting` so the caller keeps polling and falls back to
    /// a controller reset if it persists.
    pub fn combine(service_healthy: bool, images: u32) -> Self {
        match (service_healthy, images > 0) {
            (true, true) => MountStatus::Mounted,
            (true, false) | (false, true) => MountStatus::Mounting,
            (false, false) => MountStatus::Error,
        }
    }

    /// Decode the HW17 NFS service status byte.
    pub fn from_hw17(byte: Option<u8>) -> Self {
        match byte {
            Some(HW17_STATUS_MOUNTED) => MountStatus::Mounted,
            Some(HW17_STATUS_MOUNTING) => MountStatus::Mounting,
            Some(HW17_STATUS_NFS_ERROR) => MountStatus::Error,
            _ => MountStatus::Unmounted,
        }
    }
}

impl fmt::Display for MountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountStatus::Unmounted => write!(f, "unmounted"),
            MountStatus::Mounting => write!(f, "mounting"),
            MountStatus::Mounted => write!(f, "mounted"),
            MountStatus::Error => write!(f, "nfserror"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_precedence() {
        assert_eq!(MountStatus::combine(true, 1), MountStatus::Mounted);
        assert_eq!(MountStatus::combine(true, 0), MountStatus::Mounting);
        assert_eq!(MountStatus::combine(false, 3), MountStatus::Mounting);
        assert_eq!(MountStatus::combine(false, 0), MountStatus::Error);
    }

    #[test]
    fn test_hw17_status_bytes() {
        assert_eq!(MountStatus::from_hw17(Some(0x00)), MountStatus::Mounted);
        assert_eq!(MountStatus::from_hw17(Some(0x64)), MountStatus::Mounting);
        assert_eq!(MountStatus::from_hw17(Some(0x20)), MountStatus::Error);
        assert_eq!(MountStatus::from_hw17(Some(0x01)), MountStatus::Unmounted);
        assert_eq!(MountStatus::from_hw17(None), MountStatus::Unmounted);
    }
}
