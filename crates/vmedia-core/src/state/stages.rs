//! Attach/detach stages and the per-call attach record.

use std::fmt;

/// Progress of an attach call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum AttachState {
    #[default]
    Idle,
    MediaEnabled,
    SlotConfigured,
    ShareConfigured,
    ServiceRestarted,
    ImagePresent,
    ImageNamed,
    Mounted,
}

impl fmt::Display for AttachState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachState::Idle => write!(f, "IDLE"),
            AttachState::MediaEnabled => write!(f, "MEDIA_ENABLED"),
            AttachState::SlotConfigured => write!(f, "SLOT_CONFIGURED"),
            AttachState::ShareConfigured => write!(f, "SHARE_CONFIGURED"),
            AttachState::ServiceRestarted => write!(f, "SERVICE_RESTARTED"),
            AttachState::ImagePresent => write!(f, "IMAGE_PRESENT"),
            AttachState::ImageNamed => write!(f, "IMAGE_NAMED"),
            AttachState::Mounted => write!(f, "MOUNTED"),
        }
    }
}

/// One primitive call of the attach sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachStep {
    EnableMediaService,
    EnableCdDevice,
    ClearRemoteImageConfig,
    ConfigureNetworkShare,
    RestartRemoteImageCd,
    WaitForImage,
    SetImageName,
    ConfirmMounted,
}

impl AttachStep {
    /// State reached once this step succeeds.
    pub fn reaches(&self) -> AttachState {
        match self {
            AttachStep::EnableMediaService => AttachState::MediaEnabled,
            AttachStep::EnableCdDevice | AttachStep::ClearRemoteImageConfig => {
                AttachState::SlotConfigured
            }
            AttachStep::ConfigureNetworkShare => AttachState::ShareConfigured,
            AttachStep::RestartRemoteImageCd => AttachState::ServiceRestarted,
            AttachStep::WaitForImage => AttachState::ImagePresent,
            AttachStep::SetImageName => AttachState::ImageNamed,
            AttachStep::ConfirmMounted => AttachState::Mounted,
        }
    }
}

impl fmt::Display for AttachStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttachStep::EnableMediaService => "enable media service",
            AttachStep::EnableCdDevice => "enable CD device",
            AttachStep::ClearRemoteImageConfig => "clear remote image config",
            AttachStep::ConfigureNetworkShare => "configure network share",
            AttachStep::RestartRemoteImageCd => "restart remote image CD",
            AttachStep::WaitForImage => "wait for image",
            AttachStep::SetImageName => "set image name",
            AttachStep::ConfirmMounted => "confirm mounted",
        };
        f.write_str(s)
    }
}

/// One primitive call of the detach sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachStep {
    EnableMediaService,
    RestartRemoteImageService,
    StopRedirection,
    ClearRemoteImageConfig,
    DisableCdDevice,
    ShrinkHardDiskSlots,
    ShrinkCdSlots,
}

impl fmt::Display for DetachStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DetachStep::EnableMediaService => "enable media service",
            DetachStep::RestartRemoteImageService => "restart remote image service",
            DetachStep::StopRedirection => "stop redirection",
            DetachStep::ClearRemoteImageConfig => "clear remote image config",
            DetachStep::DisableCdDevice => "disable CD device",
            DetachStep::ShrinkHardDiskSlots => "shrink HD slots",
            DetachStep::ShrinkCdSlots => "shrink CD slots",
        };
        f.write_str(s)
    }
}

/// Result of a sequence that is not fatal either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<S> {
    Completed,
    /// The sequence stopped at this step; later steps were not attempted.
    Aborted(S),
}

impl<S> Outcome<S> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }

    pub fn aborted_at(&self) -> Option<&S> {
        match self {
            Outcome::Completed => None,
            Outcome::Aborted(step) => Some(step),
        }
    }
}

/// Where the controller fetches boot media from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkShare {
    pub server: String,
    pub root_path: String,
}

/// Transient record of one attach call. Never persisted.
#[derive(Debug, Clone)]
pub struct AttachRecord {
    pub image_filename: String,
    pub share: NetworkShare,
    pub state: AttachState,
}

impl AttachRecord {
    pub fn new(image_filename: impl Into<String>, share: NetworkShare) -> Self {
        Self {
            image_filename: image_filename.into(),
            share,
            state: AttachState::Idle,
        }
    }

    /// Record a successful step. Returns the transition when the state moved.
    pub fn complete(&mut self, step: AttachStep) -> Option<(AttachState, AttachState)> {
        let to = step.reaches();
        if to == self.state {
            return None;
        }
        let from = self.state;
        tracing::info!(from = %from, to = %to, "State transition");
        self.state = to;
        Some((from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_reach_states_in_order() {
        let steps = [
            AttachStep::EnableMediaService,
            AttachStep::EnableCdDevice,
            AttachStep::ClearRemoteImageConfig,
            AttachStep::ConfigureNetworkShare,
            AttachStep::RestartRemoteImageCd,
            AttachStep::WaitForImage,
            AttachStep::SetImageName,
            AttachStep::ConfirmMounted,
        ];
        let states: Vec<_> = steps.iter().map(|s| s.reaches()).collect();
        assert!(states.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(states.last(), Some(&AttachState::Mounted));
    }

    #[test]
    fn test_record_transitions() {
        let share = NetworkShare {
            server: "10.0.0.1".into(),
            root_path: "/share/".into(),
        };
        let mut rec = AttachRecord::new("boot.iso", share);
        assert_eq!(
            rec.complete(AttachStep::EnableMediaService),
            Some((AttachState::Idle, AttachState::MediaEnabled))
        );
        assert!(rec.complete(AttachStep::EnableCdDevice).is_some());
        // Clearing RIS config does not move the state
        assert_eq!(rec.complete(AttachStep::ClearRemoteImageConfig), None);
        assert_eq!(rec.state, AttachState::SlotConfigured);
    }

    #[test]
    fn test_outcome() {
        let done: Outcome<DetachStep> = Outcome::Completed;
        assert!(done.is_completed());
        let aborted = Outcome::Aborted(DetachStep::ShrinkCdSlots);
        assert_eq!(aborted.aborted_at(), Some(&DetachStep::ShrinkCdSlots));
    }
}
