//! Controller cold reset, the only escalation out of a stuck mount.

use tracing::{error, info, instrument};

use crate::error::{Result, VmediaError};
use crate::events::{Operation, VmediaEvent};
use crate::protocol::IpmiCommand;
use crate::retry::poll_until;
use crate::state::MediaContext;

pub struct RecoveryController<'a> {
    ctx: MediaContext<'a>,
}

impl<'a> RecoveryController<'a> {
    pub fn new(ctx: MediaContext<'a>) -> Self {
        Self { ctx }
    }

    /// Cold reset the controller and wait until it answers again.
    ///
    /// Fails with [`VmediaError::Transport`] if the reset itself cannot be
    /// sent and with [`VmediaError::ControllerUnresponsive`] if the
    /// controller never answers within the liveness budget.
    #[instrument(skip(self))]
    pub fn cold_reset_and_wait(&self) -> Result<()> {
        self.ctx.emit(VmediaEvent::Step {
            operation: Operation::Recovery,
            step: "cold reset".to_string(),
        });
        info!("Cold resetting BMC");

        if let Err(e) = self.ctx.transport.send(&IpmiCommand::ColdReset) {
            error!(error = %e, "Cold reset failed");
            self.ctx.emit(VmediaEvent::Error {
                operation: Operation::Recovery,
                message: e.to_string(),
            });
            return Err(e.into());
        }

        let policy = self.ctx.timing.bmc_liveness;
        let alive = poll_until(&policy, self.ctx.sleeper, "BMC liveness", || {
            self.ctx
                .transport
                .send(&IpmiCommand::ControllerInfo)
                .map(|_| true)
        });

        if !alive {
            let err = VmediaError::ControllerUnresponsive {
                attempts: policy.attempts,
            };
            error!(attempts = policy.attempts, "BMC did not come back after reset");
            self.ctx.emit(VmediaEvent::Error {
                operation: Operation::Recovery,
                message: err.to_string(),
            });
            return Err(err);
        }

        info!("BMC answering again");
        self.ctx.emit(VmediaEvent::Complete {
            operation: Operation::Recovery,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::TimingConfig;
    use crate::events::NullObserver;
    use crate::retry::RecordingSleeper;
    use crate::transport::{MockReply, MockTransport};

    fn run(mock: &MockTransport, sleeper: &RecordingSleeper) -> Result<()> {
        let timing = TimingConfig::default();
        RecoveryController::new(MediaContext {
            transport: mock,
            sleeper,
            observer: &NullObserver,
            timing: &timing,
        })
        .cold_reset_and_wait()
    }

    #[test]
    fn test_controller_comes_back() {
        let mock = MockTransport::new();
        let sleeper = RecordingSleeper::new();
        mock.reply_seq(
            IpmiCommand::ControllerInfo,
            [MockReply::Fail, MockReply::Fail, MockReply::ok("Device ID : 32")],
        );
        run(&mock, &sleeper).unwrap();
        assert_eq!(mock.sent()[0], IpmiCommand::ColdReset);
        assert_eq!(mock.count(IpmiCommand::ControllerInfo), 3);
        assert_eq!(sleeper.total(), Duration::from_secs(20));
    }

    #[test]
    fn test_controller_never_answers() {
        let mock = MockTransport::new();
        let sleeper = RecordingSleeper::new();
        mock.fail(IpmiCommand::ControllerInfo);
        let err = run(&mock, &sleeper).unwrap_err();
        assert!(matches!(
            err,
            VmediaError::ControllerUnresponsive { attempts: 10 }
        ));
        assert!(err.is_fatal());
        assert_eq!(mock.count(IpmiCommand::ControllerInfo), 10);
        assert_eq!(sleeper.count(), 9);
    }

    #[test]
    fn test_reset_command_failure() {
        let mock = MockTransport::new();
        let sleeper = RecordingSleeper::new();
        mock.fail(IpmiCommand::ColdReset);
        let err = run(&mock, &sleeper).unwrap_err();
        assert!(matches!(err, VmediaError::Transport(_)));
        assert_eq!(mock.count(IpmiCommand::ControllerInfo), 0);
    }
}
