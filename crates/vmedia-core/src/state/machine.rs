//! Media state machine: get/set primitives with read-back confirmation.
//!
//! Every set is fire-and-forget on the controller side, so each primitive
//! issues the set and then polls the matching get through
//! [`poll_until`](crate::retry::poll_until). Only the set's own transport
//! failure is reported immediately; errors while polling count as "not yet".

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::TimingConfig;
use crate::events::{LogLevel, VmediaEvent, VmediaObserver};
use crate::protocol::catalog::falcon;
use crate::protocol::constants::MAX_DEVICE_SLOTS;
use crate::protocol::{CommandError, IpmiCommand, MediaType, RawResponse};
use crate::retry::{Sleeper, poll_until};
use crate::transport::{BmcTransport, TransportError};

/// Resources borrowed by the state machine for one call.
#[derive(Clone, Copy)]
pub struct MediaContext<'a> {
    pub transport: &'a dyn BmcTransport,
    pub sleeper: &'a dyn Sleeper,
    pub observer: &'a dyn VmediaObserver,
    pub timing: &'a TimingConfig,
}

impl<'a> MediaContext<'a> {
    pub fn emit(&self, event: VmediaEvent) {
        self.observer.on_event(&event);
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(VmediaEvent::Log {
            level,
            message: message.into(),
        });
    }

    pub fn sleep_ms(&self, ms: u64) {
        if ms > 0 {
            self.sleeper.sleep(Duration::from_millis(ms));
        }
    }
}

/// Falcon virtual media primitives.
pub struct MediaStateMachine<'a> {
    ctx: MediaContext<'a>,
}

impl<'a> MediaStateMachine<'a> {
    pub fn new(ctx: MediaContext<'a>) -> Self {
        Self { ctx }
    }

    fn send(&self, command: impl Into<IpmiCommand>) -> Result<RawResponse, TransportError> {
        self.ctx.transport.send(&command.into())
    }

    /// Fire a single command; failure is logged and reported as `false`.
    fn fire(&self, command: impl Into<IpmiCommand>, what: &str) -> bool {
        match self.send(command) {
            Ok(_) => true,
            Err(e) => {
                warn!(what, error = %e, "Command failed");
                self.ctx.log(LogLevel::Warn, format!("Failed to {what}: {e}"));
                false
            }
        }
    }

    fn read_byte(&self, command: impl Into<IpmiCommand>) -> Result<Option<u8>, TransportError> {
        Ok(self.send(command)?.first_byte().ok())
    }

    /// Set the number of enabled slots and wait until the controller reports it.
    ///
    /// Floppy and counts above the slot maximum are rejected before anything
    /// is sent.
    pub fn configure_device_slots(&self, media: MediaType, count: u8) -> Result<bool, CommandError> {
        let set = falcon::set_device_slots(media, count)?;
        info!(media = %media, count, "Setting virtual device count");

        if let Err(e) = self.send(set) {
            error!(media = %media, error = %e, "Failed to set virtual device count");
            self.ctx
                .log(LogLevel::Error, format!("Setting {media} count failed: {e}"));
            return Ok(false);
        }

        let get = falcon::get_device_slots(media);
        let what = format!("{media} count {count}");
        Ok(poll_until(
            &self.ctx.timing.slot_count,
            self.ctx.sleeper,
            &what,
            || Ok(self.read_byte(get.clone())? == Some(count)),
        ))
    }

    /// Current slot count of a media type, `None` when it cannot be read.
    pub fn get_device_slots(&self, media: MediaType) -> Option<u8> {
        match self.read_byte(falcon::get_device_slots(media)) {
            Ok(Some(count)) => Some(count),
            Ok(None) => {
                warn!(media = %media, "Unparsable device count");
                None
            }
            Err(e) => {
                warn!(media = %media, error = %e, "Failed to read device count");
                None
            }
        }
    }

    fn media_service_running(&self) -> Result<bool, TransportError> {
        Ok(self.read_byte(falcon::get_media_service())? == Some(1))
    }

    /// Enable the virtual media service and wait until it runs.
    pub fn start_media_service(&self) -> bool {
        if matches!(self.media_service_running(), Ok(true)) {
            debug!("Virtual media service already running");
            return true;
        }

        if let Err(e) = self.send(falcon::set_media_service(true)) {
            error!(error = %e, "Failed to enable virtual media service");
            self.ctx
                .log(LogLevel::Error, format!("Enabling virtual media failed: {e}"));
            return false;
        }
        // Enabling alone does not start the service on every board
        self.fire(falcon::restart_media_service(), "restart virtual media service");

        poll_until(
            &self.ctx.timing.media_service,
            self.ctx.sleeper,
            "virtual media service",
            || self.media_service_running(),
        )
    }

    /// Set the CD/DVD mount enable bit and wait for the read-back.
    pub fn toggle_mount_bit(&self, enabled: bool) -> bool {
        info!(enabled, "Toggling CD/DVD device");
        if let Err(e) = self.send(falcon::set_mount_bit(enabled)) {
            error!(enabled, error = %e, "Failed to set mount bit");
            self.ctx
                .log(LogLevel::Error, format!("Setting CD/DVD mount bit failed: {e}"));
            return false;
        }

        let expected = u8::from(enabled);
        poll_until(
            &self.ctx.timing.mount_bit,
            self.ctx.sleeper,
            "CD/DVD mount bit",
            || Ok(self.read_byte(falcon::get_mount_bit())? == Some(expected)),
        )
    }

    /// Point the remote image service at an NFS export.
    ///
    /// Share type and server address must succeed or nothing further is
    /// written. The path write is bracketed by the progress flag; each step
    /// of the bracket runs even if an earlier one failed, but any failure
    /// makes the whole call fail.
    pub fn configure_network_share(
        &self,
        server: &str,
        root_path: &str,
    ) -> Result<bool, CommandError> {
        let set_server = falcon::set_share_server(server)?;
        let set_path = falcon::set_share_path(root_path)?;
        info!(server, root_path, "Configuring NFS share");

        if !self.fire(falcon::set_share_type_nfs(), "set share type NFS") {
            return Ok(false);
        }
        if !self.fire(set_server, "set NFS server address") {
            return Ok(false);
        }

        let settle = self.ctx.timing.path_settle_ms;
        let mut ok = self.fire(falcon::set_progress_flag(false), "clear progress flag");
        ok &= self.fire(falcon::set_progress_flag(true), "set progress flag");
        // Path writes are dropped until the flag has propagated
        self.ctx.sleep_ms(settle);
        ok &= self.fire(set_path, "set NFS root path");
        self.ctx.sleep_ms(settle);
        ok &= self.fire(falcon::set_progress_flag(false), "clear progress flag");

        if !ok {
            self.ctx.log(LogLevel::Error, "NFS share configuration incomplete");
        }
        Ok(ok)
    }

    pub fn restart_remote_image_service(&self) -> bool {
        self.fire(
            falcon::restart_remote_image_service(),
            "restart remote image service",
        )
    }

    pub fn restart_remote_image_cd(&self) -> bool {
        self.fire(falcon::restart_remote_image_cd(), "restart remote image CD")
    }

    pub fn clear_remote_image_config(&self) -> bool {
        self.fire(
            falcon::clear_remote_image_config(),
            "clear remote image configuration",
        )
    }

    /// Start redirecting the CD to `filename` on the share.
    pub fn set_image_name(&self, filename: &str) -> Result<bool, CommandError> {
        let command = falcon::set_image_name(filename)?;
        info!(filename, "Setting image name");
        Ok(self.fire(command, "set image name"))
    }

    /// Number of images the remote image service presents. 0 when the
    /// count cannot be read.
    pub fn get_mounted_image_count(&self) -> u32 {
        match self.send(falcon::get_mounted_image_count()) {
            Ok(resp) => match resp.hex_field(3..5) {
                Ok(count) => count,
                Err(e) => {
                    debug!(output = %resp.text(), error = %e, "Unparsable image count");
                    0
                }
            },
            Err(e) => {
                debug!(error = %e, "Failed to read image count");
                0
            }
        }
    }

    /// Whether the NFS service answers with an image descriptor.
    pub fn check_nfs_service(&self) -> bool {
        match self.send(falcon::check_nfs_service()) {
            Ok(resp) => resp.bytes().is_ok_and(|b| !b.is_empty()),
            Err(e) => {
                debug!(error = %e, "NFS service check failed");
                false
            }
        }
    }

    pub fn wait_for_image_to_appear(&self) -> bool {
        poll_until(
            &self.ctx.timing.image_present,
            self.ctx.sleeper,
            "remote image",
            || Ok(self.get_mounted_image_count() > 0),
        )
    }

    /// Stop redirection on every enabled CD slot. Returns the number of
    /// slots stopped.
    pub fn stop_remote_redirection(&self) -> usize {
        let slots = self
            .get_device_slots(MediaType::Cd)
            .unwrap_or(0)
            .min(MAX_DEVICE_SLOTS);
        let mut stopped = 0;
        for slot in 0..slots {
            let Ok(command) = falcon::stop_redirection(slot) else {
                continue;
            };
            if self.fire(command, "stop redirection") {
                stopped += 1;
            }
        }
        debug!(slots, stopped, "Redirection stopped");
        stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullObserver;
    use crate::retry::{PollPolicy, RecordingSleeper};
    use crate::transport::{MockReply, MockTransport};

    struct Fixture {
        mock: MockTransport,
        sleeper: RecordingSleeper,
        timing: TimingConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                mock: MockTransport::new(),
                sleeper: RecordingSleeper::new(),
                timing: TimingConfig::default(),
            }
        }

        fn machine(&self) -> MediaStateMachine<'_> {
            MediaStateMachine::new(MediaContext {
                transport: &self.mock,
                sleeper: &self.sleeper,
                observer: &NullObserver,
                timing: &self.timing,
            })
        }
    }

    fn outputs(values: &[&str]) -> Vec<MockReply> {
        values.iter().map(|v| MockReply::ok(v)).collect()
    }

    #[test]
    fn test_slot_count_out_of_range_sends_nothing() {
        let fx = Fixture::new();
        for count in [5u8, 6, 200, u8::MAX] {
            assert!(fx.machine().configure_device_slots(MediaType::Cd, count).is_err());
        }
        assert!(
            fx.machine()
                .configure_device_slots(MediaType::Floppy, 1)
                .is_err()
        );
        assert!(fx.mock.sent().is_empty());
    }

    #[test]
    fn test_slot_count_confirmed_on_nth_read() {
        let fx = Fixture::new();
        let get = falcon::get_device_slots(MediaType::HardDisk);
        fx.mock
            .reply_seq(get.clone(), outputs(&[" 04", " 04", " 04", " 00"]));

        let ok = fx
            .machine()
            .configure_device_slots(MediaType::HardDisk, 0)
            .unwrap();
        assert!(ok);
        assert_eq!(fx.mock.count(get), 4);
        assert_eq!(fx.sleeper.count(), 3);
        assert_eq!(fx.sleeper.total(), Duration::from_secs(15));
    }

    #[test]
    fn test_slot_count_budget_exhausted() {
        let fx = Fixture::new();
        let get = falcon::get_device_slots(MediaType::Cd);
        fx.mock.reply(get.clone(), " 04");

        assert!(!fx.machine().configure_device_slots(MediaType::Cd, 1).unwrap());
        assert_eq!(fx.mock.count(get), 40);
        assert_eq!(fx.sleeper.count(), 39);
    }

    #[test]
    fn test_slot_count_set_failure_skips_polling() {
        let fx = Fixture::new();
        fx.mock
            .fail(falcon::set_device_slots(MediaType::Cd, 1).unwrap());
        assert!(!fx.machine().configure_device_slots(MediaType::Cd, 1).unwrap());
        assert_eq!(fx.mock.count(falcon::get_device_slots(MediaType::Cd)), 0);
    }

    #[test]
    fn test_mount_bit_budget_and_errors() {
        let fx = Fixture::new();
        let get = falcon::get_mount_bit();
        fx.mock.fail(get.clone());

        assert!(!fx.machine().toggle_mount_bit(true));
        assert_eq!(fx.mock.count(get), 60);
        assert_eq!(fx.sleeper.count(), 59);
        assert!(fx.sleeper.durations().iter().all(|d| *d == Duration::from_secs(2)));
    }

    #[test]
    fn test_mount_bit_transient_error_then_match() {
        let fx = Fixture::new();
        let get = falcon::get_mount_bit();
        fx.mock.reply_seq(
            get.clone(),
            [MockReply::Fail, MockReply::ok(" 01"), MockReply::ok(" 00")],
        );
        assert!(fx.machine().toggle_mount_bit(false));
        assert_eq!(fx.mock.count(get), 3);
        assert_eq!(fx.sleeper.count(), 2);
    }

    #[test]
    fn test_media_service_already_running() {
        let fx = Fixture::new();
        fx.mock.reply(falcon::get_media_service(), " 01");
        assert!(fx.machine().start_media_service());
        assert_eq!(fx.mock.sent().len(), 1);
        assert_eq!(fx.sleeper.count(), 0);
    }

    #[test]
    fn test_media_service_restart_always_issued() {
        let fx = Fixture::new();
        let get = falcon::get_media_service();
        // Initial check, then two polls
        fx.mock.reply_seq(get.clone(), outputs(&[" 00", " 00", " 01"]));
        assert!(fx.machine().start_media_service());

        let sent = fx.mock.sent();
        assert_eq!(sent[1], IpmiCommand::from(falcon::set_media_service(true)));
        assert_eq!(sent[2], IpmiCommand::from(falcon::restart_media_service()));
        assert_eq!(fx.mock.count(get), 3);
        assert_eq!(fx.sleeper.count(), 1);
    }

    #[test]
    fn test_media_service_enable_failure() {
        let fx = Fixture::new();
        fx.mock.fail(falcon::set_media_service(true));
        assert!(!fx.machine().start_media_service());
        assert_eq!(fx.mock.count(falcon::restart_media_service()), 0);
    }

    #[test]
    fn test_media_service_budget() {
        let mut fx = Fixture::new();
        fx.timing.media_service = PollPolicy::new(3, 5);
        let get = falcon::get_media_service();
        fx.mock.reply(get.clone(), " 00");
        assert!(!fx.machine().start_media_service());
        // One initial check plus the poll budget
        assert_eq!(fx.mock.count(get), 4);
    }

    #[test]
    fn test_share_server_failure_skips_path() {
        let fx = Fixture::new();
        fx.mock.fail(falcon::set_share_server("10.0.0.1").unwrap());

        let ok = fx
            .machine()
            .configure_network_share("10.0.0.1", "/share/")
            .unwrap();
        assert!(!ok);
        assert_eq!(fx.mock.count(falcon::set_share_path("/share/").unwrap()), 0);
        assert_eq!(fx.mock.count(falcon::set_progress_flag(true)), 0);
    }

    #[test]
    fn test_share_path_bracket() {
        let fx = Fixture::new();
        let ok = fx
            .machine()
            .configure_network_share("10.0.0.1", "/share/")
            .unwrap();
        assert!(ok);
        let expected: Vec<IpmiCommand> = vec![
            falcon::set_share_type_nfs().into(),
            falcon::set_share_server("10.0.0.1").unwrap().into(),
            falcon::set_progress_flag(false).into(),
            falcon::set_progress_flag(true).into(),
            falcon::set_share_path("/share/").unwrap().into(),
            falcon::set_progress_flag(false).into(),
        ];
        assert_eq!(fx.mock.sent(), expected);
        assert_eq!(
            fx.sleeper.durations(),
            [Duration::from_secs(2), Duration::from_secs(2)]
        );
    }

    #[test]
    fn test_share_path_failure_continues_bracket() {
        let fx = Fixture::new();
        fx.mock.fail(falcon::set_share_path("/share/").unwrap());
        let ok = fx
            .machine()
            .configure_network_share("10.0.0.1", "/share/")
            .unwrap();
        assert!(!ok);
        // Progress flag is still cleared after the failed write
        assert_eq!(fx.mock.count(falcon::set_progress_flag(false)), 2);
    }

    #[test]
    fn test_share_rejects_empty_server() {
        let fx = Fixture::new();
        assert!(fx.machine().configure_network_share("", "/share/").is_err());
        assert!(fx.mock.sent().is_empty());
    }

    #[test]
    fn test_image_count_parsing() {
        let fx = Fixture::new();
        let get = falcon::get_mounted_image_count();
        fx.mock.reply_seq(
            get,
            [
                MockReply::ok(" 00 02 00\n"),
                MockReply::ok(" 00 0a"),
                MockReply::ok("00"),
                MockReply::ok(" 00 zz"),
                MockReply::ok(""),
                MockReply::Fail,
            ],
        );
        let m = fx.machine();
        assert_eq!(m.get_mounted_image_count(), 2);
        assert_eq!(m.get_mounted_image_count(), 10);
        assert_eq!(m.get_mounted_image_count(), 0);
        assert_eq!(m.get_mounted_image_count(), 0);
        assert_eq!(m.get_mounted_image_count(), 0);
        assert_eq!(m.get_mounted_image_count(), 0);
    }

    #[test]
    fn test_wait_for_image() {
        let fx = Fixture::new();
        let get = falcon::get_mounted_image_count();
        fx.mock
            .reply_seq(get.clone(), outputs(&[" 00 00", " 00 00", " 00 01"]));
        assert!(fx.machine().wait_for_image_to_appear());
        assert_eq!(fx.mock.count(get), 3);
        assert_eq!(fx.sleeper.total(), Duration::from_secs(20));
    }

    #[test]
    fn test_wait_for_image_budget() {
        let fx = Fixture::new();
        let get = falcon::get_mounted_image_count();
        fx.mock.reply(get.clone(), " 00 00");
        assert!(!fx.machine().wait_for_image_to_appear());
        assert_eq!(fx.mock.count(get), 60);
    }

    #[test]
    fn test_stop_redirection_best_effort() {
        let fx = Fixture::new();
        fx.mock.reply(falcon::get_device_slots(MediaType::Cd), " 03");
        fx.mock.fail(falcon::stop_redirection(1).unwrap());

        assert_eq!(fx.machine().stop_remote_redirection(), 2);
        assert_eq!(fx.mock.count(falcon::stop_redirection(0).unwrap()), 1);
        assert_eq!(fx.mock.count(falcon::stop_redirection(2).unwrap()), 1);
    }

    #[test]
    fn test_stop_redirection_unreadable_count() {
        let fx = Fixture::new();
        fx.mock.fail(falcon::get_device_slots(MediaType::Cd));
        assert_eq!(fx.machine().stop_remote_redirection(), 0);
        assert_eq!(fx.mock.sent().len(), 1);
    }

    #[test]
    fn test_nfs_service_check() {
        let fx = Fixture::new();
        fx.mock.reply_seq(
            falcon::check_nfs_service(),
            [MockReply::ok(" 62 6f 6f 74"), MockReply::ok(""), MockReply::Fail],
        );
        let m = fx.machine();
        assert!(m.check_nfs_service());
        assert!(!m.check_nfs_service());
        assert!(!m.check_nfs_service());
    }
}
