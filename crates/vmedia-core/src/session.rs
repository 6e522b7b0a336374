//! Virtual media session - attach/detach orchestrator for one node.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::DriverConfig;
use crate::error::{Result, VmediaError};
use crate::events::{Operation, TracingObserver, VmediaEvent, VmediaObserver};
use crate::node::{DriverInfo, NodeHandle};
use crate::protocol::{IpmiCommand, RawResponse};
use crate::recovery::RecoveryController;
use crate::retry::{Sleeper, ThreadSleeper, poll_until};
use crate::state::{
    AttachRecord, AttachStep, DetachStep, MediaContext, MountStatus, NetworkShare, Outcome,
};
use crate::transport::{BmcTransport, IpmitoolTransport, TransportError};
use crate::vendor::{VirtualMediaHw, begin_step, finish_step, hw_for};

/// Orchestrates attach/detach of boot media on one node.
///
/// Calls block for the whole sequence. The caller serializes calls per node.
pub struct VmediaSession<T: BmcTransport, O: VmediaObserver> {
    node: NodeHandle,
    info: DriverInfo,
    config: DriverConfig,
    hw: Box<dyn VirtualMediaHw>,
    transport: T,
    sleeper: Arc<dyn Sleeper>,
    observer: Arc<O>,
}

impl VmediaSession<IpmitoolTransport, TracingObserver> {
    /// Session talking to the node's BMC through `ipmitool`.
    pub fn new(node: NodeHandle, config: DriverConfig) -> Result<Self> {
        let info = node.parse_driver_info()?;
        let transport = IpmitoolTransport::new(info.ipmi.clone());
        Self::with_parts(
            node,
            config,
            transport,
            Arc::new(ThreadSleeper),
            Arc::new(TracingObserver),
        )
    }
}

impl<T: BmcTransport, O: VmediaObserver> VmediaSession<T, O> {
    /// Session over a caller-provided transport, sleeper and observer.
    pub fn with_parts(
        node: NodeHandle,
        config: DriverConfig,
        transport: T,
        sleeper: Arc<dyn Sleeper>,
        observer: Arc<O>,
    ) -> Result<Self> {
        let info = node.parse_driver_info()?;
        let hw = hw_for(&info)?;
        config
            .timing
            .validate()
            .map_err(|e| VmediaError::InvalidParameter(format!("{e:#}")))?;
        info!(node = %node.uuid, family = hw.family(), "Virtual media session ready");
        Ok(Self {
            node,
            info,
            config,
            hw,
            transport,
            sleeper,
            observer,
        })
    }

    pub fn node(&self) -> &NodeHandle {
        &self.node
    }

    pub fn driver_info(&self) -> &DriverInfo {
        &self.info
    }

    pub fn family(&self) -> &'static str {
        self.hw.family()
    }

    fn emit(&self, event: VmediaEvent) {
        self.observer.on_event(&event);
    }

    fn with_context<R>(&self, f: impl FnOnce(&MediaContext<'_>) -> R) -> R {
        let transport = ObservableTransport {
            inner: &self.transport,
            observer: self.observer.as_ref(),
        };
        let ctx = MediaContext {
            transport: &transport,
            sleeper: self.sleeper.as_ref(),
            observer: self.observer.as_ref(),
            timing: &self.config.timing,
        };
        f(&ctx)
    }

    fn started(&self, operation: Operation) {
        self.emit(VmediaEvent::Started {
            operation,
            node: self.node.name.clone(),
        });
    }

    fn finished<S: std::fmt::Display>(&self, operation: Operation, outcome: &Outcome<S>) {
        match outcome {
            Outcome::Completed => self.emit(VmediaEvent::Complete { operation }),
            Outcome::Aborted(step) => self.emit(VmediaEvent::Error {
                operation,
                message: format!("Aborted at {step}"),
            }),
        }
    }

    /// Attach `image_filename` from the share as the node's virtual CD.
    ///
    /// `Aborted` is a soft failure: a primitive exhausted its budget, or a
    /// stuck mount was cleared by a controller reset. Errors marked
    /// [`VmediaError::is_fatal`] need an operator.
    #[instrument(skip(self), fields(node = %self.node.uuid))]
    pub fn attach(&self, image_filename: &str) -> Result<Outcome<AttachStep>> {
        self.started(Operation::Attach);
        let mut record = AttachRecord::new(
            image_filename,
            NetworkShare {
                server: self.info.provisioning_server.clone(),
                root_path: self.config.remote_image_share_root.clone(),
            },
        );

        let result: Result<Outcome<AttachStep>> = self.with_context(|ctx| {
            if let Outcome::Aborted(step) = self.hw.attach_virtual_cd(ctx, &mut record)? {
                return Ok(Outcome::Aborted(step));
            }

            begin_step(ctx, Operation::Attach, AttachStep::ConfirmMounted);
            if !self.confirm_mounted(ctx)? {
                return Ok(Outcome::Aborted(AttachStep::ConfirmMounted));
            }
            finish_step(ctx, &mut record, AttachStep::ConfirmMounted);

            self.hw.set_boot_device(ctx)?;
            Ok(Outcome::Completed)
        });

        match &result {
            Ok(outcome) => self.finished(Operation::Attach, outcome),
            Err(e) => self.emit(VmediaEvent::Error {
                operation: Operation::Attach,
                message: e.to_string(),
            }),
        }
        result
    }

    /// Wait for the disk to leave "mounting" and classify the result.
    ///
    /// The status is read once, then re-read up to `disk_attach.attempts`
    /// times with a pause before each read. A mount that stays pending
    /// triggers a cold reset; if the controller comes back the attach still
    /// counts as not mounted.
    fn confirm_mounted(&self, ctx: &MediaContext<'_>) -> Result<bool> {
        let mut status = self.hw.get_disk_attachment_status(ctx);
        if status == MountStatus::Mounting {
            ctx.sleeper.sleep(ctx.timing.disk_attach.interval());
            poll_until(&ctx.timing.disk_attach, ctx.sleeper, "disk attachment", || {
                status = self.hw.get_disk_attachment_status(ctx);
                Ok(status != MountStatus::Mounting)
            });
        }

        match status {
            MountStatus::Mounted => Ok(true),
            MountStatus::Mounting => {
                warn!("Disk attachment still pending, resetting BMC");
                RecoveryController::new(*ctx).cold_reset_and_wait()?;
                Ok(false)
            }
            MountStatus::Error => Err(VmediaError::NfsMountFailed {
                reason: "controller reported an NFS error".to_string(),
            }),
            MountStatus::Unmounted => Err(VmediaError::NfsMountFailed {
                reason: "unknown disk attachment status".to_string(),
            }),
        }
    }

    /// Tear down the virtual CD and restore the default slot layout.
    #[instrument(skip(self), fields(node = %self.node.uuid))]
    pub fn detach(&self) -> Result<Outcome<DetachStep>> {
        self.started(Operation::Detach);
        let result = self.with_context(|ctx| self.hw.detach_virtual_cd(ctx));
        match &result {
            Ok(outcome) => self.finished(Operation::Detach, outcome),
            Err(e) => self.emit(VmediaEvent::Error {
                operation: Operation::Detach,
                message: e.to_string(),
            }),
        }
        result
    }

    /// Current disk attachment status.
    pub fn status(&self) -> MountStatus {
        self.started(Operation::Status);
        let status = self.with_context(|ctx| self.hw.get_disk_attachment_status(ctx));
        self.emit(VmediaEvent::Complete {
            operation: Operation::Status,
        });
        status
    }

    /// Cold reset the controller and wait for it.
    pub fn reset(&self) -> Result<()> {
        self.with_context(|ctx| RecoveryController::new(*ctx).cold_reset_and_wait())
    }

    /// Prepare the node to boot from `image_filename`.
    ///
    /// Detaches whatever is attached, then attaches, retrying the whole
    /// attach `attach_retries` more times while it aborts. Errors are not
    /// retried.
    #[instrument(skip(self), fields(node = %self.node.uuid))]
    pub fn setup_for_boot(&self, image_filename: &str) -> Result<()> {
        if let Outcome::Aborted(step) = self.detach()? {
            warn!(step = %step, "Detach incomplete, attaching anyway");
        }

        let attempts = self.config.attach_retries.saturating_add(1);
        for attempt in 1..=attempts {
            match self.attach(image_filename)? {
                Outcome::Completed => {
                    info!(attempt, "Virtual media attached");
                    return Ok(());
                }
                Outcome::Aborted(step) => {
                    warn!(attempt, attempts, step = %step, "Attach aborted");
                }
            }
            if attempt < attempts {
                self.sleeper.sleep(std::time::Duration::from_millis(
                    self.config.timing.attach_retry_ms,
                ));
            }
        }
        Err(VmediaError::AttachFailed { attempts })
    }
}

/// Transport wrapper that emits command events.
struct ObservableTransport<'a, T: BmcTransport, O: VmediaObserver> {
    inner: &'a T,
    observer: &'a O,
}

impl<'a, T: BmcTransport, O: VmediaObserver> BmcTransport for ObservableTransport<'a, T, O> {
    fn send(&self, command: &IpmiCommand) -> Result<RawResponse, TransportError> {
        self.observer.on_event(&VmediaEvent::CommandSent {
            command: command.to_string(),
        });
        let res = self.inner.send(command);
        let (ok, detail) = match &res {
            Ok(resp) => (true, resp.text().to_string()),
            Err(e) => (false, e.to_string()),
        };
        self.observer
            .on_event(&VmediaEvent::CommandResult { ok, detail });
        res
    }
}
