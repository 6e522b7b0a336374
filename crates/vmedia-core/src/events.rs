//! Event system for UI decoupling.
//!
//! Allows the CLI (or an orchestration framework) to follow attach/detach
//! progress without tight coupling to the core logic.

use std::fmt;
use std::sync::Mutex;

use crate::state::{AttachState, MountStatus};

/// Log level for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Top-level operation currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Attach,
    Detach,
    Recovery,
    Status,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Attach => write!(f, "Attach"),
            Operation::Detach => write!(f, "Detach"),
            Operation::Recovery => write!(f, "Recovery"),
            Operation::Status => write!(f, "Status"),
        }
    }
}

/// Events emitted by a virtual media session.
#[derive(Debug, Clone)]
pub enum VmediaEvent {
    /// An operation started.
    Started { operation: Operation, node: String },
    /// Attach state machine advanced.
    StateChanged { from: AttachState, to: AttachState },
    /// A sequence step started.
    Step { operation: Operation, step: String },
    /// Command sent to the controller.
    CommandSent { command: String },
    /// Response or transport failure for the last command.
    CommandResult { ok: bool, detail: String },
    /// Disk attachment status read.
    MountStatus { status: MountStatus },
    /// Log message.
    Log { level: LogLevel, message: String },
    /// Operation aborted or failed.
    Error { operation: Operation, message: String },
    /// Operation completed successfully.
    Complete { operation: Operation },
}

/// Observer trait for receiving session events.
///
/// Implement this trait in your UI layer to receive updates.
pub trait VmediaObserver: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &VmediaEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl VmediaObserver for NullObserver {
    fn on_event(&self, _event: &VmediaEvent) {}
}

/// Observer that keeps every event, for tests and post-mortems.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<VmediaEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<VmediaEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl VmediaObserver for RecordingObserver {
    fn on_event(&self, event: &VmediaEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl VmediaObserver for TracingObserver {
    fn on_event(&self, event: &VmediaEvent) {
        match event {
            VmediaEvent::Started { operation, node } => {
                tracing::info!(operation = %operation, node = %node, "Operation started");
            }
            VmediaEvent::StateChanged { from, to } => {
                tracing::info!(from = %from, to = %to, "State changed");
            }
            VmediaEvent::Step { operation, step } => {
                tracing::debug!(operation = %operation, step = %step, "Step");
            }
            VmediaEvent::CommandSent { command } => {
                tracing::trace!(command = %command, "IPMI command");
            }
            VmediaEvent::CommandResult { ok, detail } => {
                tracing::trace!(ok, detail = %detail, "IPMI result");
            }
            VmediaEvent::MountStatus { status } => {
                tracing::debug!(status = %status, "Disk attachment status");
            }
            VmediaEvent::Log { level, message } => match level {
                LogLevel::Trace => tracing::trace!("{}", message),
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
            VmediaEvent::Error { operation, message } => {
                tracing::error!(operation = %operation, "Error: {}", message);
            }
            VmediaEvent::Complete { operation } => {
                tracing::info!(operation = %operation, "Operation complete");
            }
        }
    }
}
