//! Bounded poll-until-confirmed loop shared by every asynchronous step.

use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::transport::TransportError;

/// Blocking wait between polls.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the calling thread.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Records requested waits without sleeping (tests, dry runs).
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sleeps so far.
    pub fn count(&self) -> usize {
        self.slept.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Sum of all requested waits.
    pub fn total(&self) -> Duration {
        self.slept
            .lock()
            .map(|s| s.iter().sum())
            .unwrap_or_default()
    }

    pub fn durations(&self) -> Vec<Duration> {
        self.slept.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
    }
}

/// Attempt budget and wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval_ms: u64,
}

impl PollPolicy {
    pub const fn new(attempts: u32, interval_secs: u64) -> Self {
        Self {
            attempts,
            interval_ms: interval_secs * 1000,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Run `probe` until it reports a match or the budget is exhausted.
///
/// A transport error from the probe counts as "not yet". The probe runs at
/// most `policy.attempts` times and there is no sleep after the last one.
pub fn poll_until<F>(policy: &PollPolicy, sleeper: &dyn Sleeper, what: &str, mut probe: F) -> bool
where
    F: FnMut() -> Result<bool, TransportError>,
{
    for attempt in 1..=policy.attempts {
        match probe() {
            Ok(true) => {
                debug!(what, attempt, "Confirmed");
                return true;
            }
            Ok(false) => {
                debug!(what, attempt, budget = policy.attempts, "Not confirmed yet");
            }
            Err(e) => {
                debug!(what, attempt, error = %e, "Probe failed, retrying");
            }
        }
        if attempt < policy.attempts {
            sleeper.sleep(policy.interval());
        }
    }
    warn!(what, attempts = policy.attempts, "Attempts exceeded");
    false
}
