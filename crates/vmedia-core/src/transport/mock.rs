//! Mock BMC transport for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::traits::{BmcTransport, TransportError};
use crate::protocol::{IpmiCommand, RawResponse};

/// Scripted reply for a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Successful round-trip printing this payload.
    Output(String),
    /// Transport failure.
    Fail,
}

impl MockReply {
    pub fn ok(output: &str) -> Self {
        MockReply::Output(output.to_string())
    }
}

struct Rule {
    prefix: Vec<String>,
    queue: VecDeque<MockReply>,
    fallback: Option<MockReply>,
}

/// Mock transport for unit testing state machine logic.
///
/// Replies are looked up by the longest matching argument prefix, so a
/// rule for `raw 0x32 0xd7` also answers every redirect command that has
/// no more specific rule. Queued replies are consumed first, then the
/// persistent reply, then an empty successful output.
pub struct MockTransport {
    rules: Arc<Mutex<Vec<Rule>>>,
    /// Captured commands.
    sent: Arc<Mutex<Vec<IpmiCommand>>>,
    /// Whether the controller is "reachable".
    connected: Arc<Mutex<bool>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            rules: Arc::new(Mutex::new(Vec::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(Mutex::new(true)),
        }
    }

    fn with_rule(&self, command: IpmiCommand, f: impl FnOnce(&mut Rule)) {
        let prefix = command.args();
        let mut rules = self.rules.lock().unwrap();
        if let Some(rule) = rules.iter_mut().find(|r| r.prefix == prefix) {
            f(rule);
        } else {
            let mut rule = Rule {
                prefix,
                queue: VecDeque::new(),
                fallback: None,
            };
            f(&mut rule);
            rules.push(rule);
        }
    }

    /// Always answer `command` with `output`.
    pub fn reply(&self, command: impl Into<IpmiCommand>, output: &str) {
        self.with_rule(command.into(), |r| r.fallback = Some(MockReply::ok(output)));
    }

    /// Always fail `command`.
    pub fn fail(&self, command: impl Into<IpmiCommand>) {
        self.with_rule(command.into(), |r| r.fallback = Some(MockReply::Fail));
    }

    /// Queue replies consumed before the persistent one.
    pub fn reply_seq(
        &self,
        command: impl Into<IpmiCommand>,
        replies: impl IntoIterator<Item = MockReply>,
    ) {
        self.with_rule(command.into(), |r| r.queue.extend(replies));
    }

    /// Get all captured commands.
    pub fn sent(&self) -> Vec<IpmiCommand> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of times exactly `command` was sent.
    pub fn count(&self, command: impl Into<IpmiCommand>) -> usize {
        let command = command.into();
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == command)
            .count()
    }

    /// Simulate an unreachable controller.
    pub fn disconnect(&self) {
        *self.connected.lock().unwrap() = false;
    }

    /// Simulate the controller coming back.
    pub fn reconnect(&self) {
        *self.connected.lock().unwrap() = true;
    }

    fn lookup(&self, args: &[String]) -> MockReply {
        let mut rules = self.rules.lock().unwrap();
        let best = rules
            .iter_mut()
            .filter(|r| args.starts_with(&r.prefix))
            .max_by_key(|r| r.prefix.len());
        match best {
            Some(rule) => rule
                .queue
                .pop_front()
                .or_else(|| rule.fallback.clone())
                .unwrap_or_else(|| MockReply::ok("")),
            None => MockReply::ok(""),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl BmcTransport for MockTransport {
    fn send(&self, command: &IpmiCommand) -> Result<RawResponse, TransportError> {
        self.sent.lock().unwrap().push(command.clone());
        if !*self.connected.lock().unwrap() {
            return Err(TransportError::Disconnected);
        }
        match self.lookup(&command.args()) {
            MockReply::Output(out) => Ok(RawResponse::new(out)),
            MockReply::Fail => Err(TransportError::CommandFailed {
                command: command.to_string(),
                code: Some(1),
                stderr: "mock failure".into(),
            }),
        }
    }
}
