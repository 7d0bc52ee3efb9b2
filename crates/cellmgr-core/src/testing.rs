//! Scripted command channel for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;

use cellmgr_common::error::TransportError;

use crate::device::DeviceSession;
use crate::transport::CommandChannel;

type Scripted = (String, Result<String, TransportError>);

/// Answers commands strictly in script order. Anything unexpected gets a
/// device `ERROR`.
#[derive(Default)]
pub(crate) struct FakeChannel {
    script: Mutex<VecDeque<Scripted>>,
    sent: Mutex<Vec<String>>,
    timeouts: Mutex<Vec<Duration>>,
}

impl FakeChannel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, command: &str, response: &str) -> Self {
        self.push(command, Ok(response.to_string()))
    }

    pub(crate) fn fail(self, command: &str, err: TransportError) -> Self {
        self.push(command, Err(err))
    }

    fn push(self, command: &str, reply: Result<String, TransportError>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back((command.to_string(), reply));
        self
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn timeouts(&self) -> Vec<Duration> {
        self.timeouts.lock().unwrap().clone()
    }
}

impl CommandChannel for FakeChannel {
    fn command<'a>(
        &'a self,
        text: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<String, TransportError>> {
        self.sent.lock().unwrap().push(text.to_string());
        self.timeouts.lock().unwrap().push(timeout);
        let reply = match self.script.lock().unwrap().pop_front() {
            Some((expected, reply)) if expected == text => reply,
            _ => Err(TransportError::Device("ERROR".into())),
        };
        Box::pin(async move { reply })
    }
}

pub(crate) fn session(channel: &Arc<FakeChannel>) -> DeviceSession {
    DeviceSession::new(channel.clone())
}
