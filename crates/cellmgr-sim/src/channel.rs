//! # Scripted Command Channel
//!
//! Replies are keyed by exact command text. Each command has a queue of
//! replies consumed in order; the last one repeats. Commands with no
//! script get a device `ERROR`, like an unsupported command on a real
//! port.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;

use cellmgr_common::error::TransportError;
use cellmgr_core::transport::CommandChannel;

/// One scripted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimReply {
    /// Final `OK` with this response text.
    Ok(String),
    /// `ERROR` / `+CME ERROR: ...` with this text.
    Error(String),
    /// The port reports a timeout straight away.
    Timeout,
    /// Answer after `Duration`; subject to the command timeout.
    Delayed(Duration, String),
    /// Never answer; the command timeout fires.
    Silent,
}

impl SimReply {
    pub fn ok(text: impl Into<String>) -> Self {
        SimReply::Ok(text.into())
    }

    pub fn error(text: impl Into<String>) -> Self {
        SimReply::Error(text.into())
    }
}

/// A command as the simulated port received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub text: String,
    pub timeout: Duration,
}

#[derive(Debug, Default)]
pub struct SimChannel {
    script: Mutex<HashMap<String, VecDeque<SimReply>>>,
    received: Mutex<Vec<Received>>,
}

impl SimChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`SimChannel::push`].
    pub fn on(self, command: impl Into<String>, reply: SimReply) -> Self {
        self.push(command, reply);
        self
    }

    /// Queue `reply` for the next unanswered use of `command`.
    pub fn push(&self, command: impl Into<String>, reply: SimReply) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(command.into())
            .or_default()
            .push_back(reply);
    }

    /// Command texts in the order they were received.
    pub fn commands(&self) -> Vec<String> {
        self.received().into_iter().map(|r| r.text).collect()
    }

    pub fn received(&self) -> Vec<Received> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_reply(&self, text: &str) -> Option<SimReply> {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = script.get_mut(text)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl CommandChannel for SimChannel {
    fn command<'a>(
        &'a self,
        text: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<String, TransportError>> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Received {
                text: text.to_string(),
                timeout,
            });
        let reply = self.next_reply(text);
        tracing::trace!(command = text, reply = ?reply, "sim command");

        Box::pin(async move {
            let answer = async move {
                match reply {
                    None => Err(TransportError::Device("ERROR".into())),
                    Some(SimReply::Ok(text)) => Ok(text),
                    Some(SimReply::Error(text)) => Err(TransportError::Device(text)),
                    Some(SimReply::Timeout) => Err(TransportError::Timeout(timeout)),
                    Some(SimReply::Delayed(delay, text)) => {
                        tokio::time::sleep(delay).await;
                        Ok(text)
                    }
                    Some(SimReply::Silent) => futures::future::pending().await,
                }
            };
            tokio::time::timeout(timeout, answer)
                .await
                .unwrap_or(Err(TransportError::Timeout(timeout)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn replies_in_order_and_last_repeats() {
        let chan = SimChannel::new()
            .on("+CFUN?", SimReply::ok("+CFUN: 1"))
            .on("+CFUN?", SimReply::ok("+CFUN: 4"));
        assert_eq!(chan.command("+CFUN?", SHORT).await.unwrap(), "+CFUN: 1");
        assert_eq!(chan.command("+CFUN?", SHORT).await.unwrap(), "+CFUN: 4");
        assert_eq!(chan.command("+CFUN?", SHORT).await.unwrap(), "+CFUN: 4");
        assert_eq!(chan.commands().len(), 3);
    }

    #[tokio::test]
    async fn unscripted_command_is_device_error() {
        let chan = SimChannel::new();
        let err = chan.command("+CGMI", SHORT).await.unwrap_err();
        assert_eq!(err, TransportError::Device("ERROR".into()));
        assert_eq!(chan.commands(), vec!["+CGMI"]);
    }

    #[tokio::test]
    async fn slow_reply_times_out() {
        let chan = SimChannel::new()
            .on("+COPS=?", SimReply::Delayed(Duration::from_secs(5), "+COPS: ,,".into()))
            .on("+CREG?", SimReply::Silent);
        assert_eq!(
            chan.command("+COPS=?", SHORT).await.unwrap_err(),
            TransportError::Timeout(SHORT)
        );
        assert_eq!(
            chan.command("+CREG?", SHORT).await.unwrap_err(),
            TransportError::Timeout(SHORT)
        );
        assert_eq!(chan.received()[0].timeout, SHORT);
    }

    #[tokio::test]
    async fn delayed_reply_within_timeout() {
        let chan = SimChannel::new().on(
            "+CREG?",
            SimReply::Delayed(Duration::from_millis(5), "+CREG: 0,1".into()),
        );
        assert_eq!(chan.command("+CREG?", SHORT).await.unwrap(), "+CREG: 0,1");
    }
}
