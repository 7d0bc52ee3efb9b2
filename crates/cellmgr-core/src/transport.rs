//! # Command Channel
//!
//! The engine talks to a device only through [`CommandChannel`]: one AT
//! command in, one reply (or one [`TransportError`]) out. Serial framing,
//! port discovery and unsolicited result handling live behind the trait.
//!
//! Timeouts are enforced by the channel; the engine only chooses which
//! timeout each command carries.

use std::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use cellmgr_common::error::TransportError;

// ─── Timeouts ───────────────────────────────────────────────────────────────

/// Per-class command timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Mode queries and RF toggles.
    pub short: Duration,
    /// Provisioning and status commands.
    pub long: Duration,
    /// Network scan and manual registration.
    pub scan: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            short: Duration::from_secs(5),
            long: Duration::from_secs(20),
            scan: Duration::from_secs(120),
        }
    }
}

// ─── Command ────────────────────────────────────────────────────────────────

/// One device transaction: AT command text (without the `AT` prefix) plus
/// the timeout it is dispatched with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub text: String,
    pub timeout: Duration,
}

impl Command {
    pub fn new(text: impl Into<String>, timeout: Duration) -> Self {
        Command {
            text: text.into(),
            timeout,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}ms)", self.text, self.timeout.as_millis())
    }
}

// ─── Channel ────────────────────────────────────────────────────────────────

/// Request/response channel to a modem's control port.
///
/// Implementations must resolve every call exactly once, reporting timeouts
/// and `ERROR` replies as [`TransportError`] values. Keeping a single
/// command outstanding per device is the channel's job.
pub trait CommandChannel: Send + Sync {
    fn command<'a>(
        &'a self,
        text: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<String, TransportError>>;
}

/// Send `command`, racing it against `cancel` when one is given.
///
/// A cancelled dispatch is just another transport failure.
pub async fn dispatch(
    channel: &dyn CommandChannel,
    command: &Command,
    cancel: Option<&CancellationToken>,
) -> Result<String, TransportError> {
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(TransportError::Cancelled),
                reply = channel.command(&command.text, command.timeout) => reply,
            }
        }
        None => channel.command(&command.text, command.timeout).await,
    }
}
