//! Error types shared by the operation engine and its collaborators.
//!
//! Every public operation resolves to either a value or exactly one
//! `ModemError`. `TransportError` is what a command channel reports; the
//! engine wraps it together with the command text that failed.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Transport ───────────────────────────────────────────────────────

/// Failure reported by a command channel for a single command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    /// The device answered with `ERROR` or `+CME ERROR: ...`.
    #[error("device replied '{0}'")]
    Device(String),
    #[error("channel failure: {0}")]
    Channel(String),
    #[error("cancelled")]
    Cancelled,
}

// ── Error kinds ─────────────────────────────────────────────────────

/// Coarse classification of a `ModemError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    Parse,
    DeviceState,
    NotReady,
    Unsupported,
    InvalidArgs,
    Aborted,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Transport => write!(f, "transport_error"),
            ErrorKind::Parse => write!(f, "parse_error"),
            ErrorKind::DeviceState => write!(f, "device_state_error"),
            ErrorKind::NotReady => write!(f, "not_ready_error"),
            ErrorKind::Unsupported => write!(f, "unsupported"),
            ErrorKind::InvalidArgs => write!(f, "invalid_args"),
            ErrorKind::Aborted => write!(f, "aborted"),
        }
    }
}

// ── ModemError ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModemError {
    #[error("command '{command}' failed: {source}")]
    Transport {
        command: String,
        #[source]
        source: TransportError,
    },
    #[error("couldn't parse response: {0}")]
    Parse(String),
    #[error("wrong state: {0}")]
    DeviceState(String),
    #[error("not ready: {0}")]
    NotReady(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("operation aborted: {0}")]
    Aborted(String),
}

impl ModemError {
    pub fn transport(command: impl Into<String>, source: TransportError) -> Self {
        ModemError::Transport {
            command: command.into(),
            source,
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        ModemError::Parse(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ModemError::Transport { .. } => ErrorKind::Transport,
            ModemError::Parse(_) => ErrorKind::Parse,
            ModemError::DeviceState(_) => ErrorKind::DeviceState,
            ModemError::NotReady(_) => ErrorKind::NotReady,
            ModemError::Unsupported(_) => ErrorKind::Unsupported,
            ModemError::InvalidArgs(_) => ErrorKind::InvalidArgs,
            ModemError::Aborted(_) => ErrorKind::Aborted,
        }
    }

    /// The command text that failed, for transport errors.
    pub fn command(&self) -> Option<&str> {
        match self {
            ModemError::Transport { command, .. } => Some(command),
            _ => None,
        }
    }
}
