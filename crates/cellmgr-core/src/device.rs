//! # Device Session
//!
//! State that lives as long as a modem stays attached: its command channel,
//! timeout profile, and the initial EPS bearer context id. The cid is
//! resolved lazily on first use and never changes afterwards; every
//! operation on the device shares it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use cellmgr_common::error::ModemError;
use cellmgr_common::ids;

use crate::config::DeviceConfig;
use crate::transport::{CommandChannel, Timeouts};

/// One attached modem.
pub struct DeviceSession {
    id: String,
    name: Option<String>,
    channel: Arc<dyn CommandChannel>,
    timeouts: Timeouts,
    /// Configured cid that overrides the plugin default on resolution.
    preferred_cid: Option<u32>,
    initial_bearer_cid: OnceLock<u32>,
    attached: AtomicBool,
}

impl DeviceSession {
    pub fn new(channel: Arc<dyn CommandChannel>) -> Self {
        DeviceSession {
            id: ids::device_id(),
            name: None,
            channel,
            timeouts: Timeouts::default(),
            preferred_cid: None,
            initial_bearer_cid: OnceLock::new(),
            attached: AtomicBool::new(true),
        }
    }

    /// Build a session from a resolved device config entry.
    pub fn from_config(config: &DeviceConfig, channel: Arc<dyn CommandChannel>) -> Self {
        DeviceSession::new(channel)
            .with_name(config.name.clone())
            .with_timeouts(config.timeouts)
            .with_preferred_cid(config.initial_bearer_cid)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_preferred_cid(mut self, cid: Option<u32>) -> Self {
        self.preferred_cid = cid;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn channel(&self) -> &dyn CommandChannel {
        self.channel.as_ref()
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    // ─── Initial bearer cid ─────────────────────────────────────────────

    /// Cached cid, or `NotReady` if no operation has resolved it yet.
    pub fn initial_bearer_cid(&self) -> Result<u32, ModemError> {
        self.initial_bearer_cid.get().copied().ok_or_else(|| {
            ModemError::NotReady("initial bearer context id not resolved yet".into())
        })
    }

    /// Get the cached cid, resolving it on first use. A configured cid wins
    /// over `fallback`; `fallback` is evaluated at most once per session.
    pub fn resolve_initial_bearer_cid(&self, fallback: impl FnOnce() -> u32) -> u32 {
        *self.initial_bearer_cid.get_or_init(|| {
            let cid = self.preferred_cid.unwrap_or_else(fallback);
            tracing::debug!(device = %self.id, cid, "resolved initial bearer context id");
            cid
        })
    }

    // ─── Attachment ─────────────────────────────────────────────────────

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Mark the device gone. New operations fail with `NotReady`.
    pub fn detach(&self) {
        if self.attached.swap(false, Ordering::AcqRel) {
            tracing::info!(device = %self.id, "device detached");
        }
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("timeouts", &self.timeouts)
            .field("initial_bearer_cid", &self.initial_bearer_cid.get())
            .field("attached", &self.is_attached())
            .finish()
    }
}
