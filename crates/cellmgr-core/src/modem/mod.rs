//! # Modem Capabilities
//!
//! [`Modem3gpp`] is what a vendor plugin implements: each method runs one
//! operation to completion against a [`DeviceSession`]. The provided
//! methods cover everything a plain 3GPP device supports; plugins override
//! what their firmware does differently.
//!
//! [`Modem`] is the public facade. It binds a plugin to one session and
//! spawns every operation as its own task, handing back an
//! [`OperationHandle`] that resolves exactly once.

mod generic;
mod quectel;

pub use generic::GenericModem;
pub use quectel::QuectelModem;

use std::sync::Arc;

use futures::FutureExt as _;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use cellmgr_common::bearer::BearerProperties;
use cellmgr_common::error::ModemError;
use cellmgr_common::network::NetworkInfo;

use crate::completion::{OperationHandle, spawn_operation};
use crate::config::DeviceConfig;
use crate::device::DeviceSession;
use crate::ops::{LoadInitialBearer, Register, ScanNetworks};
use crate::sequence::run;
use crate::transport::CommandChannel;

// ─── Capability Trait ───────────────────────────────────────────────────────

pub trait Modem3gpp: Send + Sync {
    /// Plugin name as used in configuration.
    fn name(&self) -> &'static str;

    /// Context id used for the initial EPS bearer when none is configured.
    fn default_initial_bearer_cid(&self) -> u32 {
        1
    }

    fn set_initial_bearer_settings<'a>(
        &'a self,
        _session: &'a DeviceSession,
        _properties: BearerProperties,
        _cancel: Option<&'a CancellationToken>,
    ) -> BoxFuture<'a, Result<(), ModemError>> {
        let err = ModemError::Unsupported(format!(
            "{}: setting initial bearer settings",
            self.name()
        ));
        futures::future::ready(Err(err)).boxed()
    }

    fn load_initial_bearer<'a>(
        &'a self,
        session: &'a DeviceSession,
        cancel: Option<&'a CancellationToken>,
    ) -> BoxFuture<'a, Result<BearerProperties, ModemError>> {
        let sequence = LoadInitialBearer::new(self.default_initial_bearer_cid());
        run(sequence, session, cancel).boxed()
    }

    /// The device keeps a single context definition, so the configured
    /// settings read back the same as the runtime ones.
    fn load_initial_bearer_settings<'a>(
        &'a self,
        session: &'a DeviceSession,
        cancel: Option<&'a CancellationToken>,
    ) -> BoxFuture<'a, Result<BearerProperties, ModemError>> {
        self.load_initial_bearer(session, cancel)
    }

    fn scan_networks<'a>(
        &'a self,
        session: &'a DeviceSession,
        cancel: Option<&'a CancellationToken>,
    ) -> BoxFuture<'a, Result<Vec<NetworkInfo>, ModemError>> {
        run(ScanNetworks::new(), session, cancel).boxed()
    }

    fn register<'a>(
        &'a self,
        session: &'a DeviceSession,
        operator_id: String,
        cancel: Option<&'a CancellationToken>,
    ) -> BoxFuture<'a, Result<(), ModemError>> {
        run(Register::new(operator_id), session, cancel)
            .map(|result| result.map(|_| ()))
            .boxed()
    }
}

// ─── Facade ─────────────────────────────────────────────────────────────────

/// One attached modem: session plus the plugin that drives it.
#[derive(Clone)]
pub struct Modem {
    session: Arc<DeviceSession>,
    plugin: Arc<dyn Modem3gpp>,
    cancel: CancellationToken,
}

impl Modem {
    pub fn new(session: Arc<DeviceSession>, plugin: Arc<dyn Modem3gpp>) -> Self {
        tracing::info!(device = %session.id(), plugin = plugin.name(), "modem attached");
        Modem {
            session,
            plugin,
            cancel: CancellationToken::new(),
        }
    }

    /// Attach the device described by `config` and provision its
    /// configured initial bearer, if it has one.
    pub async fn attach(
        config: &DeviceConfig,
        channel: Arc<dyn CommandChannel>,
        plugin: Arc<dyn Modem3gpp>,
    ) -> Result<Self, ModemError> {
        let session = Arc::new(DeviceSession::from_config(config, channel));
        let modem = Modem::new(session, plugin);
        if let Some(properties) = config.initial_bearer.clone() {
            tracing::info!(
                device = %config.name,
                apn = properties.apn_or_empty(),
                "provisioning configured initial bearer"
            );
            modem.set_initial_bearer_settings(properties).await?;
        }
        Ok(modem)
    }

    pub fn session(&self) -> &Arc<DeviceSession> {
        &self.session
    }

    pub fn plugin_name(&self) -> &'static str {
        self.plugin.name()
    }

    pub fn set_initial_bearer_settings(&self, properties: BearerProperties) -> OperationHandle<()> {
        let (session, plugin, cancel) = self.parts();
        spawn_operation(async move {
            plugin
                .set_initial_bearer_settings(&session, properties, Some(&cancel))
                .await
        })
    }

    pub fn load_initial_bearer(&self) -> OperationHandle<BearerProperties> {
        let (session, plugin, cancel) = self.parts();
        spawn_operation(async move { plugin.load_initial_bearer(&session, Some(&cancel)).await })
    }

    pub fn load_initial_bearer_settings(&self) -> OperationHandle<BearerProperties> {
        let (session, plugin, cancel) = self.parts();
        spawn_operation(async move {
            plugin
                .load_initial_bearer_settings(&session, Some(&cancel))
                .await
        })
    }

    pub fn scan_networks(&self) -> OperationHandle<Vec<NetworkInfo>> {
        let (session, plugin, cancel) = self.parts();
        spawn_operation(async move { plugin.scan_networks(&session, Some(&cancel)).await })
    }

    /// Empty `operator_id` requests automatic registration.
    pub fn register(&self, operator_id: impl Into<String>) -> OperationHandle<()> {
        let operator_id = operator_id.into();
        let (session, plugin, cancel) = self.parts();
        spawn_operation(async move {
            plugin
                .register(&session, operator_id, Some(&cancel))
                .await
        })
    }

    /// Mark the device gone: in-flight commands are cancelled and new
    /// operations fail with `NotReady`.
    pub fn detach(&self) {
        self.session.detach();
        self.cancel.cancel();
    }

    fn parts(&self) -> (Arc<DeviceSession>, Arc<dyn Modem3gpp>, CancellationToken) {
        (
            self.session.clone(),
            self.plugin.clone(),
            self.cancel.clone(),
        )
    }
}

impl std::fmt::Debug for Modem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Modem")
            .field("session", &self.session)
            .field("plugin", &self.plugin.name())
            .finish()
    }
}
