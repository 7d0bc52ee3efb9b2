//! Plugin name → [`Modem3gpp`] constructor.

use std::collections::BTreeMap;
use std::sync::Arc;

use cellmgr_common::error::ModemError;

use crate::modem::{GenericModem, Modem3gpp, QuectelModem};

pub type PluginFactory = fn() -> Arc<dyn Modem3gpp>;

/// Name used when a device config names no plugin.
pub const DEFAULT_PLUGIN: &str = "generic";

#[derive(Debug, Clone)]
pub struct PluginRegistry {
    factories: BTreeMap<String, PluginFactory>,
}

impl PluginRegistry {
    /// Registry without any plugin.
    pub fn empty() -> Self {
        PluginRegistry {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the built-in plugins.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("generic", generic);
        registry.register("quectel", quectel);
        registry
    }

    /// Add or replace a plugin. Returns whether a plugin of that name was
    /// already present.
    pub fn register(&mut self, name: impl Into<String>, factory: PluginFactory) -> bool {
        let name = name.into();
        let replaced = self.factories.insert(name.clone(), factory).is_some();
        if replaced {
            tracing::warn!(plugin = %name, "replacing registered plugin");
        }
        replaced
    }

    pub fn create(&self, name: &str) -> Result<Arc<dyn Modem3gpp>, ModemError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ModemError::Unsupported(format!("no plugin named '{name}'")))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

fn generic() -> Arc<dyn Modem3gpp> {
    Arc::new(GenericModem)
}

fn quectel() -> Arc<dyn Modem3gpp> {
    Arc::new(QuectelModem)
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
