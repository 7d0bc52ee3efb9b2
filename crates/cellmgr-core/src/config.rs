use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use cellmgr_common::bearer::BearerProperties;

use crate::registry::DEFAULT_PLUGIN;
use crate::transport::Timeouts;

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfigInput {
    pub version: u32,
    pub timeouts: TimeoutsInput,
    pub devices: Vec<DeviceConfigInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimeoutsInput {
    pub short_ms: Option<u64>,
    pub long_ms: Option<u64>,
    pub scan_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeviceConfigInput {
    pub name: String,
    pub plugin: Option<String>,
    pub initial_bearer_cid: Option<u32>,
    pub timeouts: TimeoutsInput,
    /// Settings [`Modem::attach`](crate::modem::Modem::attach) provisions.
    pub initial_bearer: Option<BearerProperties>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub name: String,
    pub plugin: String,
    pub initial_bearer_cid: Option<u32>,
    pub timeouts: Timeouts,
    /// Provisioned by [`Modem::attach`](crate::modem::Modem::attach).
    pub initial_bearer: Option<BearerProperties>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub version: u32,
    pub timeouts: Timeouts,
    pub devices: Vec<DeviceConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            timeouts: Timeouts::default(),
            devices: Vec::new(),
        }
    }
}

impl TimeoutsInput {
    fn resolve(&self, base: Timeouts) -> Result<Timeouts, String> {
        let pick = |ms: Option<u64>, default: Duration, what: &str| match ms {
            Some(0) => Err(format!("{what} timeout must be non-zero")),
            Some(ms) => Ok(Duration::from_millis(ms)),
            None => Ok(default),
        };
        Ok(Timeouts {
            short: pick(self.short_ms, base.short, "short")?,
            long: pick(self.long_ms, base.long, "long")?,
            scan: pick(self.scan_ms, base.scan, "scan")?,
        })
    }
}

impl EngineConfigInput {
    pub fn resolve(self) -> Result<EngineConfig, String> {
        let version = if self.version == 0 {
            CONFIG_VERSION
        } else {
            self.version
        };
        if version != CONFIG_VERSION {
            return Err(format!("Unsupported config version {}", version));
        }

        let timeouts = self.timeouts.resolve(Timeouts::default())?;

        let mut used = HashSet::new();
        let mut devices = Vec::new();
        for device in self.devices {
            let name = device.name.trim().to_string();
            if name.is_empty() {
                tracing::warn!("skipping device entry without a name");
                continue;
            }
            if !used.insert(name.clone()) {
                tracing::warn!(device = %name, "skipping duplicate device entry");
                continue;
            }
            if device.initial_bearer_cid == Some(0) {
                return Err(format!("device {name}: initial_bearer_cid must be at least 1"));
            }
            let plugin = device
                .plugin
                .map(|p| p.trim().to_ascii_lowercase())
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_PLUGIN.to_string());
            let device_timeouts = device
                .timeouts
                .resolve(timeouts)
                .map_err(|e| format!("device {name}: {e}"))?;
            devices.push(DeviceConfig {
                name,
                plugin,
                initial_bearer_cid: device.initial_bearer_cid,
                timeouts: device_timeouts,
                initial_bearer: device.initial_bearer,
            });
        }

        Ok(EngineConfig {
            version,
            timeouts,
            devices,
        })
    }
}

impl EngineConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, String> {
        if input.trim().is_empty() {
            return Ok(EngineConfig::default());
        }
        let parsed: EngineConfigInput =
            toml::from_str(input).map_err(|e| format!("Invalid config TOML: {}", e))?;
        parsed.resolve()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_toml_str(&input)
    }

    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.name == name)
    }
}
