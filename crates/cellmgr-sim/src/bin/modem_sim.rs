//! Modem simulator runner.
//!
//! Attaches a simulated device described by the engine config (provisioning
//! its configured initial bearer), runs one operation through the `Modem`
//! facade and prints the outcome as JSON, including every AT command the
//! device received.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use cellmgr_common::bearer::{BearerProperties, IpFamily};
use cellmgr_common::error::ModemError;
use cellmgr_core::config::{DeviceConfig, EngineConfig};
use cellmgr_core::device::DeviceSession;
use cellmgr_core::modem::Modem;
use cellmgr_core::registry::PluginRegistry;
use cellmgr_sim::channel::SimReply;
use cellmgr_sim::scenario::{FaultScenario, healthy_device, provisioning_command};

#[derive(Parser, Debug)]
#[command(name = "modem-sim", about = "Run modem operations against a simulated device")]
struct Cli {
    /// Engine config (TOML). Without it a single Quectel device is used.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Device name from the config; defaults to the first entry.
    #[arg(long)]
    device: Option<String>,

    /// Play a seeded fault case instead of a healthy device
    /// (set-initial-bearer only).
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    operation: Operation,
}

#[derive(Subcommand, Debug)]
enum Operation {
    /// Provision the initial EPS bearer.
    SetInitialBearer {
        #[arg(long)]
        apn: Option<String>,
        #[arg(long, default_value = "ipv4")]
        ip_type: IpFamily,
    },
    LoadInitialBearer,
    LoadInitialBearerSettings,
    Scan,
    /// Register with an operator (MCC+MNC), or automatically if omitted.
    Register { operator: Option<String> },
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Operation::SetInitialBearer { .. } => "set-initial-bearer",
            Operation::LoadInitialBearer => "load-initial-bearer",
            Operation::LoadInitialBearerSettings => "load-initial-bearer-settings",
            Operation::Scan => "scan",
            Operation::Register { .. } => "register",
        }
    }
}

fn default_device() -> DeviceConfig {
    DeviceConfig {
        name: "sim0".into(),
        plugin: "quectel".into(),
        initial_bearer_cid: None,
        timeouts: Default::default(),
        initial_bearer: None,
    }
}

fn to_json<T: serde::Serialize>(result: Result<T, ModemError>) -> Result<Value> {
    Ok(match result {
        Ok(value) => json!({ "ok": true, "result": serde_json::to_value(value)? }),
        Err(e) => json!({
            "ok": false,
            "error": { "kind": e.kind(), "message": e.to_string() },
        }),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).map_err(anyhow::Error::msg)?,
        None => EngineConfig::default(),
    };
    let device = match &cli.device {
        Some(name) => config
            .device(name)
            .cloned()
            .with_context(|| format!("no device named '{name}' in config"))?,
        None => config.devices.first().cloned().unwrap_or_else(default_device),
    };

    let plugin = PluginRegistry::default().create(&device.plugin)?;
    let cid = device
        .initial_bearer_cid
        .unwrap_or_else(|| plugin.default_initial_bearer_cid());

    // The simulated device starts out holding the configured bearer, so
    // provisioning it on attach is accepted.
    let stored = device
        .initial_bearer
        .clone()
        .unwrap_or_else(|| BearerProperties::new("internet", IpFamily::Ipv4));
    let requested = match &cli.operation {
        Operation::SetInitialBearer { apn, ip_type } => Some(BearerProperties {
            apn: apn.clone(),
            ip_type: *ip_type,
        }),
        _ => None,
    };

    let (channel, modem) = match (cli.seed, &requested) {
        (Some(seed), Some(properties)) => {
            let case = FaultScenario::new(seed).next_case();
            tracing::info!(seed, ?case, "playing fault case, skipping attach provisioning");
            let channel = Arc::new(case.channel(properties, cid));
            let session = Arc::new(DeviceSession::from_config(&device, channel.clone()));
            (channel, Modem::new(session, plugin))
        }
        _ => {
            let channel = Arc::new(healthy_device(&stored, cid));
            if let Some(properties) = &requested {
                channel.push(provisioning_command(properties, cid), SimReply::ok("OK"));
            }
            let modem = Modem::attach(&device, channel.clone(), plugin).await?;
            (channel, modem)
        }
    };

    let operation = cli.operation.name();
    tracing::info!(
        device = %device.name,
        plugin = modem.plugin_name(),
        operation,
        "running operation"
    );

    let outcome = match cli.operation {
        Operation::SetInitialBearer { apn, ip_type } => {
            let properties = BearerProperties { apn, ip_type };
            to_json(modem.set_initial_bearer_settings(properties).await)?
        }
        Operation::LoadInitialBearer => to_json(modem.load_initial_bearer().await)?,
        Operation::LoadInitialBearerSettings => {
            to_json(modem.load_initial_bearer_settings().await)?
        }
        Operation::Scan => to_json(modem.scan_networks().await)?,
        Operation::Register { operator } => {
            to_json(modem.register(operator.unwrap_or_default()).await)?
        }
    };

    let report = json!({
        "device": device.name,
        "plugin": modem.plugin_name(),
        "operation": operation,
        "outcome": outcome,
        "commands": channel.commands(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
