//! # Scenarios
//!
//! [`healthy_device`] scripts a modem that answers everything the engine
//! asks. [`FaultScenario`] draws reproducible fault cases for the
//! set-initial-bearer flow; each [`SetBearerCase`] can both script a
//! [`SimChannel`] and predict what the engine must send and deliver.

use rand::RngExt as _;
use rand::SeedableRng;
use rand::rngs::StdRng;

use cellmgr_common::bearer::BearerProperties;
use cellmgr_common::error::ErrorKind;
use cellmgr_core::parsers::quote_string;

use crate::channel::{SimChannel, SimReply};

/// Command that provisions `properties` into context `cid`.
pub fn provisioning_command(properties: &BearerProperties, cid: u32) -> String {
    let pdp_type = properties.ip_type.or_ipv4().pdp_type().unwrap_or("IP");
    format!(
        "+CGDCONT={cid},\"{pdp_type}\",{}",
        quote_string(properties.apn_or_empty())
    )
}

/// `+CGDCONT?` listing with `properties` defined on `cid`.
pub fn context_listing(properties: &BearerProperties, cid: u32) -> String {
    let pdp_type = properties.ip_type.or_ipv4().pdp_type().unwrap_or("IP");
    format!(
        "+CGDCONT: {cid},\"{pdp_type}\",{},\"0.0.0.0\",0,0\r\nOK",
        quote_string(properties.apn_or_empty())
    )
}

/// A modem in full functionality with `properties` already on `cid`,
/// two visible networks, registered at home.
pub fn healthy_device(properties: &BearerProperties, cid: u32) -> SimChannel {
    SimChannel::new()
        .on("+CFUN?", SimReply::ok("+CFUN: 1\r\nOK"))
        .on("+CFUN=4", SimReply::ok("OK"))
        .on("+CFUN=1", SimReply::ok("OK"))
        .on(provisioning_command(properties, cid), SimReply::ok("OK"))
        .on("+CGDCONT?", SimReply::ok(context_listing(properties, cid)))
        .on(
            "+COPS=?",
            SimReply::ok(
                "+COPS: (2,\"Vodafone ES\",\"voda ES\",\"21401\",7),\
                 (1,\"Orange\",\"Orange\",\"21403\",7),,(0-4),(0-2)\r\nOK",
            ),
        )
        .on("+COPS=0", SimReply::ok("OK"))
        .on("+COPS=1,2,\"21401\"", SimReply::ok("OK"))
        .on("+COPS=1,2,\"21403\"", SimReply::ok("OK"))
        .on("+CREG?", SimReply::ok("+CREG: 0,1\r\nOK"))
}

// ─── Set-Initial-Bearer Fault Cases ─────────────────────────────────────────

/// How one command in a case misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    Error,
    Timeout,
}

impl Fault {
    fn reply(self, ok: &str) -> SimReply {
        match self {
            Fault::None => SimReply::ok(ok),
            Fault::Error => SimReply::error("+CME ERROR: 3"),
            Fault::Timeout => SimReply::Timeout,
        }
    }

    fn is_fault(self) -> bool {
        self != Fault::None
    }
}

/// One run of the set-initial-bearer flow against a misbehaving device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetBearerCase {
    /// Mode `+CFUN?` reports.
    pub entry_mode: u32,
    /// `+CFUN?` answers text that is not a mode.
    pub garbled_mode: bool,
    pub mode_query: Fault,
    pub rf_off: Fault,
    pub provision: Fault,
    pub rf_on: Fault,
}

/// What the engine must do for a [`SetBearerCase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expected {
    pub commands: Vec<String>,
    /// `None` on success; otherwise the error kind and, for transport
    /// errors, the failing command.
    pub failure: Option<(ErrorKind, Option<String>)>,
}

impl SetBearerCase {
    /// Script a channel that plays this case.
    pub fn channel(&self, properties: &BearerProperties, cid: u32) -> SimChannel {
        let mode = if self.garbled_mode {
            "+CFUN: ?\r\nOK".to_string()
        } else {
            format!("+CFUN: {}\r\nOK", self.entry_mode)
        };
        SimChannel::new()
            .on("+CFUN?", self.mode_query.reply(&mode))
            .on("+CFUN=4", self.rf_off.reply("OK"))
            .on(provisioning_command(properties, cid), self.provision.reply("OK"))
            .on("+CFUN=1", self.rf_on.reply("OK"))
    }

    pub fn expected(&self, properties: &BearerProperties, cid: u32) -> Expected {
        let transport = |command: &str| Some((ErrorKind::Transport, Some(command.to_string())));

        let mut commands = vec!["+CFUN?".to_string()];
        if self.mode_query.is_fault() {
            return Expected {
                commands,
                failure: transport("+CFUN?"),
            };
        }
        if self.garbled_mode {
            return Expected {
                commands,
                failure: Some((ErrorKind::Parse, None)),
            };
        }
        if self.entry_mode != 1 && self.entry_mode != 4 {
            return Expected {
                commands,
                failure: Some((ErrorKind::DeviceState, None)),
            };
        }

        if self.entry_mode == 1 {
            commands.push("+CFUN=4".to_string());
            if self.rf_off.is_fault() {
                return Expected {
                    commands,
                    failure: transport("+CFUN=4"),
                };
            }
        }

        let provision = provisioning_command(properties, cid);
        commands.push(provision.clone());
        commands.push("+CFUN=1".to_string());

        let failure = if self.provision.is_fault() {
            transport(&provision)
        } else if self.rf_on.is_fault() {
            transport("+CFUN=1")
        } else {
            None
        };
        Expected { commands, failure }
    }
}

/// Seeded generator of [`SetBearerCase`]s.
///
/// The same seed always yields the same sequence of cases.
#[derive(Debug)]
pub struct FaultScenario {
    rng: StdRng,
    /// Chance that any single command misbehaves.
    fault_rate: f64,
}

impl FaultScenario {
    pub fn new(seed: u64) -> Self {
        Self::with_fault_rate(seed, 0.25)
    }

    pub fn with_fault_rate(seed: u64, fault_rate: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            fault_rate: fault_rate.clamp(0.0, 1.0),
        }
    }

    pub fn next_case(&mut self) -> SetBearerCase {
        const MODES: [u32; 5] = [1, 4, 1, 4, 0];
        let idx = (self.rng.random::<f64>() * MODES.len() as f64) as usize;
        let entry_mode = MODES[idx.min(MODES.len() - 1)];
        let garbled_mode = self.rng.random::<f64>() < self.fault_rate * 0.2;
        SetBearerCase {
            entry_mode,
            garbled_mode,
            mode_query: self.fault(),
            rf_off: self.fault(),
            provision: self.fault(),
            rf_on: self.fault(),
        }
    }

    pub fn cases(&mut self, n: usize) -> Vec<SetBearerCase> {
        (0..n).map(|_| self.next_case()).collect()
    }

    fn fault(&mut self) -> Fault {
        if self.rng.random::<f64>() >= self.fault_rate {
            return Fault::None;
        }
        if self.rng.random::<bool>() {
            Fault::Error
        } else {
            Fault::Timeout
        }
    }
}
