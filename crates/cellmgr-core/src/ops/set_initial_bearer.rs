//! # Set Initial EPS Bearer Settings
//!
//! ```text
//!   FIRST ─▶ CHECK_MODE ─▶ RF_OFF ─▶ SET_APN ─▶ AUTH ─▶ RF_ON ─▶ LAST
//!                                       │                 ▲
//!                                       └──── on error ───┘
//! ```
//!
//! The context definition can only be changed with the radio off, so the
//! radio is switched off (unless it already is), the context is written,
//! and the radio is switched back on. A provisioning failure is saved and
//! the sequence jumps straight to RF_ON so the radio is restored before the
//! error is reported.

use cellmgr_common::bearer::BearerProperties;
use cellmgr_common::error::ModemError;

use super::{CFUN_FULL, CFUN_RF_OFF};
use crate::parsers::{parse_cfun_query, quote_string};
use crate::sequence::{Reply, Sequence, Step, StepContext, Transition};
use crate::transport::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetInitialBearerStep {
    First,
    CheckMode,
    RfOff,
    SetApn,
    Auth,
    RfOn,
    Last,
}

impl Step for SetInitialBearerStep {
    const ORDER: &'static [Self] = &[
        SetInitialBearerStep::First,
        SetInitialBearerStep::CheckMode,
        SetInitialBearerStep::RfOff,
        SetInitialBearerStep::SetApn,
        SetInitialBearerStep::Auth,
        SetInitialBearerStep::RfOn,
        SetInitialBearerStep::Last,
    ];
    const FIRST: Self = SetInitialBearerStep::First;
    const LAST: Self = SetInitialBearerStep::Last;
}

/// Writes the initial EPS bearer APN and IP family into the device's
/// initial bearer context.
#[derive(Debug)]
pub struct SetInitialBearer {
    properties: BearerProperties,
    default_cid: u32,
    cid: Option<u32>,
    /// Mode read at CHECK_MODE.
    entry_mode: Option<u32>,
    /// Mode the radio is in now, as far as this operation knows.
    radio_mode: Option<u32>,
}

impl SetInitialBearer {
    /// `default_cid` is used only if the session has no cid cached yet.
    pub fn new(properties: BearerProperties, default_cid: u32) -> Self {
        SetInitialBearer {
            properties,
            default_cid,
            cid: None,
            entry_mode: None,
            radio_mode: None,
        }
    }

    fn provisioning_command(&self, cid: u32) -> String {
        let pdp_type = self.properties.ip_type.or_ipv4().pdp_type().unwrap_or("IP");
        format!(
            "+CGDCONT={cid},\"{pdp_type}\",{}",
            quote_string(self.properties.apn_or_empty())
        )
    }
}

impl Sequence for SetInitialBearer {
    type Step = SetInitialBearerStep;
    type Output = ();
    const NAME: &'static str = "set-initial-bearer";

    fn enter(
        &mut self,
        step: SetInitialBearerStep,
        cx: &mut StepContext<'_>,
    ) -> Transition<SetInitialBearerStep> {
        use SetInitialBearerStep::*;

        let timeouts = cx.session().timeouts();
        match step {
            First => Transition::Goto(CheckMode),
            CheckMode => Transition::Send(Command::new("+CFUN?", timeouts.short)),
            RfOff => {
                if self.radio_mode == Some(CFUN_RF_OFF) {
                    Transition::Goto(SetApn)
                } else {
                    Transition::Send(Command::new("+CFUN=4", timeouts.short))
                }
            }
            SetApn => {
                let default_cid = self.default_cid;
                let cid = cx.session().resolve_initial_bearer_cid(|| default_cid);
                self.cid = Some(cid);
                tracing::debug!(
                    cid,
                    apn = self.properties.apn_or_empty(),
                    ip_type = %self.properties.ip_type.or_ipv4(),
                    "configuring initial bearer context"
                );
                Transition::Send(Command::new(self.provisioning_command(cid), timeouts.long))
            }
            // No initial bearer authentication settings on these modems.
            Auth => Transition::Goto(RfOn),
            RfOn => {
                if self.radio_mode == Some(CFUN_FULL) {
                    Transition::Goto(Last)
                } else {
                    Transition::Send(Command::new("+CFUN=1", timeouts.short))
                }
            }
            Last => Transition::Goto(Last),
        }
    }

    fn on_reply(
        &mut self,
        step: SetInitialBearerStep,
        reply: Result<String, ModemError>,
        cx: &mut StepContext<'_>,
    ) -> Reply<SetInitialBearerStep> {
        use SetInitialBearerStep::*;

        match step {
            CheckMode => {
                let mode = match reply.and_then(|text| parse_cfun_query(&text)) {
                    Ok(mode) => mode,
                    Err(e) => {
                        tracing::warn!(error = %e, "couldn't load initial functionality mode");
                        return Reply::Abort(e);
                    }
                };
                tracing::debug!(mode, "current functionality mode");
                if mode != CFUN_FULL && mode != CFUN_RF_OFF {
                    return Reply::Abort(ModemError::DeviceState(format!(
                        "cannot setup the initial bearer settings in functionality mode {mode}: \
                         the SIM must be powered"
                    )));
                }
                self.entry_mode = Some(mode);
                self.radio_mode = Some(mode);
                Reply::Next(RfOff)
            }
            RfOff => match reply {
                Ok(_) => {
                    self.radio_mode = Some(CFUN_RF_OFF);
                    Reply::Next(SetApn)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "couldn't set RF off");
                    Reply::Abort(e)
                }
            },
            SetApn => match reply {
                Ok(_) => Reply::Next(Auth),
                Err(e) => {
                    tracing::warn!(
                        cid = ?self.cid,
                        error = %e,
                        "couldn't configure context settings"
                    );
                    cx.save_error(e);
                    Reply::Next(RfOn)
                }
            },
            RfOn => {
                match reply {
                    Ok(_) => self.radio_mode = Some(CFUN_FULL),
                    Err(e) => {
                        tracing::warn!(
                            entry_mode = ?self.entry_mode,
                            error = %e,
                            "couldn't set RF back on"
                        );
                        cx.save_error(e);
                    }
                }
                Reply::Next(Last)
            }
            First | Auth | Last => Reply::Next(step.next()),
        }
    }

    fn output(self) {}
}
