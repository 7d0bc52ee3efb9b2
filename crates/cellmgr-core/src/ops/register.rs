//! # Network Registration
//!
//! `FIRST -> SELECT -> CHECK -> LAST`. An empty operator id requests
//! automatic registration; otherwise the MCC+MNC is selected manually.
//! CHECK confirms the device actually ended up registered.

use cellmgr_common::error::ModemError;
use cellmgr_common::network::RegistrationState;

use crate::parsers::{parse_creg_query, quote_string};
use crate::sequence::{Reply, Sequence, Step, StepContext, Transition};
use crate::transport::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterStep {
    First,
    Select,
    Check,
    Last,
}

impl Step for RegisterStep {
    const ORDER: &'static [Self] = &[
        RegisterStep::First,
        RegisterStep::Select,
        RegisterStep::Check,
        RegisterStep::Last,
    ];
    const FIRST: Self = RegisterStep::First;
    const LAST: Self = RegisterStep::Last;
}

#[derive(Debug)]
pub struct Register {
    operator_id: String,
    state: Option<RegistrationState>,
}

impl Register {
    /// `operator_id` is an MCC+MNC string, or empty for automatic selection.
    pub fn new(operator_id: impl Into<String>) -> Self {
        Register {
            operator_id: operator_id.into(),
            state: None,
        }
    }

    fn select_command(&self) -> Result<String, ModemError> {
        let id = self.operator_id.trim();
        if id.is_empty() {
            return Ok("+COPS=0".to_string());
        }
        if !(5..=6).contains(&id.len()) || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ModemError::InvalidArgs(format!(
                "operator id '{id}' must be 5 or 6 digits"
            )));
        }
        Ok(format!("+COPS=1,2,{}", quote_string(id)))
    }
}

impl Sequence for Register {
    type Step = RegisterStep;
    type Output = RegistrationState;
    const NAME: &'static str = "register";

    fn enter(&mut self, step: RegisterStep, cx: &mut StepContext<'_>) -> Transition<RegisterStep> {
        let timeouts = cx.session().timeouts();
        match step {
            RegisterStep::First => Transition::Goto(RegisterStep::Select),
            RegisterStep::Select => match self.select_command() {
                Ok(text) => Transition::Send(Command::new(text, timeouts.scan)),
                Err(e) => Transition::Fail(e),
            },
            RegisterStep::Check => Transition::Send(Command::new("+CREG?", timeouts.long)),
            RegisterStep::Last => Transition::Goto(RegisterStep::Last),
        }
    }

    fn on_reply(
        &mut self,
        step: RegisterStep,
        reply: Result<String, ModemError>,
        _cx: &mut StepContext<'_>,
    ) -> Reply<RegisterStep> {
        match step {
            RegisterStep::Select => match reply {
                Ok(_) => Reply::Next(RegisterStep::Check),
                Err(e) => {
                    tracing::warn!(
                        operator = %self.operator_id,
                        error = %e,
                        "couldn't select operator"
                    );
                    Reply::Abort(e)
                }
            },
            RegisterStep::Check => {
                let state = match reply.and_then(|text| parse_creg_query(&text)) {
                    Ok(state) => state,
                    Err(e) => return Reply::Abort(e),
                };
                tracing::debug!(?state, "registration state");
                if !state.is_registered() {
                    return Reply::Abort(ModemError::DeviceState(format!(
                        "not registered after operator selection ({state:?})"
                    )));
                }
                self.state = Some(state);
                Reply::Next(RegisterStep::Last)
            }
            RegisterStep::First | RegisterStep::Last => Reply::Next(step.next()),
        }
    }

    /// The confirmed registration state (home or roaming).
    fn output(self) -> RegistrationState {
        self.state.unwrap_or(RegistrationState::Home)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use cellmgr_common::error::{ErrorKind, TransportError};

    use super::*;
    use crate::sequence::run;
    use crate::testing::{FakeChannel, session};

    #[tokio::test]
    async fn empty_operator_registers_automatically() {
        let chan = Arc::new(
            FakeChannel::new()
                .reply("+COPS=0", "")
                .reply("+CREG?", "+CREG: 0,1\r\nOK"),
        );
        let state = run(Register::new(""), &session(&chan), None).await.unwrap();
        assert_eq!(state, RegistrationState::Home);
        assert_eq!(
            chan.timeouts(),
            vec![Duration::from_secs(120), Duration::from_secs(20)]
        );
    }

    #[tokio::test]
    async fn manual_selection_roaming_is_registered() {
        let chan = Arc::new(
            FakeChannel::new()
                .reply("+COPS=1,2,\"21401\"", "")
                .reply("+CREG?", "+CREG: 0,5"),
        );
        let state = run(Register::new("21401"), &session(&chan), None)
            .await
            .unwrap();
        assert_eq!(state, RegistrationState::Roaming);
    }

    #[tokio::test]
    async fn invalid_operator_sends_nothing() {
        for id in ["2140", "2140123", "214O1"] {
            let chan = Arc::new(FakeChannel::new());
            let err = run(Register::new(id), &session(&chan), None).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgs, "{id}");
            assert!(chan.sent().is_empty());
        }
    }

    #[tokio::test]
    async fn not_registered_is_device_state_error() {
        let chan = Arc::new(
            FakeChannel::new()
                .reply("+COPS=0", "")
                .reply("+CREG?", "+CREG: 0,3"),
        );
        let err = run(Register::new(""), &session(&chan), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceState);
    }

    #[tokio::test]
    async fn selection_failure_skips_check() {
        let chan = Arc::new(FakeChannel::new().fail(
            "+COPS=1,2,\"21403\"",
            TransportError::Device("+CME ERROR: 30".into()),
        ));
        let err = run(Register::new("21403"), &session(&chan), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(chan.sent().len(), 1);
    }
}
