//! Network scan: one `+COPS=?` with the scan timeout.

use cellmgr_common::error::ModemError;
use cellmgr_common::network::NetworkInfo;

use crate::parsers::parse_cops_test;
use crate::sequence::{Reply, Sequence, Step, StepContext, Transition};
use crate::transport::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStep {
    First,
    Scan,
    Last,
}

impl Step for ScanStep {
    const ORDER: &'static [Self] = &[ScanStep::First, ScanStep::Scan, ScanStep::Last];
    const FIRST: Self = ScanStep::First;
    const LAST: Self = ScanStep::Last;
}

#[derive(Debug, Default)]
pub struct ScanNetworks {
    networks: Vec<NetworkInfo>,
}

impl ScanNetworks {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sequence for ScanNetworks {
    type Step = ScanStep;
    type Output = Vec<NetworkInfo>;
    const NAME: &'static str = "scan-networks";

    fn enter(&mut self, step: ScanStep, cx: &mut StepContext<'_>) -> Transition<ScanStep> {
        match step {
            ScanStep::First => Transition::Goto(ScanStep::Scan),
            ScanStep::Scan => {
                Transition::Send(Command::new("+COPS=?", cx.session().timeouts().scan))
            }
            ScanStep::Last => Transition::Goto(ScanStep::Last),
        }
    }

    fn on_reply(
        &mut self,
        step: ScanStep,
        reply: Result<String, ModemError>,
        _cx: &mut StepContext<'_>,
    ) -> Reply<ScanStep> {
        if step != ScanStep::Scan {
            return Reply::Next(step.next());
        }
        match reply.and_then(|text| parse_cops_test(&text)) {
            Ok(networks) => {
                tracing::debug!(found = networks.len(), "network scan finished");
                self.networks = networks;
                Reply::Next(ScanStep::Last)
            }
            Err(e) => {
                tracing::warn!(error = %e, "network scan failed");
                Reply::Abort(e)
            }
        }
    }

    fn output(self) -> Vec<NetworkInfo> {
        self.networks
    }
}
