//! Read back the initial EPS bearer settings.
//!
//! Used for both the runtime bearer and the configured settings: the
//! device only exposes the context definition. Nothing here is fatal; a
//! device that cannot answer yields default (empty) properties.

use cellmgr_common::bearer::BearerProperties;
use cellmgr_common::error::ModemError;

use crate::parsers::parse_cgdcont_query;
use crate::sequence::{Reply, Sequence, Step, StepContext, Transition};
use crate::transport::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadInitialBearerStep {
    First,
    Profile,
    Apn,
    Auth,
    Last,
}

impl Step for LoadInitialBearerStep {
    const ORDER: &'static [Self] = &[
        LoadInitialBearerStep::First,
        LoadInitialBearerStep::Profile,
        LoadInitialBearerStep::Apn,
        LoadInitialBearerStep::Auth,
        LoadInitialBearerStep::Last,
    ];
    const FIRST: Self = LoadInitialBearerStep::First;
    const LAST: Self = LoadInitialBearerStep::Last;
}

#[derive(Debug)]
pub struct LoadInitialBearer {
    default_cid: u32,
    cid: Option<u32>,
    properties: BearerProperties,
}

impl LoadInitialBearer {
    pub fn new(default_cid: u32) -> Self {
        LoadInitialBearer {
            default_cid,
            cid: None,
            properties: BearerProperties::default(),
        }
    }
}

impl Sequence for LoadInitialBearer {
    type Step = LoadInitialBearerStep;
    type Output = BearerProperties;
    const NAME: &'static str = "load-initial-bearer";

    fn enter(
        &mut self,
        step: LoadInitialBearerStep,
        cx: &mut StepContext<'_>,
    ) -> Transition<LoadInitialBearerStep> {
        use LoadInitialBearerStep::*;

        match step {
            First => Transition::Goto(Profile),
            Profile => {
                let default_cid = self.default_cid;
                self.cid = Some(cx.session().resolve_initial_bearer_cid(|| default_cid));
                Transition::Goto(Apn)
            }
            Apn => Transition::Send(Command::new("+CGDCONT?", cx.session().timeouts().long)),
            Auth => Transition::Goto(Last),
            Last => Transition::Goto(Last),
        }
    }

    fn on_reply(
        &mut self,
        step: LoadInitialBearerStep,
        reply: Result<String, ModemError>,
        _cx: &mut StepContext<'_>,
    ) -> Reply<LoadInitialBearerStep> {
        if step != LoadInitialBearerStep::Apn {
            return Reply::Next(step.next());
        }

        let contexts = match reply.and_then(|text| parse_cgdcont_query(&text)) {
            Ok(contexts) => contexts,
            Err(e) => {
                tracing::warn!(error = %e, "couldn't load context definitions");
                return Reply::Next(LoadInitialBearerStep::Auth);
            }
        };

        match contexts.into_iter().find(|c| Some(c.cid) == self.cid) {
            Some(context) => {
                self.properties = BearerProperties {
                    apn: Some(context.apn.unwrap_or_default()),
                    ip_type: context.ip_family,
                };
                tracing::debug!(
                    cid = context.cid,
                    apn = self.properties.apn_or_empty(),
                    "found initial bearer context"
                );
            }
            None => tracing::debug!(cid = ?self.cid, "initial bearer context not defined"),
        }
        Reply::Next(LoadInitialBearerStep::Auth)
    }

    fn output(self) -> BearerProperties {
        self.properties
    }
}
