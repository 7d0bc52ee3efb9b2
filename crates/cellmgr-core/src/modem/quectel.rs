//! Quectel modems accept a new initial EPS bearer definition through
//! `+CGDCONT` on the initial context, with the radio off.

use futures::FutureExt as _;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use cellmgr_common::bearer::BearerProperties;
use cellmgr_common::error::ModemError;

use super::Modem3gpp;
use crate::device::DeviceSession;
use crate::ops::SetInitialBearer;
use crate::sequence::run;

#[derive(Debug, Clone, Copy, Default)]
pub struct QuectelModem;

impl Modem3gpp for QuectelModem {
    fn name(&self) -> &'static str {
        "quectel"
    }

    fn set_initial_bearer_settings<'a>(
        &'a self,
        session: &'a DeviceSession,
        properties: BearerProperties,
        cancel: Option<&'a CancellationToken>,
    ) -> BoxFuture<'a, Result<(), ModemError>> {
        let sequence = SetInitialBearer::new(properties, self.default_initial_bearer_cid());
        run(sequence, session, cancel).boxed()
    }
}
