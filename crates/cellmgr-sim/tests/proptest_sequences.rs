//! Property-based tests for the operation engine.
//!
//! The set-initial-bearer flow is run against arbitrary fault cases and
//! compared with the command trace and outcome each case predicts.

use std::sync::Arc;

use proptest::prelude::*;

use cellmgr_common::bearer::{BearerProperties, IpFamily};
use cellmgr_core::device::DeviceSession;
use cellmgr_core::ops::{LoadInitialBearer, SetInitialBearer, SetInitialBearerStep};
use cellmgr_core::sequence::{Step, run, run_with_stats};
use cellmgr_sim::channel::{SimChannel, SimReply};
use cellmgr_sim::scenario::{Fault, FaultScenario, SetBearerCase};

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(fut)
}

fn fault() -> impl Strategy<Value = Fault> {
    prop_oneof![
        4 => Just(Fault::None),
        1 => Just(Fault::Error),
        1 => Just(Fault::Timeout),
    ]
}

fn ip_family() -> impl Strategy<Value = IpFamily> {
    prop::sample::select(vec![
        IpFamily::None,
        IpFamily::Ipv4,
        IpFamily::Ipv6,
        IpFamily::Ipv4v6,
        IpFamily::Any,
    ])
}

fn case() -> impl Strategy<Value = SetBearerCase> {
    (
        prop::sample::select(vec![0u32, 1, 2, 4, 5]),
        prop::bool::weighted(0.1),
        fault(),
        fault(),
        fault(),
        fault(),
    )
        .prop_map(|(entry_mode, garbled_mode, mode_query, rf_off, provision, rf_on)| {
            SetBearerCase {
                entry_mode,
                garbled_mode,
                mode_query,
                rf_off,
                provision,
                rf_on,
            }
        })
}

fn check_case(
    case: &SetBearerCase,
    props: &BearerProperties,
    cid: u32,
) -> Result<(), TestCaseError> {
    let chan = Arc::new(case.channel(props, cid));
    let session = DeviceSession::new(chan.clone());
    let finished = block_on(run_with_stats(
        SetInitialBearer::new(props.clone(), cid),
        &session,
        None,
    ));
    let expected = case.expected(props, cid);

    prop_assert_eq!(chan.commands(), expected.commands);
    prop_assert!(finished.stats.advances <= SetInitialBearerStep::ORDER.len());
    match (finished.result, expected.failure) {
        (Ok(()), None) => {}
        (Err(e), Some((kind, command))) => {
            prop_assert_eq!(e.kind(), kind);
            prop_assert_eq!(e.command().map(str::to_string), command);
        }
        (result, failure) => {
            return Err(TestCaseError::fail(format!(
                "got {result:?}, expected failure {failure:?}"
            )));
        }
    }
    Ok(())
}

// ─── Set Initial Bearer ─────────────────────────────────────────────────────

proptest! {
    /// Trace and outcome match the case, whatever fails.
    #[test]
    fn set_initial_bearer_follows_failure_policy(
        case in case(),
        apn in "[a-z0-9.\"\\\\]{0,12}",
        ip_type in ip_family(),
        cid in 1u32..=8,
    ) {
        let props = BearerProperties { apn: Some(apn), ip_type };
        check_case(&case, &props, cid)?;
    }

    /// Once the radio has been switched off, it is always switched back on.
    #[test]
    fn radio_restored_after_rf_off(case in case()) {
        let props = BearerProperties::new("internet", IpFamily::Ipv4);
        let chan = Arc::new(case.channel(&props, 1));
        let session = DeviceSession::new(chan.clone());
        let _ = block_on(run(SetInitialBearer::new(props, 1), &session, None));

        let commands = chan.commands();
        let rf_off = commands.iter().position(|c| c == "+CFUN=4");
        let rf_off_ok = rf_off.is_some() && case.rf_off == Fault::None;
        if rf_off_ok {
            prop_assert_eq!(commands.last().map(String::as_str), Some("+CFUN=1"));
        }
        prop_assert!(commands.len() <= 4);
    }

    /// Seeded scenarios are replayable and hold the same policy.
    #[test]
    fn seeded_scenarios_follow_failure_policy(seed in any::<u64>()) {
        let props = BearerProperties::new("internet", IpFamily::Ipv4v6);
        for case in FaultScenario::with_fault_rate(seed, 0.4).cases(4) {
            check_case(&case, &props, 1)?;
        }
    }
}

// ─── Load Initial Bearer ────────────────────────────────────────────────────

proptest! {
    /// The record whose cid equals the resolved cid is returned; otherwise
    /// defaults.
    #[test]
    fn load_picks_matching_context(
        cids in prop::collection::btree_set(1u32..=10, 0..5),
        target in 1u32..=10,
    ) {
        let listing: String = cids
            .iter()
            .map(|cid| format!("+CGDCONT: {cid},\"IP\",\"apn{cid}\"\r\n"))
            .collect::<String>()
            + "OK";
        let chan = Arc::new(SimChannel::new().on("+CGDCONT?", SimReply::Ok(listing)));
        let session = DeviceSession::new(chan.clone());
        let props = block_on(run(LoadInitialBearer::new(target), &session, None)).unwrap();

        if cids.contains(&target) {
            prop_assert_eq!(props, BearerProperties::new(format!("apn{target}"), IpFamily::Ipv4));
        } else {
            prop_assert_eq!(props, BearerProperties::default());
        }
        prop_assert_eq!(session.initial_bearer_cid().unwrap(), target);
    }
}
