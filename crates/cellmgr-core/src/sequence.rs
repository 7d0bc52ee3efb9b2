//! # Sequence Controller
//!
//! Drives one operation through its ordered steps:
//!
//! ```text
//!   FIRST ──▶ enter(step) ──Send──▶ await reply ──on_reply──▶ Next(step') ──▶ … ──▶ LAST
//!                │                                   │
//!              Goto (skip / no-op / jump)          Abort ──▶ deliver error
//! ```
//!
//! Each call to [`OperationContext::advance`] either hands back exactly one
//! command to dispatch or reaches `LAST` and produces the final result.
//! The context is moved through every continuation and consumed on the
//! terminal path, so the result is produced once and any saved error is
//! delivered rather than dropped.

use std::fmt::Debug;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use cellmgr_common::error::{ModemError, TransportError};
use cellmgr_common::ids;

use crate::completion::CompletionSink;
use crate::device::DeviceSession;
use crate::transport::{Command, dispatch};

// ─── Steps ──────────────────────────────────────────────────────────────────

/// Fixed, ordered step enumeration of one operation.
pub trait Step: Copy + Eq + Debug + Send + Sync + 'static {
    /// Every step, in execution order. Starts with `FIRST`, ends with `LAST`.
    const ORDER: &'static [Self];
    const FIRST: Self;
    const LAST: Self;

    /// The step after `self` in `ORDER`; `LAST` is its own successor.
    fn next(self) -> Self {
        Self::ORDER
            .iter()
            .position(|s| *s == self)
            .and_then(|i| Self::ORDER.get(i + 1))
            .copied()
            .unwrap_or(Self::LAST)
    }
}

/// What a step wants to do when entered.
#[derive(Debug)]
pub enum Transition<S> {
    /// Dispatch one command; its reply is routed to `on_reply` for this step.
    Send(Command),
    /// Move to another step without touching the device.
    Goto(S),
    /// Terminate the operation with this error.
    Fail(ModemError),
}

/// Decision taken from a command reply.
#[derive(Debug)]
pub enum Reply<S> {
    Next(S),
    Abort(ModemError),
}

// ─── Step Context ───────────────────────────────────────────────────────────

/// What a step may touch besides its own working values.
pub struct StepContext<'a> {
    session: &'a DeviceSession,
    saved_error: &'a mut Option<ModemError>,
}

impl StepContext<'_> {
    pub fn session(&self) -> &DeviceSession {
        self.session
    }

    /// Keep `err` for delivery at `LAST` unless an earlier error is already
    /// held. Returns whether `err` was kept.
    pub fn save_error(&mut self, err: ModemError) -> bool {
        if self.saved_error.is_some() {
            tracing::debug!(error = %err, "an earlier error is already saved; ignoring");
            return false;
        }
        *self.saved_error = Some(err);
        true
    }

    pub fn has_saved_error(&self) -> bool {
        self.saved_error.is_some()
    }
}

// ─── Sequence ───────────────────────────────────────────────────────────────

/// One multi-step operation: input parameters and working values live in
/// the implementing type.
pub trait Sequence: Send {
    type Step: Step;
    type Output: Send;

    /// Name used in logs.
    const NAME: &'static str;

    /// Called for every step except `LAST`.
    fn enter(&mut self, step: Self::Step, cx: &mut StepContext<'_>) -> Transition<Self::Step>;

    /// Called with the reply to the command `step` sent. Transport failures
    /// arrive already wrapped with the command text.
    fn on_reply(
        &mut self,
        step: Self::Step,
        reply: Result<String, ModemError>,
        cx: &mut StepContext<'_>,
    ) -> Reply<Self::Step>;

    /// Result delivered at `LAST` when no error is saved.
    fn output(self) -> Self::Output;
}

// ─── Operation Context ──────────────────────────────────────────────────────

/// Counters for one finished operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Calls into the controller (`advance`).
    pub advances: usize,
    /// Commands dispatched.
    pub commands: usize,
}

/// Terminal outcome of an operation.
#[derive(Debug)]
pub struct Finished<T> {
    pub result: Result<T, ModemError>,
    pub stats: RunStats,
}

/// Result of one controller call.
pub enum Advance<S: Sequence> {
    /// The context is parked until the reply to `Command` arrives.
    Dispatch(OperationContext<S>, Command),
    Done(Finished<S::Output>),
}

/// Per-invocation state of one operation.
pub struct OperationContext<S: Sequence> {
    id: String,
    step: S::Step,
    sequence: S,
    saved_error: Option<ModemError>,
    stats: RunStats,
}

impl<S: Sequence> OperationContext<S> {
    pub fn new(sequence: S) -> Self {
        OperationContext {
            id: ids::operation_id(),
            step: S::Step::FIRST,
            sequence,
            saved_error: None,
            stats: RunStats::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn step(&self) -> S::Step {
        self.step
    }

    /// Run steps from the current one until a command must be sent or the
    /// operation terminates.
    pub fn advance(mut self, session: &DeviceSession) -> Advance<S> {
        self.stats.advances += 1;
        let budget = S::Step::ORDER.len();
        if self.stats.advances > budget {
            let err = ModemError::Aborted(format!(
                "{} exceeded {budget} controller calls",
                S::NAME
            ));
            return Advance::Done(self.abort(err));
        }

        let mut hops = 0;
        loop {
            if self.step == S::Step::LAST {
                return Advance::Done(self.finish());
            }
            hops += 1;
            if hops > budget {
                let err = ModemError::Aborted(format!("{} is stuck at {:?}", S::NAME, self.step));
                return Advance::Done(self.abort(err));
            }

            let mut cx = StepContext {
                session,
                saved_error: &mut self.saved_error,
            };
            match self.sequence.enter(self.step, &mut cx) {
                Transition::Send(command) => {
                    self.stats.commands += 1;
                    return Advance::Dispatch(self, command);
                }
                Transition::Goto(next) => {
                    tracing::trace!(from = ?self.step, to = ?next, "skipping");
                    self.step = next;
                }
                Transition::Fail(err) => return Advance::Done(self.abort(err)),
            }
        }
    }

    /// Feed the reply to the command the current step sent, then continue.
    pub fn resume(
        mut self,
        command: &Command,
        reply: Result<String, TransportError>,
        session: &DeviceSession,
    ) -> Advance<S> {
        let reply = reply.map_err(|e| ModemError::transport(&command.text, e));
        let mut cx = StepContext {
            session,
            saved_error: &mut self.saved_error,
        };
        match self.sequence.on_reply(self.step, reply, &mut cx) {
            Reply::Next(next) => {
                self.step = next;
                self.advance(session)
            }
            Reply::Abort(err) => Advance::Done(self.abort(err)),
        }
    }

    /// Terminate with `err`, unless an earlier saved error takes priority.
    fn abort(mut self, err: ModemError) -> Finished<S::Output> {
        let err = match self.saved_error.take() {
            Some(saved) => {
                tracing::debug!(later = %err, "delivering earlier saved error");
                saved
            }
            None => err,
        };
        Finished {
            result: Err(err),
            stats: self.stats,
        }
    }

    fn finish(self) -> Finished<S::Output> {
        let result = match self.saved_error {
            Some(err) => Err(err),
            None => Ok(self.sequence.output()),
        };
        Finished {
            result,
            stats: self.stats,
        }
    }
}

// ─── Driver ─────────────────────────────────────────────────────────────────

/// Run `sequence` against `session` to completion.
pub async fn run<S: Sequence>(
    sequence: S,
    session: &DeviceSession,
    cancel: Option<&CancellationToken>,
) -> Result<S::Output, ModemError> {
    run_with_stats(sequence, session, cancel).await.result
}

/// Run `sequence` and deliver its result to `sink`.
pub async fn run_to_sink<S: Sequence>(
    sequence: S,
    session: &DeviceSession,
    cancel: Option<&CancellationToken>,
    sink: CompletionSink<S::Output>,
) {
    sink.complete(run(sequence, session, cancel).await);
}

/// Like [`run`], also returning the controller counters.
pub async fn run_with_stats<S: Sequence>(
    sequence: S,
    session: &DeviceSession,
    cancel: Option<&CancellationToken>,
) -> Finished<S::Output> {
    if !session.is_attached() {
        return Finished {
            result: Err(ModemError::NotReady(format!(
                "device {} is detached",
                session.id()
            ))),
            stats: RunStats::default(),
        };
    }

    let op = OperationContext::new(sequence);
    let span = tracing::debug_span!("op", id = %op.id(), name = S::NAME, device = %session.id());
    drive(op, session, cancel).instrument(span).await
}

async fn drive<S: Sequence>(
    op: OperationContext<S>,
    session: &DeviceSession,
    cancel: Option<&CancellationToken>,
) -> Finished<S::Output> {
    let mut next = op.advance(session);
    loop {
        match next {
            Advance::Done(finished) => {
                match &finished.result {
                    Ok(_) => tracing::debug!(
                        advances = finished.stats.advances,
                        commands = finished.stats.commands,
                        "operation succeeded"
                    ),
                    Err(e) => tracing::debug!(
                        advances = finished.stats.advances,
                        commands = finished.stats.commands,
                        error = %e,
                        "operation failed"
                    ),
                }
                return finished;
            }
            Advance::Dispatch(op, command) => {
                tracing::debug!(step = ?op.step(), command = %command, "dispatching");
                let reply = dispatch(session.channel(), &command, cancel).await;
                next = op.resume(&command, reply, session);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use cellmgr_common::error::ErrorKind;

    use super::*;
    use crate::completion::completion;
    use crate::testing::{FakeChannel, session};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum ToyStep {
        First,
        Work,
        Extra,
        Cleanup,
        Last,
    }

    impl Step for ToyStep {
        const ORDER: &'static [Self] = &[
            ToyStep::First,
            ToyStep::Work,
            ToyStep::Extra,
            ToyStep::Cleanup,
            ToyStep::Last,
        ];
        const FIRST: Self = ToyStep::First;
        const LAST: Self = ToyStep::Last;
    }

    /// WORK failure is saved and jumps to CLEANUP; CLEANUP failure is
    /// fatal when `fatal_cleanup` is set, otherwise saved.
    #[derive(Default)]
    struct Toy {
        skip_extra: bool,
        fatal_cleanup: bool,
        replies: Vec<String>,
    }

    impl Sequence for Toy {
        type Step = ToyStep;
        type Output = Vec<String>;
        const NAME: &'static str = "toy";

        fn enter(&mut self, step: ToyStep, _cx: &mut StepContext<'_>) -> Transition<ToyStep> {
            let short = Duration::from_secs(5);
            match step {
                ToyStep::First => Transition::Goto(step.next()),
                ToyStep::Work => Transition::Send(Command::new("WORK", short)),
                ToyStep::Extra if self.skip_extra => Transition::Goto(step.next()),
                ToyStep::Extra => Transition::Send(Command::new("EXTRA", short)),
                ToyStep::Cleanup => Transition::Send(Command::new("CLEANUP", short)),
                ToyStep::Last => Transition::Goto(ToyStep::Last),
            }
        }

        fn on_reply(
            &mut self,
            step: ToyStep,
            reply: Result<String, ModemError>,
            cx: &mut StepContext<'_>,
        ) -> Reply<ToyStep> {
            match (step, reply) {
                (ToyStep::Work, Err(e)) => {
                    cx.save_error(e);
                    Reply::Next(ToyStep::Cleanup)
                }
                (ToyStep::Cleanup, Err(e)) if self.fatal_cleanup => Reply::Abort(e),
                (_, Err(e)) => {
                    cx.save_error(e);
                    Reply::Next(step.next())
                }
                (_, Ok(text)) => {
                    self.replies.push(text);
                    Reply::Next(step.next())
                }
            }
        }

        fn output(self) -> Vec<String> {
            self.replies
        }
    }

    // ─── Step Enumeration ───────────────────────────────────────────────

    #[test]
    fn next_walks_order_and_saturates() {
        assert_eq!(ToyStep::First.next(), ToyStep::Work);
        assert_eq!(ToyStep::Cleanup.next(), ToyStep::Last);
        assert_eq!(ToyStep::Last.next(), ToyStep::Last);
    }

    // ─── Linear Path ────────────────────────────────────────────────────

    #[tokio::test]
    async fn linear_run_collects_replies() {
        let chan = Arc::new(
            FakeChannel::new()
                .reply("WORK", "a")
                .reply("EXTRA", "b")
                .reply("CLEANUP", "c"),
        );
        let finished = run_with_stats(Toy::default(), &session(&chan), None).await;
        assert_eq!(finished.result.unwrap(), vec!["a", "b", "c"]);
        assert_eq!(finished.stats.commands, 3);
        assert!(finished.stats.advances <= ToyStep::ORDER.len());
    }

    #[tokio::test]
    async fn goto_skips_without_dispatch() {
        let chan = Arc::new(FakeChannel::new().reply("WORK", "a").reply("CLEANUP", "c"));
        let toy = Toy {
            skip_extra: true,
            ..Default::default()
        };
        let result = run(toy, &session(&chan), None).await.unwrap();
        assert_eq!(result, vec!["a", "c"]);
        assert_eq!(chan.sent(), vec!["WORK", "CLEANUP"]);
    }

    // ─── Saved Errors ───────────────────────────────────────────────────

    #[tokio::test]
    async fn saved_error_still_runs_cleanup() {
        let chan = Arc::new(
            FakeChannel::new()
                .fail("WORK", TransportError::Device("ERROR".into()))
                .reply("CLEANUP", "c"),
        );
        let err = run(Toy::default(), &session(&chan), None).await.unwrap_err();
        assert_eq!(err.command(), Some("WORK"));
        assert_eq!(chan.sent(), vec!["WORK", "CLEANUP"]);
    }

    #[tokio::test]
    async fn earlier_saved_error_wins_over_later_one() {
        let chan = Arc::new(
            FakeChannel::new()
                .fail("WORK", TransportError::Device("first".into()))
                .fail("CLEANUP", TransportError::Device("second".into())),
        );
        let err = run(Toy::default(), &session(&chan), None).await.unwrap_err();
        assert_eq!(err.command(), Some("WORK"));
    }

    #[tokio::test]
    async fn abort_after_saved_error_delivers_saved_error() {
        let chan = Arc::new(
            FakeChannel::new()
                .fail("WORK", TransportError::Device("first".into()))
                .fail("CLEANUP", TransportError::Timeout(Duration::from_secs(5))),
        );
        let toy = Toy {
            fatal_cleanup: true,
            ..Default::default()
        };
        let err = run(toy, &session(&chan), None).await.unwrap_err();
        assert_eq!(err.command(), Some("WORK"));
    }

    // ─── Termination Guards ─────────────────────────────────────────────

    struct Looping;

    impl Sequence for Looping {
        type Step = ToyStep;
        type Output = ();
        const NAME: &'static str = "looping";

        fn enter(&mut self, _step: ToyStep, _cx: &mut StepContext<'_>) -> Transition<ToyStep> {
            Transition::Goto(ToyStep::Work)
        }

        fn on_reply(
            &mut self,
            _step: ToyStep,
            _reply: Result<String, ModemError>,
            _cx: &mut StepContext<'_>,
        ) -> Reply<ToyStep> {
            Reply::Next(ToyStep::Work)
        }

        fn output(self) {}
    }

    #[tokio::test]
    async fn non_terminating_sequence_is_aborted() {
        let chan = Arc::new(FakeChannel::new());
        let err = run(Looping, &session(&chan), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Aborted);
        assert!(chan.sent().is_empty());
    }

    #[tokio::test]
    async fn detached_session_is_not_ready() {
        let chan = Arc::new(FakeChannel::new());
        let session = session(&chan);
        session.detach();
        let err = run(Toy::default(), &session, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotReady);
        assert!(chan.sent().is_empty());
    }

    // ─── Completion Sink ────────────────────────────────────────────────

    #[tokio::test]
    async fn run_to_sink_delivers_once() {
        let chan = Arc::new(
            FakeChannel::new()
                .reply("WORK", "a")
                .reply("EXTRA", "b")
                .reply("CLEANUP", "c"),
        );
        let (sink, handle) = completion();
        run_to_sink(Toy::default(), &session(&chan), None, sink).await;
        assert_eq!(handle.await.unwrap().len(), 3);
    }
}
