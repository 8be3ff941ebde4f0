//! The `CallSequence` facade: construction, the build-phase `declare`,
//! the per-invocation entry point, and the verification surface.
//!
//! One `CallSequence` owns one script, one ledger, and one cursor behind a
//! single mutex. `on_invocation` runs to completion under the lock, so
//! ordering correctness rests on one totally-ordered ledger even when
//! tracked collaborators are invoked from several threads. The script seals
//! itself at the first observed invocation; declaring afterwards is a usage
//! error.

use crate::cursor::Cursor;
use crate::ledger::{InvocationLedger, StepId};
use crate::report::SequenceReport;
use crate::result::{FingirError, FingirResult};
use crate::script::Script;
use crate::setup::{SequenceGate, SetupMechanism};
use crate::shape::{CallShape, Collaborator, CollaboratorId};
use crate::times::Times;
use crate::verifier;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Policy knobs for one sequence engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceConfig {
    /// Fail immediately on invocations whose shape was never declared
    pub strict: bool,
    /// Restart the script from the top once every group's minimum is met
    pub cyclical: bool,
    /// Group a back-to-back duplicate declaration as a further alternation
    /// instead of rejecting it
    pub allow_consecutive_duplicate_shapes: bool,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self::loose()
    }
}

impl SequenceConfig {
    /// Strict policy: undeclared shapes fail, duplicate consecutive setups
    /// are rejected
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict: true,
            cyclical: false,
            allow_consecutive_duplicate_shapes: false,
        }
    }

    /// Loose policy: undeclared shapes are ledgered silently and dispatch
    /// proceeds unaffected
    #[must_use]
    pub fn loose() -> Self {
        Self {
            strict: false,
            cyclical: false,
            allow_consecutive_duplicate_shapes: true,
        }
    }

    /// Enable or disable cyclic repetition of the whole script
    #[must_use]
    pub fn with_cyclical(mut self, cyclical: bool) -> Self {
        self.cyclical = cyclical;
        self
    }
}

/// Shared mutable unit scoped to one engine instance
pub(crate) struct EngineState {
    pub(crate) script: Script,
    pub(crate) ledger: InvocationLedger,
    pub(crate) cursor: Cursor,
    pub(crate) strict: bool,
    pub(crate) sealed: bool,
    pub(crate) last_admitted: Option<StepId>,
    collaborators: HashMap<CollaboratorId, String>,
}

/// Opaque handle to one declared step, used for targeted verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepHandle {
    pub(crate) index: StepId,
    shape: CallShape,
}

impl StepHandle {
    /// The call shape this step expects
    #[must_use]
    pub fn shape(&self) -> &CallShape {
        &self.shape
    }

    /// Global declaration index of the step
    #[must_use]
    pub fn declaration_index(&self) -> usize {
        self.index
    }
}

/// Outcome of one processed invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// A step claimed the invocation; its configured response applies
    Admitted(StepHandle),
    /// The shape has no sequence setup; under the loose policy the
    /// invocation stays in the ledger unclaimed and dispatch proceeds
    /// unaffected by the sequence engine
    Unmatched,
}

/// Cross-collaborator invocation-sequence verification engine
///
/// # Example
///
/// ```
/// use jugar_fingir::{CallSequence, Collaborator, RecordingSetup, SequenceConfig, Times};
///
/// let alpha = Collaborator::new("alpha");
/// let beta = Collaborator::new("beta");
/// let sequence = CallSequence::new(
///     SequenceConfig::loose(),
///     &[alpha.clone(), beta.clone()],
/// ).unwrap();
///
/// let mut setup = RecordingSetup::new();
/// let first = sequence
///     .declare(&mut setup, Times::once(), |s| s.configure(alpha.call("Do", "1")))
///     .unwrap();
/// sequence
///     .declare(&mut setup, Times::once(), |s| s.configure(beta.call("Do", "1")))
///     .unwrap();
///
/// assert!(setup.dispatch(&sequence, &alpha.call("Do", "1")).unwrap());
/// assert!(setup.dispatch(&sequence, &beta.call("Do", "1")).unwrap());
/// sequence.verify().unwrap();
/// sequence.verify_step(&first).unwrap();
/// ```
#[derive(Clone)]
pub struct CallSequence {
    state: Arc<Mutex<EngineState>>,
}

impl CallSequence {
    /// Create an engine bound to a fixed, non-empty set of collaborators
    pub fn new(config: SequenceConfig, collaborators: &[Collaborator]) -> FingirResult<Self> {
        if collaborators.is_empty() {
            return Err(FingirError::usage(
                "a sequence requires at least one collaborator",
            ));
        }
        let collaborators = collaborators
            .iter()
            .map(|c| (c.id(), c.name().to_string()))
            .collect();
        Ok(Self {
            state: Arc::new(Mutex::new(EngineState {
                script: Script::new(config.cyclical, config.allow_consecutive_duplicate_shapes),
                ledger: InvocationLedger::new(),
                cursor: Cursor::new(),
                strict: config.strict,
                sealed: false,
                last_admitted: None,
                collaborators,
            })),
        })
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().expect("sequence engine mutex poisoned")
    }

    /// Declare the next expected call
    ///
    /// Runs `configure` against the external setup mechanism, diffs the
    /// configured-shape set before and after, and registers the single new
    /// shape as a step with the given bounds. A gate is installed next to
    /// the configuration so the dispatch path honors the configured
    /// response only when this step was the one just admitted.
    ///
    /// Fails with a usage error when `configure` registers zero or more
    /// than one configuration, when the new shape's collaborator is not
    /// tracked by this engine, or when the script is already sealed.
    pub fn declare<S, F>(&self, setup: &mut S, bounds: Times, configure: F) -> FingirResult<StepHandle>
    where
        S: SetupMechanism + ?Sized,
        F: FnOnce(&mut S),
    {
        let before = setup.configured_shapes().len();
        configure(setup);
        let after = setup.configured_shapes();
        let added = after.len().saturating_sub(before);
        if added != 1 {
            return Err(FingirError::usage(format!(
                "a sequence declaration must configure exactly one call, but configured {added}"
            )));
        }
        let shape = after.into_iter().next_back().expect("one configuration was just added");

        let index = {
            let mut state = self.lock();
            if state.sealed {
                return Err(FingirError::usage(
                    "sequence declarations are not allowed after the first invocation",
                ));
            }
            if !state.collaborators.contains_key(&shape.collaborator()) {
                return Err(FingirError::usage(format!(
                    "collaborator is not tracked by this sequence: {shape}"
                )));
            }
            state.script.declare(shape.clone(), bounds)?
        };

        setup.install_gate(&shape, SequenceGate::new(index, Arc::clone(&self.state)));
        debug!(%shape, %bounds, step = index, "sequence step declared");
        Ok(StepHandle { index, shape })
    }

    /// Process one real invocation on a tracked collaborator
    ///
    /// Must be called synchronously by the dispatch path before any
    /// configured response runs. Sequencing violations and, under the
    /// strict policy, undeclared shapes are returned as errors at the
    /// point of the offending invocation, not deferred to verification.
    pub fn on_invocation(&self, shape: &CallShape) -> FingirResult<Verdict> {
        let mut state = self.lock();
        state.sealed = true;
        state.last_admitted = None;

        let state = &mut *state;
        let outcome =
            state
                .cursor
                .on_invocation(&mut state.script, &mut state.ledger, shape, state.strict)?;
        match outcome {
            Some(step) => {
                state.last_admitted = Some(step);
                Ok(Verdict::Admitted(StepHandle {
                    index: step,
                    shape: state.script.step(step).shape().clone(),
                }))
            }
            None => Ok(Verdict::Unmatched),
        }
    }

    /// Verify every declared step against its bound, in declaration order;
    /// the first failure short-circuits
    pub fn verify(&self) -> FingirResult<()> {
        verifier::verify_script(&self.lock().script)
    }

    /// Verify one step's lifetime total against its declared bound
    pub fn verify_step(&self, step: &StepHandle) -> FingirResult<()> {
        verifier::verify_step(&self.lock().script, step.index)
    }

    /// Verify one step's lifetime total against an explicit bound
    pub fn verify_called(&self, step: &StepHandle, bound: Times) -> FingirResult<()> {
        verifier::verify_called(&self.lock().script, step.index, bound)
    }

    /// Verify the aggregate across every step in the script sharing this
    /// step's shape and declared bound
    pub fn verify_all(&self, step: &StepHandle, bound: Option<Times>) -> FingirResult<()> {
        verifier::verify_all(&self.lock().script, step.index, bound)
    }

    /// Verify one step's per-lap counts on a cyclical script
    pub fn verify_cyclical(
        &self,
        step: &StepHandle,
        expected_counts_per_lap: &[u64],
    ) -> FingirResult<()> {
        verifier::verify_cyclical(&self.lock().script, step.index, expected_counts_per_lap)
    }

    /// Fail if the ledger holds invocations no step ever claimed
    ///
    /// Only meaningful under the loose policy; the strict policy never lets
    /// an unclaimed entry come to exist.
    pub fn verify_no_other_calls(&self) -> FingirResult<()> {
        verifier::verify_no_other_calls(&self.lock().ledger)
    }

    /// Diagnostic snapshot of steps, counts, ledger, and cursor
    #[must_use]
    pub fn report(&self) -> SequenceReport {
        SequenceReport::capture(&self.lock())
    }

    /// Number of ledgered invocations
    #[must_use]
    pub fn ledger_len(&self) -> usize {
        self.lock().ledger.len()
    }

    /// Number of ledgered invocations no step claimed
    #[must_use]
    pub fn unclaimed_count(&self) -> usize {
        self.lock().ledger.unclaimed_count()
    }

    /// Current lap number, zero-based
    #[must_use]
    pub fn current_lap(&self) -> usize {
        self.lock().cursor.lap()
    }

    /// Whether the script has sealed (an invocation has been observed)
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.lock().sealed
    }
}

impl fmt::Debug for CallSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("CallSequence")
            .field("strict", &state.strict)
            .field("cyclical", &state.script.cyclical())
            .field("sealed", &state.sealed)
            .field("ledger_len", &state.ledger.len())
            .field("lap", &state.cursor.lap())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::RecordingSetup;

    fn pair() -> (Collaborator, Collaborator) {
        (Collaborator::new("alpha"), Collaborator::new("beta"))
    }

    #[test]
    fn test_construction_requires_collaborators() {
        let err = CallSequence::new(SequenceConfig::default(), &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "a sequence requires at least one collaborator"
        );
    }

    #[test]
    fn test_declare_requires_exactly_one_configuration() {
        let (alpha, _) = pair();
        let sequence = CallSequence::new(SequenceConfig::default(), &[alpha.clone()]).unwrap();
        let mut setup = RecordingSetup::new();

        let err = sequence
            .declare(&mut setup, Times::once(), |_| {})
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "a sequence declaration must configure exactly one call, but configured 0"
        );

        let err = sequence
            .declare(&mut setup, Times::once(), |s| {
                s.configure(alpha.call("Do", "1"));
                s.configure(alpha.call("Do", "2"));
            })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "a sequence declaration must configure exactly one call, but configured 2"
        );
    }

    #[test]
    fn test_declare_rejects_untracked_collaborator() {
        let (alpha, beta) = pair();
        let sequence = CallSequence::new(SequenceConfig::default(), &[alpha]).unwrap();
        let mut setup = RecordingSetup::new();

        let err = sequence
            .declare(&mut setup, Times::once(), |s| s.configure(beta.call("Do", "1")))
            .unwrap_err();
        assert!(err.to_string().starts_with("collaborator is not tracked"));
    }

    #[test]
    fn test_script_seals_at_first_invocation() {
        let (alpha, _) = pair();
        let sequence = CallSequence::new(SequenceConfig::default(), &[alpha.clone()]).unwrap();
        let mut setup = RecordingSetup::new();

        sequence
            .declare(&mut setup, Times::once(), |s| s.configure(alpha.call("Do", "1")))
            .unwrap();
        assert!(!sequence.is_sealed());

        sequence.on_invocation(&alpha.call("Do", "1")).unwrap();
        assert!(sequence.is_sealed());

        let err = sequence
            .declare(&mut setup, Times::once(), |s| s.configure(alpha.call("Do", "2")))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "sequence declarations are not allowed after the first invocation"
        );
    }

    #[test]
    fn test_gate_admits_only_the_step_just_admitted() {
        let (alpha, beta) = pair();
        let sequence =
            CallSequence::new(SequenceConfig::default(), &[alpha.clone(), beta.clone()]).unwrap();
        let mut setup = RecordingSetup::new();

        sequence
            .declare(&mut setup, Times::once(), |s| s.configure(alpha.call("Do", "1")))
            .unwrap();
        sequence
            .declare(&mut setup, Times::once(), |s| s.configure(beta.call("Do", "1")))
            .unwrap();

        let first_gate = setup.gate_for(&alpha.call("Do", "1")).unwrap().clone();
        let second_gate = setup.gate_for(&beta.call("Do", "1")).unwrap().clone();
        assert!(!first_gate.admits());

        sequence.on_invocation(&alpha.call("Do", "1")).unwrap();
        assert!(first_gate.admits());
        assert!(!second_gate.admits());

        sequence.on_invocation(&beta.call("Do", "1")).unwrap();
        assert!(!first_gate.admits());
        assert!(second_gate.admits());
    }

    #[test]
    fn test_loose_policy_leaves_unmatched_invocation_unclaimed() {
        let (alpha, _) = pair();
        let sequence = CallSequence::new(SequenceConfig::default(), &[alpha.clone()]).unwrap();
        let mut setup = RecordingSetup::new();
        sequence
            .declare(&mut setup, Times::once(), |s| s.configure(alpha.call("Do", "1")))
            .unwrap();

        let verdict = sequence.on_invocation(&alpha.call("Other", "")).unwrap();
        assert_eq!(verdict, Verdict::Unmatched);
        assert_eq!(sequence.unclaimed_count(), 1);
        assert_eq!(
            sequence.verify_no_other_calls().unwrap_err().to_string(),
            "Expected no invocations without sequence setup but found 1"
        );
    }

    #[test]
    fn test_strict_policy_rejects_undeclared_shape() {
        let (alpha, _) = pair();
        let sequence = CallSequence::new(SequenceConfig::strict(), &[alpha.clone()]).unwrap();
        let mut setup = RecordingSetup::new();
        sequence
            .declare(&mut setup, Times::once(), |s| s.configure(alpha.call("Do", "1")))
            .unwrap();

        let err = sequence.on_invocation(&alpha.call("Other", "")).unwrap_err();
        assert!(matches!(err, FingirError::UnexpectedInvocation { .. }));
    }

    #[test]
    fn test_verdict_carries_the_claiming_step() {
        let (alpha, _) = pair();
        let sequence = CallSequence::new(SequenceConfig::default(), &[alpha.clone()]).unwrap();
        let mut setup = RecordingSetup::new();
        let declared = sequence
            .declare(&mut setup, Times::once(), |s| s.configure(alpha.call("Do", "1")))
            .unwrap();

        match sequence.on_invocation(&alpha.call("Do", "1")).unwrap() {
            Verdict::Admitted(handle) => assert_eq!(handle, declared),
            Verdict::Unmatched => panic!("expected the declared step to claim"),
        }
    }
}
