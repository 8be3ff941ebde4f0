//! Boundary to the external per-object setup mechanism.
//!
//! The engine never reaches into the response-configuration pipeline with
//! ambient hooks; integration is explicit dependency injection. The setup
//! mechanism exposes a snapshot of its configured shapes (the diff primitive
//! behind `declare`) and stores one [`SequenceGate`] per configured
//! response. Its dispatch path calls the engine's `on_invocation`
//! synchronously before honoring any configured response and consults the
//! gate, a plain boolean question ("was this step the one just admitted?"),
//! so the setup mechanism needs no sequencing knowledge of its own.

use crate::ledger::StepId;
use crate::sequence::{CallSequence, EngineState, Verdict};
use crate::result::FingirResult;
use crate::shape::CallShape;
use std::fmt;
use std::sync::{Arc, Mutex};

/// What the engine requires of the external setup mechanism
pub trait SetupMechanism {
    /// Snapshot of every configured call shape, in registration order
    fn configured_shapes(&self) -> Vec<CallShape>;

    /// Store the engine's admission gate next to the newest configuration
    /// of the given shape
    fn install_gate(&mut self, shape: &CallShape, gate: SequenceGate);
}

/// Admission gate wired next to one step's configured response
///
/// The dispatch path queries it after routing an invocation through the
/// engine; the configured behavior applies only when the gate's step was
/// the one just admitted.
#[derive(Clone)]
pub struct SequenceGate {
    step: StepId,
    state: Arc<Mutex<EngineState>>,
}

impl SequenceGate {
    pub(crate) fn new(step: StepId, state: Arc<Mutex<EngineState>>) -> Self {
        Self { step, state }
    }

    /// Whether this gate's step claimed the invocation just processed
    #[must_use]
    pub fn admits(&self) -> bool {
        let state = self.state.lock().expect("sequence engine mutex poisoned");
        state.last_admitted == Some(self.step)
    }
}

impl fmt::Debug for SequenceGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceGate")
            .field("step", &self.step)
            .finish()
    }
}

/// Minimal in-memory setup mechanism
///
/// A reference implementation of [`SetupMechanism`]: it records configured
/// shapes in registration order, keeps the installed gates, and offers the
/// dispatch path a real mock framework would run on every invocation. Used
/// throughout the crate's own tests and handy for consumers testing their
/// integration.
#[derive(Debug, Default)]
pub struct RecordingSetup {
    entries: Vec<SetupEntry>,
}

#[derive(Debug)]
struct SetupEntry {
    shape: CallShape,
    gate: Option<SequenceGate>,
}

impl RecordingSetup {
    /// Create an empty setup mechanism
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a response configuration for a call shape
    pub fn configure(&mut self, shape: CallShape) {
        self.entries.push(SetupEntry { shape, gate: None });
    }

    /// Number of configurations registered so far
    #[must_use]
    pub fn configured_count(&self) -> usize {
        self.entries.len()
    }

    /// The gate installed for the newest configuration of a shape
    #[must_use]
    pub fn gate_for(&self, shape: &CallShape) -> Option<&SequenceGate> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.shape == *shape && e.gate.is_some())
            .and_then(|e| e.gate.as_ref())
    }

    /// The dispatch path: route the invocation through the engine, then
    /// consult the shape's gates
    ///
    /// Returns whether a configured response applies to this invocation.
    /// Sequencing failures and strict-policy rejections propagate as
    /// errors, before any configured response would run.
    pub fn dispatch(&self, sequence: &CallSequence, shape: &CallShape) -> FingirResult<bool> {
        match sequence.on_invocation(shape)? {
            Verdict::Admitted(_) => Ok(self
                .entries
                .iter()
                .any(|e| e.shape == *shape && e.gate.as_ref().is_some_and(SequenceGate::admits))),
            Verdict::Unmatched => Ok(false),
        }
    }
}

impl SetupMechanism for RecordingSetup {
    fn configured_shapes(&self) -> Vec<CallShape> {
        self.entries.iter().map(|e| e.shape.clone()).collect()
    }

    fn install_gate(&mut self, shape: &CallShape, gate: SequenceGate) {
        // Alternation steps configure the same shape more than once; the
        // gate belongs to the newest configuration still lacking one.
        if let Some(entry) = self
            .entries
            .iter_mut()
            .rev()
            .find(|e| e.shape == *shape && e.gate.is_none())
        {
            entry.gate = Some(gate);
        }
    }
}
