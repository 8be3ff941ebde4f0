//! Cursor state machine: the per-invocation admission decision.
//!
//! On every ledgered invocation the cursor decides one of four things:
//! claim it and stay on the current group (greedy sub-step), claim it and
//! advance to a later group, reject it with an immediate sequencing failure,
//! or, for shapes the script never declared, admit nothing and either fail
//! (strict policy) or leave the ledger entry unclaimed (loose policy).
//!
//! Advancement is lazy: a group whose minimum is satisfied keeps absorbing
//! matches of its shape up to its maximum, and is only passed over when a
//! later group's shape actually arrives. Wraparound on cyclical scripts is
//! equally lazy: the engine first tries to admit within the current lap and
//! opens a fresh lap at most once per invocation, only when every group's
//! minimum is satisfied. A fresh lap starts with zero counters, so
//! satisfaction from a previous lap can never excuse skipping a group.

use crate::ledger::{InvocationLedger, StepId};
use crate::result::{FingirError, FingirResult};
use crate::script::Script;
use crate::shape::CallShape;
use tracing::{debug, trace};

/// Position the engine currently expects next: group index within the lap,
/// plus the lap number itself (the embedded cycle tracker)
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor {
    group_index: usize,
    lap: usize,
}

impl Cursor {
    pub fn new() -> Self {
        Self {
            group_index: 0,
            lap: 0,
        }
    }

    /// Current lap number, zero-based
    pub fn lap(&self) -> usize {
        self.lap
    }

    /// Group position the cursor points at
    pub fn group_index(&self) -> usize {
        self.group_index
    }

    /// Process one real invocation: ledger it, then decide its fate
    ///
    /// Returns `Ok(Some(step))` when a step claimed the invocation,
    /// `Ok(None)` when the shape has no sequence setup and the loose policy
    /// lets it pass, and `Err` for every sequencing violation (regardless of
    /// strictness) or for undeclared shapes under the strict policy.
    pub fn on_invocation(
        &mut self,
        script: &mut Script,
        ledger: &mut InvocationLedger,
        shape: &CallShape,
        strict: bool,
    ) -> FingirResult<Option<StepId>> {
        let ledger_index = ledger.record(shape.clone());

        if !script.contains_shape(shape) {
            if strict {
                return Err(FingirError::UnexpectedInvocation {
                    shape: shape.to_string(),
                });
            }
            trace!(%shape, ledger_index, "no sequence setup for shape; ledgered unclaimed");
            return Ok(None);
        }

        let step = self.admit(script, shape)?;
        script.record_match(step, self.lap, ledger_index);
        ledger.claim(ledger_index, step);
        debug!(%shape, step, lap = self.lap, "invocation claimed");
        Ok(Some(step))
    }

    fn admit(&mut self, script: &mut Script, shape: &CallShape) -> FingirResult<StepId> {
        match self.admit_within_lap(script, shape) {
            Ok(step) => Ok(step),
            Err(rejection) => {
                // Wrap at most once: a fresh lap is all zeros, so a second
                // wrap could never change the outcome.
                if script.cyclical() && script.lap_min_satisfied(self.lap) {
                    self.wrap(script);
                    self.admit_within_lap(script, shape)
                } else {
                    Err(rejection)
                }
            }
        }
    }

    fn wrap(&mut self, script: &mut Script) {
        self.lap += 1;
        self.group_index = 0;
        script.begin_lap(self.lap);
        debug!(lap = self.lap, "script wrapped; new lap starts unsatisfied");
    }

    fn admit_within_lap(&mut self, script: &mut Script, shape: &CallShape) -> FingirResult<StepId> {
        let lap = self.lap;

        // The group under the cursor: claim without advancing.
        if script.group(self.group_index).shape() == shape {
            if let Some((position, step)) = script.select_step(self.group_index, lap) {
                script.commit_handoff(self.group_index, position);
                return Ok(step);
            }
        }

        // Forward search: the earliest later group with spare capacity for
        // this shape. Min-satisfied groups in between are passed over
        // transparently; the first unmet one is the failure to report.
        for candidate in self.group_index + 1..script.group_count() {
            if script.group(candidate).shape() != shape {
                continue;
            }
            let Some((position, step)) = script.select_step(candidate, lap) else {
                continue;
            };
            if let Some(unmet) =
                (self.group_index..candidate).find(|&g| !script.group_min_satisfied(g, lap))
            {
                return Err(self.unmet_group_error(script, unmet));
            }
            debug!(from = self.group_index, to = candidate, "cursor advanced");
            self.group_index = candidate;
            script.commit_handoff(candidate, position);
            return Ok(step);
        }

        Err(self.exhausted_error(script, shape))
    }

    /// A declared shape arrived while an earlier group's minimum is unmet:
    /// cite the first unfilled step of that group
    fn unmet_group_error(&self, script: &Script, group_index: usize) -> FingirError {
        let lap = self.lap;
        let group = script.group(group_index);
        let id = group
            .steps()
            .iter()
            .copied()
            .find(|&id| {
                let step = script.step(id);
                !step.bounds().is_met(step.count(lap))
            })
            .unwrap_or(group.steps()[0]);
        let step = script.step(id);
        FingirError::Sequencing {
            expected: step.bounds().to_string(),
            actual: step.count(lap),
            shape: step.shape().to_string(),
        }
    }

    /// The shape is in the script but no position can absorb it: its budget
    /// at or before the cursor is used up. Cite the nearest such group's
    /// last alternative, counting the rejected invocation itself.
    fn exhausted_error(&self, script: &Script, shape: &CallShape) -> FingirError {
        let lap = self.lap;
        let at_or_before = (0..=self.group_index.min(script.group_count() - 1))
            .rev()
            .find(|&g| script.group(g).shape() == shape);
        let group_index = at_or_before
            .or_else(|| (self.group_index..script.group_count()).find(|&g| script.group(g).shape() == shape))
            .expect("shape was checked against the script");
        let group = script.group(group_index);
        let id = *group.steps().last().expect("groups are non-empty");
        let step = script.step(id);
        FingirError::Sequencing {
            expected: step.bounds().to_string(),
            actual: step.count(lap) + 1,
            shape: step.shape().to_string(),
        }
    }
}
