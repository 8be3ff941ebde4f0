//! Verification: recorded counts against declared or caller-supplied bounds.
//!
//! Verification only reads. It walks the script (optionally filtered to one
//! step or one step's shape-siblings) and compares lifetime or per-lap
//! match counts against bounds, producing the same structured failures the
//! cursor raises at invocation time.
//!
//! On cyclical scripts the lifetime total of a step grows with every lap,
//! so the declared per-lap maximum cannot apply to the aggregate; lifetime
//! checks there enforce the minimum only, and per-lap precision is
//! `verify_cyclical`'s job.

use crate::ledger::{InvocationLedger, StepId};
use crate::result::{FingirError, FingirResult};
use crate::script::Script;
use crate::shape::CallShape;
use crate::times::Times;
use tracing::trace;

fn check_total(bound: Times, total: u64, shape: &CallShape) -> FingirResult<()> {
    if bound.allows(total) {
        Ok(())
    } else {
        Err(FingirError::Sequencing {
            expected: bound.to_string(),
            actual: total,
            shape: shape.to_string(),
        })
    }
}

/// Lifetime bound actually enforced for a step, given the script policy
fn effective_bound(script: &Script, bound: Times) -> Times {
    if script.cyclical() {
        bound.min_only()
    } else {
        bound
    }
}

/// Check one step's lifetime total against its declared bound
pub(crate) fn verify_step(script: &Script, id: StepId) -> FingirResult<()> {
    let step = script.step(id);
    trace!(step = id, total = step.total(), "verifying step");
    check_total(
        effective_bound(script, step.bounds()),
        step.total(),
        step.shape(),
    )
}

/// Check one step's lifetime total against an explicit caller-supplied bound
pub(crate) fn verify_called(script: &Script, id: StepId, bound: Times) -> FingirResult<()> {
    let step = script.step(id);
    check_total(bound, step.total(), step.shape())
}

/// Check the aggregate over every step sharing this step's shape and
/// declared bound, wherever those steps sit in the script
pub(crate) fn verify_all(script: &Script, id: StepId, bound: Option<Times>) -> FingirResult<()> {
    let siblings = script.siblings_of(id);
    let total: u64 = siblings.iter().map(|&s| script.step(s).total()).sum();
    let step = script.step(id);

    let bound = bound.unwrap_or_else(|| {
        // The declared bound applies to each sibling, so the aggregate
        // window scales with the sibling count.
        let declared = step.bounds();
        let n = siblings.len() as u64;
        let scaled = match declared.max() {
            Some(max) => Times::between(declared.min() * n, max * n),
            None => Times::at_least(declared.min() * n),
        };
        effective_bound(script, scaled)
    });
    check_total(bound, total, step.shape())
}

/// Check one step's per-lap counts against an expected count per lap
pub(crate) fn verify_cyclical(
    script: &Script,
    id: StepId,
    expected_counts_per_lap: &[u64],
) -> FingirResult<()> {
    let step = script.step(id);
    let recorded = step.counts_by_lap().len();
    if recorded != expected_counts_per_lap.len() {
        return Err(FingirError::CycleCount {
            expected: expected_counts_per_lap.len(),
            actual: recorded,
        });
    }
    for (lap, &expected) in expected_counts_per_lap.iter().enumerate() {
        let actual = step.count(lap);
        if actual != expected {
            return Err(FingirError::CycleMismatch {
                cycle: lap + 1,
                expected,
                actual,
                shape: step.shape().to_string(),
            });
        }
    }
    Ok(())
}

/// Verify every step in declaration order; the first failure wins
pub(crate) fn verify_script(script: &Script) -> FingirResult<()> {
    for id in 0..script.steps().len() {
        verify_step(script, id)?;
    }
    Ok(())
}

/// Fail if any ledger entry was never claimed by a step
pub(crate) fn verify_no_other_calls(ledger: &InvocationLedger) -> FingirResult<()> {
    let count = ledger.unclaimed_count();
    if count > 0 {
        return Err(FingirError::UnmatchedInvocations { count });
    }
    Ok(())
}
