//! Script registry: the declared sequence of expected calls.
//!
//! The script is an arena of plain records: steps live in one `Vec` indexed
//! by declaration order, groups in another indexed by script position, and
//! all cross-references are indices. No pointer graph, no back-references;
//! wraparound and multi-lap counters stay easy to reason about.
//!
//! Consecutive declarations of an identical call shape fold into one
//! **group**, matched as a left-to-right alternation with greedy hand-off:
//! the earliest step still below its minimum is preferred, and once a step's
//! minimum is met the group moves on to the next alternative and never moves
//! back.

use crate::ledger::StepId;
use crate::result::{FingirError, FingirResult};
use crate::shape::CallShape;
use crate::times::Times;
use std::collections::BTreeSet;

/// One declared expectation: a position in the script with a repetition bound
#[derive(Debug, Clone)]
pub(crate) struct Step {
    declaration_index: usize,
    shape: CallShape,
    bounds: Times,
    group: usize,
    /// One running match count per lap of the script
    match_count_by_lap: Vec<u64>,
    /// Global ledger indices of the invocations this step claimed
    matched_ledger_indices: BTreeSet<usize>,
}

impl Step {
    pub fn declaration_index(&self) -> usize {
        self.declaration_index
    }

    pub fn shape(&self) -> &CallShape {
        &self.shape
    }

    pub fn bounds(&self) -> Times {
        self.bounds
    }

    pub fn group(&self) -> usize {
        self.group
    }

    /// Match count recorded for one lap
    pub fn count(&self, lap: usize) -> u64 {
        self.match_count_by_lap.get(lap).copied().unwrap_or(0)
    }

    /// Lifetime match count across all laps
    pub fn total(&self) -> u64 {
        self.match_count_by_lap.iter().sum()
    }

    pub fn counts_by_lap(&self) -> &[u64] {
        &self.match_count_by_lap
    }

    pub fn matched_ledger_indices(&self) -> &BTreeSet<usize> {
        &self.matched_ledger_indices
    }
}

/// A maximal run of consecutively-declared steps sharing one shape
#[derive(Debug, Clone)]
pub(crate) struct Group {
    shape: CallShape,
    steps: Vec<StepId>,
    /// Hand-off pointer: position of the alternative currently being filled.
    /// Moves left to right within a lap; reset to zero on wraparound.
    active: usize,
}

impl Group {
    pub fn shape(&self) -> &CallShape {
        &self.shape
    }

    pub fn steps(&self) -> &[StepId] {
        &self.steps
    }
}

/// The ordered sequence of groups as declared, plus the script-wide flags
#[derive(Debug)]
pub(crate) struct Script {
    groups: Vec<Group>,
    steps: Vec<Step>,
    cyclical: bool,
    allow_consecutive_duplicate_shapes: bool,
}

impl Script {
    pub fn new(cyclical: bool, allow_consecutive_duplicate_shapes: bool) -> Self {
        Self {
            groups: Vec::new(),
            steps: Vec::new(),
            cyclical,
            allow_consecutive_duplicate_shapes,
        }
    }

    pub fn cyclical(&self) -> bool {
        self.cyclical
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group(&self, index: usize) -> &Group {
        &self.groups[index]
    }

    pub fn step(&self, id: StepId) -> &Step {
        &self.steps[id]
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Append a declaration to the script
    ///
    /// A declaration whose shape equals the immediately preceding one joins
    /// that group as a further alternation; otherwise it opens a new
    /// singleton group. The stricter registry variant rejects a back-to-back
    /// duplicate whose configured behavior (shape and bound) is identical.
    pub fn declare(&mut self, shape: CallShape, bounds: Times) -> FingirResult<StepId> {
        let declaration_index = self.steps.len();

        let group = match self.steps.last() {
            Some(previous) if *previous.shape() == shape => {
                if !self.allow_consecutive_duplicate_shapes && previous.bounds() == bounds {
                    return Err(FingirError::usage("Consecutive setups are the same"));
                }
                let group = previous.group();
                self.groups[group].steps.push(declaration_index);
                group
            }
            _ => {
                self.groups.push(Group {
                    shape: shape.clone(),
                    steps: vec![declaration_index],
                    active: 0,
                });
                self.groups.len() - 1
            }
        };

        self.steps.push(Step {
            declaration_index,
            shape,
            bounds,
            group,
            match_count_by_lap: vec![0],
            matched_ledger_indices: BTreeSet::new(),
        });
        Ok(declaration_index)
    }

    /// Pick the alternative of a group that would absorb the next match
    ///
    /// Walks forward from the hand-off pointer: a step still below its
    /// minimum is chosen outright; a step whose minimum is met hands off to
    /// the next alternative; the last alternative absorbs matches up to its
    /// maximum. Returns the position and step, or `None` when the group has
    /// no capacity left. Does not mutate; callers commit the hand-off on
    /// claim via [`Script::commit_handoff`].
    pub fn select_step(&self, group_index: usize, lap: usize) -> Option<(usize, StepId)> {
        let group = &self.groups[group_index];
        let mut position = group.active;
        loop {
            let id = group.steps[position];
            let step = &self.steps[id];
            let count = step.count(lap);
            if !step.bounds().is_met(count) {
                return Some((position, id));
            }
            if position + 1 < group.steps.len() {
                position += 1;
                continue;
            }
            if step.bounds().within_max(count + 1) {
                return Some((position, id));
            }
            return None;
        }
    }

    /// Advance a group's hand-off pointer to the claimed alternative
    pub fn commit_handoff(&mut self, group_index: usize, position: usize) {
        let group = &mut self.groups[group_index];
        debug_assert!(position >= group.active, "hand-off pointer regressed");
        group.active = position;
    }

    /// Count a claimed match against a step for the given lap
    pub fn record_match(&mut self, id: StepId, lap: usize, ledger_index: usize) {
        let step = &mut self.steps[id];
        while step.match_count_by_lap.len() <= lap {
            step.match_count_by_lap.push(0);
        }
        step.match_count_by_lap[lap] += 1;
        step.matched_ledger_indices.insert(ledger_index);
        debug_assert!(
            step.bounds().within_max(step.match_count_by_lap[lap]),
            "per-lap count exceeded the declared maximum"
        );
    }

    /// Whether every step of a group has met its minimum for the given lap
    pub fn group_min_satisfied(&self, group_index: usize, lap: usize) -> bool {
        self.groups[group_index]
            .steps
            .iter()
            .all(|&id| {
                let step = &self.steps[id];
                step.bounds().is_met(step.count(lap))
            })
    }

    /// Whether every group has met its minimum for the given lap
    pub fn lap_min_satisfied(&self, lap: usize) -> bool {
        (0..self.groups.len()).all(|g| self.group_min_satisfied(g, lap))
    }

    /// Open a fresh lap: zero counters for every step, hand-off pointers
    /// back to the first alternative. Satisfaction never carries over.
    pub fn begin_lap(&mut self, lap: usize) {
        for step in &mut self.steps {
            while step.match_count_by_lap.len() <= lap {
                step.match_count_by_lap.push(0);
            }
        }
        for group in &mut self.groups {
            group.active = 0;
        }
    }

    /// Whether any group in the script expects this shape
    pub fn contains_shape(&self, shape: &CallShape) -> bool {
        self.groups.iter().any(|g| g.shape == *shape)
    }

    /// Steps whose shape and declared bound are structurally equal to the
    /// given step's: the aggregation scope for `verify_all`
    pub fn siblings_of(&self, id: StepId) -> Vec<StepId> {
        let reference = &self.steps[id];
        self.steps
            .iter()
            .filter(|s| {
                s.shape() == reference.shape() && s.bounds() == reference.bounds()
            })
            .map(Step::declaration_index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Collaborator;

    fn shapes() -> (CallShape, CallShape) {
        let alpha = Collaborator::new("alpha");
        let beta = Collaborator::new("beta");
        (alpha.call("Do", "1"), beta.call("Run", ""))
    }

    #[test]
    fn test_consecutive_same_shape_folds_into_one_group() {
        let (a, b) = shapes();
        let mut script = Script::new(false, true);

        script.declare(a.clone(), Times::at_least(2)).unwrap();
        script.declare(a.clone(), Times::at_least(1)).unwrap();
        script.declare(b, Times::once()).unwrap();
        script.declare(a, Times::once()).unwrap();

        assert_eq!(script.group_count(), 3);
        assert_eq!(script.group(0).steps(), &[0, 1]);
        assert_eq!(script.group(1).steps(), &[2]);
        assert_eq!(script.group(2).steps(), &[3]);
    }

    #[test]
    fn test_declaration_indices_strictly_increase() {
        let (a, b) = shapes();
        let mut script = Script::new(false, true);

        let first = script.declare(a, Times::once()).unwrap();
        let second = script.declare(b, Times::once()).unwrap();

        assert_eq!(first, 0);
        assert_eq!(second, 1);
        assert_eq!(script.step(second).declaration_index(), 1);
    }

    #[test]
    fn test_strict_registry_rejects_identical_consecutive_setup() {
        let (a, _) = shapes();
        let mut script = Script::new(false, false);

        script.declare(a.clone(), Times::once()).unwrap();
        let err = script.declare(a, Times::once()).unwrap_err();
        assert_eq!(err.to_string(), "Consecutive setups are the same");
    }

    #[test]
    fn test_strict_registry_still_groups_distinct_bounds() {
        let (a, _) = shapes();
        let mut script = Script::new(false, false);

        script.declare(a.clone(), Times::at_least(2)).unwrap();
        script.declare(a, Times::at_least(1)).unwrap();
        assert_eq!(script.group_count(), 1);
        assert_eq!(script.group(0).steps().len(), 2);
    }

    #[test]
    fn test_select_prefers_unfilled_minimum_then_hands_off() {
        let (a, _) = shapes();
        let mut script = Script::new(false, true);
        script.declare(a.clone(), Times::at_least(2)).unwrap();
        script.declare(a, Times::at_least(1)).unwrap();

        // First two matches fill step 0's minimum.
        assert_eq!(script.select_step(0, 0), Some((0, 0)));
        script.record_match(0, 0, 0);
        assert_eq!(script.select_step(0, 0), Some((0, 0)));
        script.record_match(0, 0, 1);

        // Minimum met and a later alternative exists: hand off.
        assert_eq!(script.select_step(0, 0), Some((1, 1)));
    }

    #[test]
    fn test_handoff_is_irreversible() {
        let (a, _) = shapes();
        let mut script = Script::new(false, true);
        script.declare(a.clone(), Times::at_least(2)).unwrap();
        script.declare(a, Times::at_most(1)).unwrap();

        script.record_match(0, 0, 0);
        script.record_match(0, 0, 1);
        let (position, id) = script.select_step(0, 0).unwrap();
        assert_eq!(id, 1);
        script.commit_handoff(0, position);
        script.record_match(1, 0, 2);

        // Step 1 is at its maximum; step 0 is not reconsidered.
        assert_eq!(script.select_step(0, 0), None);
    }

    #[test]
    fn test_begin_lap_resets_counts_and_handoff() {
        let (a, _) = shapes();
        let mut script = Script::new(true, true);
        script.declare(a.clone(), Times::once()).unwrap();
        script.declare(a, Times::once()).unwrap();

        script.record_match(0, 0, 0);
        script.commit_handoff(0, 1);
        script.record_match(1, 0, 1);
        assert!(script.lap_min_satisfied(0));

        script.begin_lap(1);
        assert!(!script.lap_min_satisfied(1));
        assert_eq!(script.step(0).count(1), 0);
        assert_eq!(script.select_step(0, 1), Some((0, 0)));
        assert_eq!(script.step(0).total(), 1);
    }

    #[test]
    fn test_siblings_share_shape_and_bound() {
        let (a, b) = shapes();
        let mut script = Script::new(false, true);
        script.declare(a.clone(), Times::once()).unwrap();
        script.declare(b, Times::once()).unwrap();
        script.declare(a.clone(), Times::once()).unwrap();
        script.declare(a, Times::at_least(1)).unwrap();

        assert_eq!(script.siblings_of(0), vec![0, 2]);
        assert_eq!(script.siblings_of(3), vec![3]);
    }
}
