//! Diagnostic snapshot of a sequence engine.
//!
//! A [`SequenceReport`] captures steps with their declared bounds and
//! per-lap counts, every ledger entry with its claim tag, and the cursor
//! position: enough to debug a sequencing failure without poking at the
//! engine's internals. Serializes to JSON for sharing or archiving.

use crate::sequence::EngineState;
use crate::times::Times;
use serde::{Deserialize, Serialize};

/// Snapshot of one declared step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Global declaration index
    pub declaration_index: usize,
    /// Rendered call shape
    pub shape: String,
    /// Declared repetition bound
    pub bounds: Times,
    /// Index of the owning group
    pub group: usize,
    /// Match counts, one per lap
    pub counts_by_lap: Vec<u64>,
    /// Lifetime match count
    pub total: u64,
    /// Ledger indices of the invocations this step claimed
    pub matched_ledger_indices: Vec<usize>,
}

/// Snapshot of one ledgered invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationReport {
    /// Position in the ledger, in wall order
    pub ledger_index: usize,
    /// Rendered call shape
    pub shape: String,
    /// Declaration index of the claiming step, if any
    pub claimed_by: Option<usize>,
}

/// Full diagnostic snapshot of a sequence engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceReport {
    /// Whether the strict policy is active
    pub strict: bool,
    /// Whether the script repeats cyclically
    pub cyclical: bool,
    /// Current lap number, zero-based
    pub lap: usize,
    /// Group position the cursor points at
    pub cursor_group: usize,
    /// Every declared step
    pub steps: Vec<StepReport>,
    /// Every ledgered invocation
    pub invocations: Vec<InvocationReport>,
}

impl SequenceReport {
    pub(crate) fn capture(state: &EngineState) -> Self {
        let steps = state
            .script
            .steps()
            .iter()
            .map(|step| StepReport {
                declaration_index: step.declaration_index(),
                shape: step.shape().to_string(),
                bounds: step.bounds(),
                group: step.group(),
                counts_by_lap: step.counts_by_lap().to_vec(),
                total: step.total(),
                matched_ledger_indices: step.matched_ledger_indices().iter().copied().collect(),
            })
            .collect();
        let invocations = state
            .ledger
            .records()
            .iter()
            .map(|record| InvocationReport {
                ledger_index: record.ledger_index,
                shape: record.shape.to_string(),
                claimed_by: record.claimed_by,
            })
            .collect();
        Self {
            strict: state.strict,
            cyclical: state.script.cyclical(),
            lap: state.cursor.lap(),
            cursor_group: state.cursor.group_index(),
            steps,
            invocations,
        }
    }

    /// Render the snapshot as pretty-printed JSON
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("report serialization cannot fail")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::{CallSequence, SequenceConfig};
    use crate::setup::RecordingSetup;
    use crate::shape::Collaborator;

    #[test]
    fn test_report_reflects_claims_and_counts() {
        let alpha = Collaborator::new("alpha");
        let sequence = CallSequence::new(SequenceConfig::default(), &[alpha.clone()]).unwrap();
        let mut setup = RecordingSetup::new();
        sequence
            .declare(&mut setup, Times::at_least(1), |s| {
                s.configure(alpha.call("Do", "1"));
            })
            .unwrap();

        sequence.on_invocation(&alpha.call("Do", "1")).unwrap();
        sequence.on_invocation(&alpha.call("Other", "")).unwrap();

        let report = sequence.report();
        assert!(!report.strict);
        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.steps[0].total, 1);
        assert_eq!(report.steps[0].matched_ledger_indices, vec![0]);
        assert_eq!(report.invocations.len(), 2);
        assert_eq!(report.invocations[0].claimed_by, Some(0));
        assert_eq!(report.invocations[1].claimed_by, None);
    }

    #[test]
    fn test_report_round_trips_through_json() {
        let alpha = Collaborator::new("alpha");
        let sequence = CallSequence::new(SequenceConfig::default(), &[alpha.clone()]).unwrap();
        let mut setup = RecordingSetup::new();
        sequence
            .declare(&mut setup, Times::once(), |s| s.configure(alpha.call("Do", "1")))
            .unwrap();
        sequence.on_invocation(&alpha.call("Do", "1")).unwrap();

        let report = sequence.report();
        let json = report.to_json();
        let parsed: SequenceReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
