//! Append-only ledger of observed invocations.
//!
//! Every real invocation on a tracked collaborator lands here exactly once,
//! in wall order, before any matching is attempted. Entries are later tagged
//! with the step that claimed them; entries that no step ever claims are the
//! evidence behind `verify_no_other_calls`.

use crate::shape::CallShape;
use serde::{Deserialize, Serialize};

/// Index of a step in the script arena, in declaration order
pub(crate) type StepId = usize;

/// One observed invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct InvocationRecord {
    /// Position in the ledger, in wall order
    pub ledger_index: usize,
    /// Shape of the observed call
    pub shape: CallShape,
    /// The step that claimed this invocation, if any
    pub claimed_by: Option<StepId>,
}

/// Append-only record of every observed invocation
#[derive(Debug, Default)]
pub(crate) struct InvocationLedger {
    records: Vec<InvocationRecord>,
}

impl InvocationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an unclaimed entry, returning its ledger index
    pub fn record(&mut self, shape: CallShape) -> usize {
        let ledger_index = self.records.len();
        self.records.push(InvocationRecord {
            ledger_index,
            shape,
            claimed_by: None,
        });
        ledger_index
    }

    /// Tag an entry with the step that claimed it
    pub fn claim(&mut self, ledger_index: usize, step: StepId) {
        if let Some(record) = self.records.get_mut(ledger_index) {
            debug_assert!(record.claimed_by.is_none(), "ledger entry claimed twice");
            record.claimed_by = Some(step);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of entries no step has claimed
    pub fn unclaimed_count(&self) -> usize {
        self.records.iter().filter(|r| r.claimed_by.is_none()).count()
    }

    pub fn records(&self) -> &[InvocationRecord] {
        &self.records
    }
}
