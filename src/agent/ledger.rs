//! Cost ledger
//!
//! Accumulates call counts, token counts, and monetary cost, partitioned by
//! call class (root vs. sub-model). Monotonic; cleared only by reset.

use serde::{Deserialize, Serialize};

use crate::core::{CallClass, CostRecord};

/// Running totals for one call class
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct ClassTotals {
    cost: f64,
    tokens: u64,
    calls: u64,
}

/// Accumulated cost across one session
#[derive(Debug, Clone, Default)]
pub struct CostLedger {
    root: ClassTotals,
    sub: ClassTotals,
}

/// Read-only summary of the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_cost: f64,
    pub root_cost: f64,
    pub sub_cost: f64,
    pub root_tokens: u64,
    pub sub_tokens: u64,
    pub root_calls: u64,
    pub sub_calls: u64,
}

impl CostLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Charge one call to a class
    pub fn record(&mut self, class: CallClass, record: &CostRecord) {
        let totals = match class {
            CallClass::Root => &mut self.root,
            CallClass::Sub => &mut self.sub,
        };
        totals.cost += record.cost;
        totals.tokens += record.tokens;
        totals.calls += 1;
    }

    /// Pure read of the accumulated totals
    pub fn summary(&self) -> CostSummary {
        CostSummary {
            total_cost: self.root.cost + self.sub.cost,
            root_cost: self.root.cost,
            sub_cost: self.sub.cost,
            root_tokens: self.root.tokens,
            sub_tokens: self.sub.tokens,
            root_calls: self.root.calls,
            sub_calls: self.sub.calls,
        }
    }

    /// Clear all totals
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cost: f64, tokens: u64) -> CostRecord {
        CostRecord {
            cost,
            tokens,
            input_tokens: tokens / 2,
            output_tokens: tokens - tokens / 2,
        }
    }

    #[test]
    fn test_totals_partition_by_class() {
        let mut ledger = CostLedger::new();
        ledger.record(CallClass::Root, &record(0.5, 100));
        ledger.record(CallClass::Root, &record(0.25, 50));
        ledger.record(CallClass::Sub, &record(0.1, 20));

        let summary = ledger.summary();
        assert_eq!(summary.root_calls, 2);
        assert_eq!(summary.sub_calls, 1);
        assert_eq!(summary.root_tokens, 150);
        assert_eq!(summary.sub_tokens, 20);
        assert!((summary.total_cost - (summary.root_cost + summary.sub_cost)).abs() < 1e-12);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut ledger = CostLedger::new();
        ledger.record(CallClass::Sub, &record(1.0, 10));
        ledger.reset();

        let summary = ledger.summary();
        assert_eq!(summary.total_cost, 0.0);
        assert_eq!(summary.root_calls, 0);
        assert_eq!(summary.sub_calls, 0);
    }
}
