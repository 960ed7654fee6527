use std::collections::BTreeMap;

use crate::model::{
    MatchOutcome, MatchTier, ReconMeta, ReconSummary, ReconciledRecord, ReconciliationReport,
};

/// Partition outcomes into matched/unmatched, each in batch order, and
/// attach summary counters.
///
/// Outcomes may arrive in any order (e.g. from parallel workers); their
/// `position` restores the batch order.
pub fn build_report(mut outcomes: Vec<ReconciledRecord>, meta: ReconMeta) -> ReconciliationReport {
    outcomes.sort_by_key(|r| r.position);

    let summary = compute_summary(&outcomes);
    let (matched, unmatched): (Vec<_>, Vec<_>) =
        outcomes.into_iter().partition(|r| r.outcome.is_matched());

    ReconciliationReport {
        meta,
        summary,
        matched,
        unmatched,
    }
}

/// Compute summary statistics from reconciled records.
pub fn compute_summary(records: &[ReconciledRecord]) -> ReconSummary {
    let mut reason_counts = BTreeMap::new();
    let mut total_matched = 0;
    let mut exact_matches = 0;
    let mut fuzzy_matches = 0;
    let mut alternatives_offered = 0;

    for r in records {
        match &r.outcome {
            MatchOutcome::Matched { tier, alternatives, .. } => {
                total_matched += 1;
                match tier {
                    MatchTier::Exact => exact_matches += 1,
                    MatchTier::Fuzzy => fuzzy_matches += 1,
                }
                if !alternatives.is_empty() {
                    alternatives_offered += 1;
                }
            }
            MatchOutcome::Unmatched { reason_code, .. } => {
                *reason_counts.entry(*reason_code).or_insert(0) += 1;
            }
        }
    }

    let total_records = records.len();
    ReconSummary {
        total_records,
        total_matched,
        total_unmatched: total_records - total_matched,
        exact_matches,
        fuzzy_matches,
        match_rate_percent: match_rate_percent(total_matched, total_records),
        alternatives_offered,
        reason_counts,
    }
}

/// `round(matched / total * 100)`; 0 for an empty batch.
pub fn match_rate_percent(matched: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (matched as f64 / total as f64 * 100.0).round() as u32
}
