//! Two-tier provider matching.
//!
//! Exact tier: normalized name and contact digits both equal.
//! Fuzzy tier: candidates share an address prefix; each gets a weighted
//! confidence score and the best one is accepted at or above the threshold.

use std::cmp::Reverse;

use log::debug;
use ordered_float::OrderedFloat;
use strsim::jaro_winkler;

use crate::config::MatchConfig;
use crate::directory::{DirectoryEntry, PanelDirectory};
use crate::model::{CandidateScore, MatchOutcome, MatchTier, PanelStatus, ReasonCode};
use crate::normalize::{NormalizedPanel, NormalizedRecord};

pub const EXACT_CONFIDENCE: f64 = 100.0;

/// Per-component similarity of one record/panel pair, each within `[0, 1]`,
/// and the weighted confidence on the 0–100 scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub name: f64,
    pub address: f64,
    pub contact: f64,
    pub confidence: f64,
}

/// Evaluate one record against the directory. Never fails: an unmatched
/// record is a normal outcome carrying its diagnosis.
///
/// The returned `Matched` outcome always has empty `alternatives`; the
/// engine fills them for fuzzy matches to non-panel providers.
pub fn match_record(
    record: &NormalizedRecord,
    directory: &PanelDirectory,
    config: &MatchConfig,
) -> MatchOutcome {
    let source_id = &record.raw.source_id;

    if let Some(hit) = exact_match(record, directory) {
        debug!("{source_id}: exact match {}", hit.provider.code);
        return MatchOutcome::Matched {
            panel_provider_code: hit.provider.code.clone(),
            panel_status: hit.provider.panel_status,
            confidence: EXACT_CONFIDENCE,
            tier: MatchTier::Exact,
            alternatives: Vec::new(),
        };
    }

    if !record.has_usable_address() {
        debug!("{source_id}: no exact match and address missing");
        return MatchOutcome::Unmatched {
            reason_code: ReasonCode::IncompleteData,
            diagnostic_message: "no exact name/contact match and the address is missing, \
                                 so fuzzy matching was not attempted"
                .into(),
            best_candidate: None,
        };
    }

    let ranked = rank_candidates(record, directory, config);
    let Some(best) = ranked.first() else {
        debug!("{source_id}: no fuzzy candidates");
        return MatchOutcome::Unmatched {
            reason_code: ReasonCode::NoCandidate,
            diagnostic_message: format!(
                "no exact name/contact match and no panel address shares the first {} characters",
                config.address_prefix_len
            ),
            best_candidate: None,
        };
    };

    if best.confidence >= config.accept_threshold {
        debug!(
            "{source_id}: fuzzy match {} at {:.1} ({} candidate(s))",
            best.panel_provider_code,
            best.confidence,
            ranked.len()
        );
        // Ranked codes always come from the directory.
        let panel_status = directory
            .get(&best.panel_provider_code)
            .map_or(PanelStatus::NotOnPanel, |p| p.panel_status);
        return MatchOutcome::Matched {
            panel_provider_code: best.panel_provider_code.clone(),
            panel_status,
            confidence: best.confidence,
            tier: MatchTier::Fuzzy,
            alternatives: Vec::new(),
        };
    }

    debug!(
        "{source_id}: best candidate {} at {:.1} below threshold {:.1}",
        best.panel_provider_code, best.confidence, config.accept_threshold
    );
    MatchOutcome::Unmatched {
        reason_code: ReasonCode::LowConfidenceMatch,
        diagnostic_message: format!(
            "best candidate {} scored {:.1}, below the acceptance threshold of {:.1}",
            best.panel_provider_code, best.confidence, config.accept_threshold
        ),
        best_candidate: Some(best.clone()),
    }
}

/// Lowest-code directory entry equal on normalized name and contact digits.
pub fn exact_match<'a>(
    record: &NormalizedRecord,
    directory: &'a PanelDirectory,
) -> Option<&'a DirectoryEntry> {
    directory
        .exact_matches(&record.name, &record.contact_digits)
        .into_iter()
        .next()
}

/// All fuzzy-tier candidates, best first. Ties on confidence are broken by
/// ascending code.
pub fn rank_candidates(
    record: &NormalizedRecord,
    directory: &PanelDirectory,
    config: &MatchConfig,
) -> Vec<CandidateScore> {
    let mut scored: Vec<CandidateScore> = directory
        .iter()
        .filter(|e| shares_address_prefix(&record.address, &e.normalized.address, config.address_prefix_len))
        .map(|e| CandidateScore {
            panel_provider_code: e.provider.code.clone(),
            confidence: score_candidate(record, &e.normalized, config).confidence,
        })
        .collect();

    scored.sort_by(|a, b| {
        (Reverse(OrderedFloat(a.confidence)), &a.panel_provider_code)
            .cmp(&(Reverse(OrderedFloat(b.confidence)), &b.panel_provider_code))
    });
    scored
}

/// The record address must be strictly longer than the prefix, so short
/// strings cannot match half the directory.
pub fn shares_address_prefix(record_address: &str, panel_address: &str, prefix_len: usize) -> bool {
    if record_address.chars().count() <= prefix_len || panel_address.chars().count() < prefix_len {
        return false;
    }
    record_address
        .chars()
        .take(prefix_len)
        .eq(panel_address.chars().take(prefix_len))
}

pub fn score_candidate(
    record: &NormalizedRecord,
    panel: &NormalizedPanel,
    config: &MatchConfig,
) -> ScoreBreakdown {
    let name = name_token_overlap(&record.name_tokens, &panel.name_tokens, config.token_similarity);
    let address = address_prefix_ratio(&record.address, &panel.address);
    let contact = contact_overlap_ratio(&record.contact_digits, &panel.contact_digits);

    let w = &config.weights;
    let total = w.total();
    let raw = if total > 0.0 {
        100.0 * (w.name * name + w.address * address + w.contact * contact) / total
    } else {
        0.0
    };

    ScoreBreakdown {
        name,
        address,
        contact,
        confidence: round_confidence(raw),
    }
}

/// One decimal place, clamped to 0–100.
fn round_confidence(raw: f64) -> f64 {
    ((raw * 10.0).round() / 10.0).clamp(0.0, 100.0)
}

/// Fraction of tokens that pair up across the two names.
///
/// A pair needs Jaro-Winkler similarity at or above `min_similarity`; each
/// token joins at most one pair, most similar pairs first. The ratio is over
/// the longer token list, so extra words on either side lower the score.
pub fn name_token_overlap(a: &[String], b: &[String], min_similarity: f64) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut pairs: Vec<(f64, usize, usize)> = Vec::new();
    for (i, ta) in a.iter().enumerate() {
        for (j, tb) in b.iter().enumerate() {
            let sim = if ta == tb { 1.0 } else { jaro_winkler(ta, tb) };
            if sim >= min_similarity {
                pairs.push((sim, i, j));
            }
        }
    }
    pairs.sort_by_key(|&(sim, i, j)| (Reverse(OrderedFloat(sim)), i, j));

    let mut used_a = vec![false; a.len()];
    let mut used_b = vec![false; b.len()];
    let mut paired = 0usize;
    for (_, i, j) in pairs {
        if !used_a[i] && !used_b[j] {
            used_a[i] = true;
            used_b[j] = true;
            paired += 1;
        }
    }

    paired as f64 / a.len().max(b.len()) as f64
}

/// Leading characters in common over the longer address length.
pub fn address_prefix_ratio(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }
    let common = a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count();
    common as f64 / longest as f64
}

/// Trailing digits in common over the longer digit string. Aligning from the
/// right lets a number with a country prefix still overlap its local form.
pub fn contact_overlap_ratio(a: &str, b: &str) -> f64 {
    let longest = a.len().max(b.len());
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let common = a
        .bytes()
        .rev()
        .zip(b.bytes().rev())
        .take_while(|(x, y)| x == y)
        .count();
    common as f64 / longest as f64
}
