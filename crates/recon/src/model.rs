use std::collections::BTreeMap;

use panel_store::Record;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelStatus {
    OnPanel,
    NotOnPanel,
}

impl std::fmt::Display for PanelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OnPanel => write!(f, "on_panel"),
            Self::NotOnPanel => write!(f, "not_on_panel"),
        }
    }
}

/// A contracted provider in the panel directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelProvider {
    pub code: String,
    pub name: String,
    pub address: String,
    pub contact: String,
    pub panel_status: PanelStatus,
}

impl PanelProvider {
    pub fn is_on_panel(&self) -> bool {
        self.panel_status == PanelStatus::OnPanel
    }
}

impl Record for PanelProvider {
    const COLLECTION: &'static str = "panel_providers";

    fn key(&self) -> String {
        self.code.clone()
    }
}

/// One provider row from an uploaded external file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProviderRecord {
    pub source_id: String,
    pub name: String,
    pub address: String,
    pub contact: String,
    pub source_file: String,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Fuzzy,
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

/// Why a record could not be matched. Declaration order is diagnosis priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    IncompleteData,
    LowConfidenceMatch,
    NoCandidate,
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IncompleteData => write!(f, "incomplete_data"),
            Self::LowConfidenceMatch => write!(f, "low_confidence_match"),
            Self::NoCandidate => write!(f, "no_candidate"),
        }
    }
}

/// A scored fuzzy-tier candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub panel_provider_code: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeProvider {
    pub panel_provider_code: String,
    pub name: String,
    pub distance_km: f64,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchOutcome {
    Matched {
        panel_provider_code: String,
        panel_status: PanelStatus,
        /// 100 for the exact tier.
        confidence: f64,
        tier: MatchTier,
        alternatives: Vec<AlternativeProvider>,
    },
    Unmatched {
        reason_code: ReasonCode,
        diagnostic_message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        best_candidate: Option<CandidateScore>,
    },
}

impl MatchOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    pub fn reason_code(&self) -> Option<ReasonCode> {
        match self {
            Self::Unmatched { reason_code, .. } => Some(*reason_code),
            Self::Matched { .. } => None,
        }
    }

    pub fn alternatives(&self) -> &[AlternativeProvider] {
        match self {
            Self::Matched { alternatives, .. } => alternatives,
            Self::Unmatched { .. } => &[],
        }
    }
}

/// A batch row together with its outcome and original batch position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledRecord {
    pub position: usize,
    pub record: RawProviderRecord,
    pub outcome: MatchOutcome,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconSummary {
    pub total_records: usize,
    pub total_matched: usize,
    pub total_unmatched: usize,
    pub exact_matches: usize,
    pub fuzzy_matches: usize,
    pub match_rate_percent: u32,
    /// Matched records that carry at least one alternative.
    pub alternatives_offered: usize,
    pub reason_counts: BTreeMap<ReasonCode, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub directory_fingerprint: String,
    pub directory_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub matched: Vec<ReconciledRecord>,
    pub unmatched: Vec<ReconciledRecord>,
}

impl Record for ReconciliationReport {
    const COLLECTION: &'static str = "reconciliation_reports";

    fn key(&self) -> String {
        format!("{}@{}", self.meta.config_name, self.meta.run_at)
    }
}
