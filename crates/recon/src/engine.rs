use std::time::Instant;

use log::{debug, info};

use crate::alternatives::{find_alternatives, DistanceSource};
use crate::config::{EngineConfig, ReconConfig};
use crate::directory::{DirectoryHandle, PanelDirectory};
use crate::matcher::match_record;
use crate::model::{MatchOutcome, MatchTier, RawProviderRecord, ReconMeta, ReconciledRecord, ReconciliationReport};
use crate::normalize::normalize;
use crate::report::build_report;

/// Reconcile a batch against a directory snapshot. Returns the report for
/// every record; absence of a match is an outcome, not an error.
pub fn run(
    config: &ReconConfig,
    directory: &PanelDirectory,
    batch: &[RawProviderRecord],
    distance: &dyn DistanceSource,
) -> ReconciliationReport {
    let started = Instant::now();
    let workers = worker_count(&config.engine, batch.len());
    info!(
        "reconciling {} record(s) against {} panel provider(s) with {} worker(s)",
        batch.len(),
        directory.len(),
        workers
    );

    let outcomes = if workers <= 1 {
        batch
            .iter()
            .enumerate()
            .map(|(i, r)| reconcile_record(i, r, config, directory, distance))
            .collect()
    } else {
        reconcile_parallel(batch, workers, config, directory, distance)
    };

    let report = build_report(
        outcomes,
        ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            directory_fingerprint: directory.fingerprint().to_string(),
            directory_size: directory.len(),
        },
    );

    info!(
        "reconciled {} record(s) in {:.2?}: {} matched, {} unmatched ({}%)",
        report.summary.total_records,
        started.elapsed(),
        report.summary.total_matched,
        report.summary.total_unmatched,
        report.summary.match_rate_percent
    );
    report
}

/// Take a snapshot from the handle and run against it. A concurrent
/// `replace` on the handle does not affect this run.
pub fn run_with_handle(
    config: &ReconConfig,
    handle: &DirectoryHandle,
    batch: &[RawProviderRecord],
    distance: &dyn DistanceSource,
) -> ReconciliationReport {
    let snapshot = handle.snapshot();
    run(config, &snapshot, batch, distance)
}

/// Normalize, match, and (for fuzzy matches outside the panel) look up
/// nearby alternatives for one record.
pub fn reconcile_record(
    position: usize,
    record: &RawProviderRecord,
    config: &ReconConfig,
    directory: &PanelDirectory,
    distance: &dyn DistanceSource,
) -> ReconciledRecord {
    let normalized = normalize(record);
    let mut outcome = match_record(&normalized, directory, &config.matching);

    if let MatchOutcome::Matched {
        panel_provider_code,
        tier: MatchTier::Fuzzy,
        alternatives,
        ..
    } = &mut outcome
    {
        if let Some(matched) = directory.get(panel_provider_code) {
            *alternatives = find_alternatives(matched, directory, &config.alternatives, distance);
            if !alternatives.is_empty() {
                debug!(
                    "{}: {} alternative(s) for {}",
                    record.source_id,
                    alternatives.len(),
                    panel_provider_code
                );
            }
        }
    }

    ReconciledRecord {
        position,
        record: record.clone(),
        outcome,
    }
}

/// Contiguous chunks per worker; each result keeps its batch position so the
/// report builder can restore order.
fn reconcile_parallel(
    batch: &[RawProviderRecord],
    workers: usize,
    config: &ReconConfig,
    directory: &PanelDirectory,
    distance: &dyn DistanceSource,
) -> Vec<ReconciledRecord> {
    let chunk_size = batch.len().div_ceil(workers);

    std::thread::scope(|scope| {
        let handles: Vec<_> = batch
            .chunks(chunk_size)
            .enumerate()
            .map(|(chunk_index, chunk)| {
                let offset = chunk_index * chunk_size;
                scope.spawn(move || {
                    chunk
                        .iter()
                        .enumerate()
                        .map(|(i, r)| reconcile_record(offset + i, r, config, directory, distance))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(batch.len());
        for handle in handles {
            match handle.join() {
                Ok(chunk) => outcomes.extend(chunk),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        outcomes
    })
}

/// Configured workers (0 = one per CPU), never more than there are records.
pub fn worker_count(config: &EngineConfig, records: usize) -> usize {
    let wanted = if config.workers == 0 {
        num_cpus::get()
    } else {
        config.workers
    };
    wanted.clamp(1, records.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeocodeUnavailable;
    use crate::model::{PanelProvider, PanelStatus, ReasonCode};

    fn panel(code: &str, name: &str, address: &str, contact: &str, status: PanelStatus) -> PanelProvider {
        PanelProvider {
            code: code.into(),
            name: name.into(),
            address: address.into(),
            contact: contact.into(),
            panel_status: status,
        }
    }

    fn row(id: &str, name: &str, address: &str, contact: &str) -> RawProviderRecord {
        RawProviderRecord {
            source_id: id.into(),
            name: name.into(),
            address: address.into(),
            contact: contact.into(),
            source_file: "june.xlsx".into(),
        }
    }

    fn directory() -> PanelDirectory {
        PanelDirectory::new(vec![
            panel("P1", "Klinik ABC", "Jalan Tun Razak", "0312345678", PanelStatus::OnPanel),
            panel("P2", "Hospital XYZ", "Jalan Bukit Bintang", "", PanelStatus::NotOnPanel),
            panel("P4", "Klinik Sejahtera", "Jalan Sultan Ismail", "0321112222", PanelStatus::OnPanel),
        ])
        .unwrap()
    }

    fn distances(_from: &PanelProvider, to: &PanelProvider) -> Result<f64, GeocodeUnavailable> {
        match to.code.as_str() {
            "P4" => Ok(2.3),
            _ => Err(GeocodeUnavailable { address: to.address.clone() }),
        }
    }

    #[test]
    fn fuzzy_non_panel_match_gets_alternatives() {
        let config = ReconConfig::named("t");
        let dir = directory();
        let r = reconcile_record(0, &row("r1", "Hosptal XYZ", "Jalan Bukit Bintang", ""), &config, &dir, &distances);
        let alts = r.outcome.alternatives();
        assert_eq!(alts.len(), 1);
        assert_eq!(alts[0].panel_provider_code, "P4");
        assert_eq!(alts[0].distance_km, 2.3);
        assert_eq!(alts[0].rank, 1);
    }

    #[test]
    fn exact_non_panel_match_has_no_alternatives() {
        let config = ReconConfig::named("t");
        let dir = directory();
        // P4 is on panel and 2.3 km away, but exact matches never consult distances.
        let r = reconcile_record(0, &row("r1", "Hospital XYZ", "Jalan Bukit Bintang", ""), &config, &dir, &distances);
        match &r.outcome {
            MatchOutcome::Matched { panel_provider_code, panel_status, tier, confidence, alternatives } => {
                assert_eq!(panel_provider_code, "P2");
                assert_eq!(*panel_status, PanelStatus::NotOnPanel);
                assert_eq!(*tier, MatchTier::Exact);
                assert_eq!(*confidence, 100.0);
                assert!(alternatives.is_empty());
            }
            other => panic!("expected exact match, got {other:?}"),
        }
        assert_eq!(r.outcome.alternatives().len(), 0);
    }

    #[test]
    fn exact_match_has_no_alternatives() {
        let config = ReconConfig::named("t");
        let dir = directory();
        let r = reconcile_record(0, &row("r1", "Hospital XYZ", "", "0399990000"), &config, &dir, &distances);
        // contact differs from P2's blank one, so not exact; address missing
        assert_eq!(r.outcome.reason_code(), Some(ReasonCode::IncompleteData));

        let r = reconcile_record(0, &row("r2", "Klinik ABC", "x", "03 1234 5678"), &config, &dir, &distances);
        assert!(matches!(r.outcome, MatchOutcome::Matched { tier: MatchTier::Exact, .. }));
        assert!(r.outcome.alternatives().is_empty());
    }

    #[test]
    fn parallel_matches_sequential() {
        let dir = directory();
        let batch: Vec<RawProviderRecord> = (0..57)
            .map(|i| match i % 4 {
                0 => row(&format!("r{i}"), "Klinik ABC", "", "0312345678"),
                1 => row(&format!("r{i}"), "Hosptal XYZ", "Jalan Bukit Bintang", ""),
                2 => row(&format!("r{i}"), "Dental Clinic", "", ""),
                _ => row(&format!("r{i}"), "Unknown", "Lorong Kurau 3", ""),
            })
            .collect();

        let mut sequential = ReconConfig::named("t");
        sequential.engine.workers = 1;
        let mut parallel = ReconConfig::named("t");
        parallel.engine.workers = 5;

        let a = run(&sequential, &dir, &batch, &distances);
        let b = run(&parallel, &dir, &batch, &distances);
        assert_eq!(a.matched, b.matched);
        assert_eq!(a.unmatched, b.unmatched);
        assert_eq!(a.summary, b.summary);
        assert_eq!(a.summary.total_records, 57);
    }

    #[test]
    fn handle_run_uses_snapshot() {
        let handle = DirectoryHandle::new(directory());
        let config = ReconConfig::named("t");
        let report = run_with_handle(&config, &handle, &[row("r1", "Klinik ABC", "", "0312345678")], &distances);
        assert_eq!(report.meta.directory_size, 3);
        assert_eq!(report.meta.directory_fingerprint, directory().fingerprint());
    }

    #[test]
    fn worker_count_bounds() {
        let cfg = EngineConfig { workers: 8 };
        assert_eq!(worker_count(&cfg, 3), 3);
        assert_eq!(worker_count(&cfg, 0), 1);
        assert_eq!(worker_count(&cfg, 100), 8);
        assert!(worker_count(&EngineConfig { workers: 0 }, 1000) >= 1);
    }
}
