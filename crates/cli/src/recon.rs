//! `panelrecon run` / `panelrecon validate` — config-driven provider reconciliation.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use log::{info, warn};
use panel_recon::config::{DirectoryLocation, DirectorySource, ReconConfig};
use panel_recon::ingest::{load_batch_csv, load_directory_csv, load_locations_csv};
use panel_recon::{
    CoordinateTable, DistanceSource, NoDistance, PanelDirectory, PanelProvider, ReasonCode,
    ReconciliationReport,
};
use panel_store::{Repository, SqliteRepository};

use crate::exit_codes::EXIT_RECON_UNMATCHED;
use crate::{read_input, CliError};

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Reconcile a provider batch against the panel directory
    #[command(after_help = "\
Examples:
  panelrecon run june.recon.toml
  panelrecon run june.recon.toml --json
  panelrecon run june.recon.toml --output report.json
  panelrecon run june.recon.toml --save reports.db")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Output the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON report to file (overrides [output] json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also save the report into a store file
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  panelrecon validate june.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run { config, json, output, save } => cmd_recon_run(config, json, output, save),
        ReconCommands::Validate { config } => cmd_recon_validate(config),
    }
}

fn cmd_recon_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    save: Option<PathBuf>,
) -> Result<(), CliError> {
    let config_str = read_input(&config_path)?;
    let config = ReconConfig::from_toml(&config_str)?;

    // Resolve file paths relative to config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let directory = load_directory(&config.directory, base_dir)?;
    if directory.is_empty() {
        warn!("panel directory is empty; every record will be unmatched");
    }

    let batch_path = base_dir.join(&config.batch.file);
    let source_file = config.batch.source_file.clone().unwrap_or_else(|| {
        batch_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| config.batch.file.clone())
    });
    let batch = load_batch_csv(&read_input(&batch_path)?, &config.batch.columns, &source_file)?;

    let locations: Option<CoordinateTable> = match &config.locations {
        Some(loc) => {
            let table = load_locations_csv(&read_input(&base_dir.join(&loc.file))?)?;
            info!("{} location(s) loaded", table.len());
            Some(table)
        }
        None => None,
    };
    let distance: &dyn DistanceSource = match &locations {
        Some(table) => table,
        None => &NoDistance,
    };

    let report = panel_recon::run(&config, &directory, &batch, distance);

    // Output
    let json_str = serde_json::to_string_pretty(&report)?;

    let output_path = output_file.or_else(|| config.output.json.as_ref().map(|p| base_dir.join(p)));
    if let Some(ref path) = output_path {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::runtime(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if let Some(ref db) = save {
        let repo = SqliteRepository::<ReconciliationReport>::open(db)?;
        repo.put(&report)?;
        eprintln!("saved report to {}", db.display());
    }

    if json_output {
        println!("{json_str}");
    }

    print_summary(&report);

    let unmatched = report.summary.total_unmatched;
    if unmatched > 0 {
        return Err(CliError::new(
            EXIT_RECON_UNMATCHED,
            format!("{unmatched} record(s) unmatched"),
        ));
    }
    Ok(())
}

fn load_directory(source: &DirectorySource, base_dir: &Path) -> Result<PanelDirectory, CliError> {
    match source.location()? {
        DirectoryLocation::File(file) => {
            let providers = load_directory_csv(&read_input(&base_dir.join(file))?, &source.columns)?;
            Ok(PanelDirectory::new(providers)?)
        }
        DirectoryLocation::Store(store) => {
            // Never create the store here; a missing file is an error.
            let repo = SqliteRepository::<PanelProvider>::open_existing(&base_dir.join(store))?;
            Ok(PanelDirectory::load_from_repository(&repo)?)
        }
    }
}

/// Human summary to stderr
fn print_summary(report: &ReconciliationReport) {
    let s = &report.summary;
    eprintln!(
        "{}: {} record(s) against {} panel provider(s): {} matched ({} exact, {} fuzzy), {} unmatched, match rate {}%",
        report.meta.config_name,
        s.total_records,
        report.meta.directory_size,
        s.total_matched,
        s.exact_matches,
        s.fuzzy_matches,
        s.total_unmatched,
        s.match_rate_percent,
    );
    if s.alternatives_offered > 0 {
        eprintln!("alternatives offered for {} non-panel match(es)", s.alternatives_offered);
    }
    for (reason, count) in &s.reason_counts {
        let label = match reason {
            ReasonCode::IncompleteData => "incomplete data",
            ReasonCode::LowConfidenceMatch => "low confidence",
            ReasonCode::NoCandidate => "no candidate",
        };
        eprintln!("  {label}: {count}");
    }
}

fn cmd_recon_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config_str = read_input(&config_path)?;
    let config = ReconConfig::from_toml(&config_str)?;

    let directory = match config.directory.location()? {
        DirectoryLocation::File(file) => format!("file {file}"),
        DirectoryLocation::Store(store) => format!("store {store}"),
    };
    eprintln!(
        "valid: '{}' (directory {}, batch {}, threshold {}, alternatives {} within {} km)",
        config.name,
        directory,
        config.batch.file,
        config.matching.accept_threshold,
        config.alternatives.max_alternatives,
        config.alternatives.radius_km,
    );
    Ok(())
}
