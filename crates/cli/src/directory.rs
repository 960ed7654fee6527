//! `panelrecon directory` — maintain the panel directory held in a store file.

use std::io::Write;
use std::path::PathBuf;

use clap::Subcommand;
use log::info;
use panel_recon::config::DirectoryColumns;
use panel_recon::ingest::load_directory_csv;
use panel_recon::{PanelDirectory, PanelProvider};
use panel_store::{Repository, SqliteRepository};

use crate::{read_input, resolve_store_path, CliError};

#[derive(Subcommand)]
pub enum DirectoryCommands {
    /// Load a panel directory CSV into a store file
    #[command(after_help = "\
Examples:
  panelrecon directory import panel.csv --db panel.db
  panelrecon directory import panel.csv --db panel.db --replace")]
    Import {
        /// CSV with code, name, address, contact, panel_status columns
        csv: PathBuf,

        /// Store file (defaults to panel.db in the user data directory)
        #[arg(long, env = "PANELRECON_DB")]
        db: Option<PathBuf>,

        /// Make the store hold exactly the CSV's providers, in one transaction
        #[arg(long)]
        replace: bool,
    },

    /// List the providers held in a store file
    #[command(after_help = "\
Examples:
  panelrecon directory list --db panel.db
  panelrecon directory list --db panel.db --json")]
    List {
        /// Store file (defaults to panel.db in the user data directory)
        #[arg(long, env = "PANELRECON_DB")]
        db: Option<PathBuf>,

        /// Output JSON array instead of a table
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_directory(cmd: DirectoryCommands) -> Result<(), CliError> {
    match cmd {
        DirectoryCommands::Import { csv, db, replace } => cmd_directory_import(csv, db, replace),
        DirectoryCommands::List { db, json } => cmd_directory_list(db, json),
    }
}

fn cmd_directory_import(csv: PathBuf, db: Option<PathBuf>, replace: bool) -> Result<(), CliError> {
    let db = resolve_store_path(db)?;

    // Validate the whole file as a directory before touching the store.
    let providers = load_directory_csv(&read_input(&csv)?, &DirectoryColumns::default())?;
    let directory = PanelDirectory::new(providers)?;

    let repo = SqliteRepository::<PanelProvider>::open(&db)?;
    let incoming = directory.providers();
    let removed = if replace {
        repo.replace_all(&incoming)?
    } else {
        repo.put_all(&incoming)?;
        0
    };
    info!("import into {}: {} upserted, {} removed", db.display(), incoming.len(), removed);

    eprintln!(
        "imported {} provider(s) into {} ({} on panel, fingerprint {})",
        incoming.len(),
        db.display(),
        directory.on_panel().count(),
        &directory.fingerprint()[..12],
    );
    if removed > 0 {
        eprintln!("removed {removed} provider(s) absent from {}", csv.display());
    }
    Ok(())
}

fn cmd_directory_list(db: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let db = resolve_store_path(db)?;
    let repo = SqliteRepository::<PanelProvider>::open_existing(&db)?;
    let providers = repo.list()?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let write_err = |e: std::io::Error| CliError::runtime(e.to_string());

    if json {
        let json_str = serde_json::to_string_pretty(&providers)?;
        writeln!(out, "{json_str}").map_err(write_err)?;
        return Ok(());
    }

    let code_width = providers.iter().map(|p| p.code.len()).max().unwrap_or(4).max(4);
    writeln!(out, "{:<code_width$}  {:<12}  {:<30}  {:<30}  CONTACT", "CODE", "STATUS", "NAME", "ADDRESS")
        .map_err(write_err)?;
    for p in &providers {
        writeln!(
            out,
            "{:<code_width$}  {:<12}  {:<30}  {:<30}  {}",
            p.code,
            p.panel_status.to_string(),
            p.name,
            p.address,
            p.contact
        )
        .map_err(write_err)?;
    }
    eprintln!("{} provider(s) in {}", providers.len(), db.display());
    Ok(())
}
