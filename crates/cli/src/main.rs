// panelrecon - reconcile provider files against a TPA panel directory

mod directory;
mod exit_codes;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use panel_recon::ReconError;
use panel_store::StoreError;

use exit_codes::{
    EXIT_ERROR, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_RUNTIME, EXIT_STORE, EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "panelrecon")]
#[command(about = "Match external provider files against a TPA panel directory")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Recon(recon::ReconCommands),

    /// Import or list the panel directory held in a store file
    #[command(subcommand)]
    Directory(directory::DirectoryCommands),
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("PANELRECON_GIT_HASH"), ")",
        "\nengine:  panel-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("PANELRECON_TARGET"),
    )
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Recon(cmd) => recon::cmd_recon(cmd),
        Commands::Directory(cmd) => directory::cmd_directory(cmd),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::new(EXIT_RECON_RUNTIME, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(e: ReconError) -> Self {
        let code = match e {
            ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_RECON_INVALID_CONFIG,
            ReconError::Store(_) => EXIT_STORE,
            ReconError::DuplicateCode(_)
            | ReconError::InvalidProvider { .. }
            | ReconError::DuplicateSourceId(_)
            | ReconError::MissingColumn { .. }
            | ReconError::CoordinateParse { .. }
            | ReconError::Io(_) => EXIT_RECON_RUNTIME,
        };
        Self::new(code, e.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        let err = Self::new(EXIT_STORE, e.to_string());
        match e {
            StoreError::NotFound(_) => {
                err.with_hint("create it with `panelrecon directory import <csv> --db <file>`")
            }
            _ => err,
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(EXIT_ERROR, format!("JSON serialization error: {e}"))
    }
}

/// Read a whole input file, naming it in the error.
pub fn read_input(path: &std::path::Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::runtime(format!("cannot read {}: {e}", path.display())))
}

/// `--db` if given, else `panel.db` under the user data directory.
pub fn resolve_store_path(db: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(db) = db {
        return Ok(db);
    }
    dirs::data_dir()
        .map(|d| d.join("panelrecon").join("panel.db"))
        .ok_or_else(|| {
            CliError::usage("no store path given and no user data directory available")
                .with_hint("pass --db <file>")
        })
}
