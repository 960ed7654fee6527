//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `panelrecon` exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success (every record matched, or command completed)     |
//! | 1    | General error (unspecified)                              |
//! | 2    | CLI usage error (bad args, no store path available)      |
//! | 3    | Run completed but some records are unmatched             |
//! | 4    | Invalid config (TOML parse or validation)                |
//! | 5    | Runtime error (file read, CSV, directory contract)       |
//! | 6    | Store error (missing store file, SQLite open/read/write) |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// clap uses the same code for argument parse failures.
pub const EXIT_USAGE: u8 = 2;

/// Reconciliation finished and the report was written, but at least one
/// record is unmatched. Like `diff(1)`, a non-zero status means "needs a look".
pub const EXIT_RECON_UNMATCHED: u8 = 3;

/// Config failed to parse or validate. Nothing was run.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 4;

/// Input could not be loaded: unreadable file, malformed CSV, missing
/// column, duplicate provider code or source id.
pub const EXIT_RECON_RUNTIME: u8 = 5;

/// The SQLite store could not be opened, read, or written. Also used when a
/// store file that must already exist is missing.
pub const EXIT_STORE: u8 = 6;
