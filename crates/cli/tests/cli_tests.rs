// End-to-end tests for the panelrecon binary.
// Run with: cargo test -p panel-cli --test cli_tests
//
// Each test copies tests/fixtures into a fresh temp dir so report and store
// files never land in the source tree.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use panel_recon::{PanelProvider, ReconciliationReport};
use panel_store::{Repository, SqliteRepository};
use tempfile::TempDir;

fn panelrecon(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_panelrecon"));
    cmd.current_dir(dir);
    cmd.env_remove("PANELRECON_DB");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    for entry in std::fs::read_dir(&fixtures).unwrap() {
        let entry = entry.unwrap();
        std::fs::copy(entry.path(), tmp.path().join(entry.file_name())).unwrap();
    }
    tmp
}

fn run(dir: &Path, args: &[&str]) -> Output {
    panelrecon(dir).args(args).output().unwrap()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

// -------------------------------------------------------------------------
// validate
// -------------------------------------------------------------------------

#[test]
fn validate_accepts_fixture_config() {
    let tmp = workspace();
    let out = run(tmp.path(), &["validate", "june.recon.toml"]);
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    let err = stderr(&out);
    assert!(err.contains("valid: 'June provider file'"), "{err}");
    assert!(err.contains("file panel.csv"), "{err}");
}

#[test]
fn validate_rejects_out_of_range_threshold() {
    let tmp = workspace();
    let out = run(tmp.path(), &["validate", "bad-threshold.recon.toml"]);
    assert_eq!(out.status.code(), Some(4));
    assert!(stderr(&out).contains("accept_threshold"));
}

#[test]
fn unknown_subcommand_is_usage_error() {
    let tmp = workspace();
    let out = run(tmp.path(), &["reconcile", "june.recon.toml"]);
    assert_eq!(out.status.code(), Some(2));
}

// -------------------------------------------------------------------------
// run
// -------------------------------------------------------------------------

#[test]
fn run_with_unmatched_records_exits_3_and_prints_json() {
    let tmp = workspace();
    let out = run(tmp.path(), &["run", "june.recon.toml", "--json"]);
    assert_eq!(out.status.code(), Some(3), "{}", stderr(&out));

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["summary"]["total_records"], 7);
    assert_eq!(report["summary"]["total_matched"], 4);
    assert_eq!(report["summary"]["match_rate_percent"], 57);
    assert_eq!(report["matched"][1]["record"]["source_id"], "r2");
    assert_eq!(report["matched"][1]["outcome"]["tier"], "fuzzy");
    assert_eq!(report["matched"][1]["outcome"]["alternatives"][0]["panel_provider_code"], "P3");
    assert_eq!(report["unmatched"][0]["outcome"]["reason_code"], "incomplete_data");

    let err = stderr(&out);
    assert!(err.contains("7 record(s) against 5 panel provider(s)"), "{err}");
    assert!(err.contains("3 record(s) unmatched"), "{err}");
}

#[test]
fn run_all_matched_exits_0_and_writes_configured_output() {
    let tmp = workspace();
    let out = run(tmp.path(), &["run", "clean.recon.toml"]);
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    assert!(out.stdout.is_empty());

    let written = std::fs::read_to_string(tmp.path().join("clean-report.json")).unwrap();
    let report: ReconciliationReport = serde_json::from_str(&written).unwrap();
    assert_eq!(report.summary.total_matched, 3);
    assert_eq!(report.summary.exact_matches, 3);
    assert!(report.matched.iter().all(|r| r.record.source_file == "clean.csv"));
}

#[test]
fn output_flag_overrides_config() {
    let tmp = workspace();
    let out = run(tmp.path(), &["run", "clean.recon.toml", "--output", "elsewhere.json"]);
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    assert!(tmp.path().join("elsewhere.json").exists());
    assert!(!tmp.path().join("clean-report.json").exists());
}

#[test]
fn missing_batch_file_is_runtime_error() {
    let tmp = workspace();
    std::fs::remove_file(tmp.path().join("providers.csv")).unwrap();
    let out = run(tmp.path(), &["run", "june.recon.toml"]);
    assert_eq!(out.status.code(), Some(5));
    assert!(stderr(&out).contains("providers.csv"));
}

#[test]
fn missing_store_file_aborts_before_running() {
    let tmp = workspace();
    let config = std::fs::read_to_string(tmp.path().join("june.recon.toml"))
        .unwrap()
        .replace("file = \"panel.csv\"", "store = \"pnael.db\"");
    std::fs::write(tmp.path().join("typo.recon.toml"), config).unwrap();

    let out = run(tmp.path(), &["run", "typo.recon.toml", "--json"]);
    assert_eq!(out.status.code(), Some(6), "{}", stderr(&out));
    assert!(out.stdout.is_empty());
    let err = stderr(&out);
    assert!(err.contains("store file not found"), "{err}");
    assert!(err.contains("directory import"), "{err}");
    assert!(!err.contains("record(s) against"), "{err}");
    assert!(!tmp.path().join("pnael.db").exists());
}

#[test]
fn save_stores_report() {
    let tmp = workspace();
    let out = run(tmp.path(), &["run", "june.recon.toml", "--save", "reports.db"]);
    assert_eq!(out.status.code(), Some(3), "{}", stderr(&out));

    let repo = SqliteRepository::<ReconciliationReport>::open(&tmp.path().join("reports.db")).unwrap();
    let saved = repo.list().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].meta.config_name, "June provider file");
    assert_eq!(saved[0].summary.total_records, 7);
}

// -------------------------------------------------------------------------
// directory
// -------------------------------------------------------------------------

#[test]
fn import_then_run_from_store() {
    let tmp = workspace();
    let out = run(tmp.path(), &["directory", "import", "panel.csv", "--db", "panel.db"]);
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    assert!(stderr(&out).contains("imported 5 provider(s)"));

    let out = run(tmp.path(), &["directory", "list", "--db", "panel.db", "--json"]);
    assert_eq!(out.status.code(), Some(0));
    let listed: Vec<PanelProvider> = serde_json::from_slice(&out.stdout).unwrap();
    let codes: Vec<&str> = listed.iter().map(|p| p.code.as_str()).collect();
    assert_eq!(codes, vec!["P1", "P2", "P3", "P4", "P5"]);

    let config = std::fs::read_to_string(tmp.path().join("june.recon.toml"))
        .unwrap()
        .replace("file = \"panel.csv\"", "store = \"panel.db\"");
    std::fs::write(tmp.path().join("store.recon.toml"), config).unwrap();

    let from_csv = run(tmp.path(), &["run", "june.recon.toml", "--json"]);
    let from_store = run(tmp.path(), &["run", "store.recon.toml", "--json"]);
    assert_eq!(from_store.status.code(), Some(3), "{}", stderr(&from_store));

    let a: serde_json::Value = serde_json::from_slice(&from_csv.stdout).unwrap();
    let b: serde_json::Value = serde_json::from_slice(&from_store.stdout).unwrap();
    assert_eq!(a["summary"], b["summary"]);
    assert_eq!(a["matched"], b["matched"]);
    assert_eq!(a["meta"]["directory_fingerprint"], b["meta"]["directory_fingerprint"]);
}

#[test]
fn import_replace_drops_stale_providers() {
    let tmp = workspace();
    run(tmp.path(), &["directory", "import", "panel.csv", "--db", "panel.db"]);

    let smaller: String = std::fs::read_to_string(tmp.path().join("panel.csv"))
        .unwrap()
        .lines()
        .filter(|l| !l.starts_with("P4,"))
        .map(|l| format!("{l}\n"))
        .collect();
    std::fs::write(tmp.path().join("smaller.csv"), smaller).unwrap();

    let out = run(tmp.path(), &["directory", "import", "smaller.csv", "--db", "panel.db", "--replace"]);
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    assert!(stderr(&out).contains("removed 1 provider(s)"));

    let repo = SqliteRepository::<PanelProvider>::open(&tmp.path().join("panel.db")).unwrap();
    assert_eq!(repo.len().unwrap(), 4);
    assert!(repo.get("P4").unwrap().is_none());
}

#[test]
fn import_duplicate_codes_leaves_store_untouched() {
    let tmp = workspace();
    let out = run(tmp.path(), &["directory", "import", "duplicate-panel.csv", "--db", "panel.db"]);
    assert_eq!(out.status.code(), Some(5));
    assert!(stderr(&out).contains("duplicate provider code 'P1'"));
    assert!(!tmp.path().join("panel.db").exists());
}

#[test]
fn list_missing_store_fails_without_creating_it() {
    let tmp = workspace();
    let out = run(tmp.path(), &["directory", "list", "--db", "nowhere.db"]);
    assert_eq!(out.status.code(), Some(6));
    assert!(out.stdout.is_empty());
    assert!(stderr(&out).contains("nowhere.db"));
    assert!(!tmp.path().join("nowhere.db").exists());
}

#[test]
fn import_replace_keeps_store_on_invalid_csv() {
    let tmp = workspace();
    run(tmp.path(), &["directory", "import", "panel.csv", "--db", "panel.db"]);

    let out = run(tmp.path(), &["directory", "import", "duplicate-panel.csv", "--db", "panel.db", "--replace"]);
    assert_eq!(out.status.code(), Some(5));

    let repo = SqliteRepository::<PanelProvider>::open_existing(&tmp.path().join("panel.db")).unwrap();
    assert_eq!(repo.len().unwrap(), 5);
}

#[test]
fn list_prints_table() {
    let tmp = workspace();
    run(tmp.path(), &["directory", "import", "panel.csv", "--db", "panel.db"]);
    let out = run(tmp.path(), &["directory", "list", "--db", "panel.db"]);
    assert_eq!(out.status.code(), Some(0));
    let table = String::from_utf8_lossy(&out.stdout);
    let mut lines = table.lines();
    assert!(lines.next().unwrap().starts_with("CODE"));
    assert!(table.contains("not_on_panel"));
    assert_eq!(table.lines().count(), 6);
}
