use polars::prelude::*;
use std::path::Path;

use xltool::config::ConfigManager;
use xltool::session::{Session, SessionState};
use xltool::table::{CellValue, Table};
use xltool::xlsx;

mod common;

fn session_in(dir: &Path) -> Session {
    Session::new(ConfigManager::with_dir(dir.join("config")))
}

#[test]
fn full_workflow_open_edit_dedupe_save_export() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = common::write_workbook(dir.path(), "people", common::people());
    let mut session = session_in(dir.path());

    // 1. Open and preview
    session.open(&fixture, None).unwrap();
    assert_eq!(session.state(), SessionState::Loaded);
    let table = session.table().unwrap();
    assert_eq!(table.columns(), vec!["id", "name", "score"]);
    assert_eq!(table.df.height(), 6);

    // 2. Edit a cell, clean up whitespace
    session.set_cell(0, "name", "Alice Prime").unwrap();
    session.trim_whitespace().unwrap();
    assert_eq!(session.state(), SessionState::Dirty);

    // 3. Dedupe by id, keep-first
    let removed = session.dedupe("id").unwrap();
    assert_eq!(removed, 3);
    let table = session.table().unwrap();
    assert_eq!(table.df.height(), 3);
    assert_eq!(
        table.cell(0, "name").unwrap(),
        CellValue::Text("Alice Prime".to_string())
    );

    // 4. Save in place: state clears, a backup appears
    session.save().unwrap();
    assert_eq!(session.state(), SessionState::Loaded);
    let backups: Vec<_> = std::fs::read_dir(dir.path().join("backups"))
        .unwrap()
        .collect();
    assert_eq!(backups.len(), 1);

    // 5. The saved file holds the deduped data
    let reloaded = Table::load(&fixture, None).unwrap();
    assert_eq!(reloaded.df.height(), 3);

    // 6. Export to a new workbook and remember the path
    let out = session.export(&dir.path().join("export")).unwrap();
    assert!(out.ends_with("export.xlsx"));
    assert_eq!(session.last_exported(), Some(out.as_path()));
}

#[test]
fn settings_survive_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = common::write_workbook(dir.path(), "book", common::people());

    {
        let mut session = session_in(dir.path());
        session.open(&fixture, None).unwrap();
        session.export(&dir.path().join("sent")).unwrap();
        session.remember_smtp("smtp.example.com:587", "me@example.com", true);
    }

    let settings = ConfigManager::with_dir(dir.path().join("config")).load_settings();
    assert_eq!(settings.last_opened, Some(fixture));
    assert_eq!(settings.last_exported, Some(dir.path().join("sent.xlsx")));
    assert_eq!(settings.smtp.server.as_deref(), Some("smtp.example.com:587"));
    assert_eq!(settings.smtp.sender.as_deref(), Some("me@example.com"));
    assert!(settings.smtp.remember);

    // forgetting clears the stored transport details
    let mut session = session_in(dir.path());
    session.remember_smtp("smtp.example.com:587", "me@example.com", false);
    let settings = ConfigManager::with_dir(dir.path().join("config")).load_settings();
    assert_eq!(settings.smtp.server, None);
    assert_eq!(settings.smtp.sender, None);
}

#[test]
fn sheet_switching_rereads_the_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let first = df!("a" => [1i64, 2]).unwrap();
    let second = df!("b" => ["x", "y", "z"]).unwrap();
    let path = xlsx::save_sheets(
        &dir.path().join("multi"),
        &[("First".to_string(), first), ("Second".to_string(), second)],
    )
    .unwrap();

    let mut session = session_in(dir.path());
    session.open(&path, None).unwrap();
    let table = session.table().unwrap();
    assert_eq!(table.sheet, "First");
    assert_eq!(table.sheet_names, vec!["First", "Second"]);

    // by name
    session.switch_sheet("Second").unwrap();
    assert_eq!(session.table().unwrap().columns(), vec!["b"]);
    assert_eq!(session.table().unwrap().df.height(), 3);

    // by index
    session.switch_sheet("0").unwrap();
    assert_eq!(session.table().unwrap().columns(), vec!["a"]);

    // unknown sheet is a read error and leaves the table alone
    assert!(session.switch_sheet("Third").is_err());
    assert_eq!(session.table().unwrap().columns(), vec!["a"]);
}

#[test]
fn reopening_replaces_the_active_table_and_clears_dirty() {
    let dir = tempfile::tempdir().unwrap();
    let first = common::write_workbook(dir.path(), "first", common::people());
    let second = common::write_workbook(dir.path(), "second", common::compare_left());

    let mut session = session_in(dir.path());
    session.open(&first, None).unwrap();
    session.trim_whitespace().unwrap();
    assert_eq!(session.state(), SessionState::Dirty);

    session.open(&second, None).unwrap();
    assert_eq!(session.state(), SessionState::Loaded);
    assert_eq!(session.table().unwrap().columns(), vec!["k", "v"]);
}

#[test]
fn dedupe_to_file_leaves_the_active_table_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = common::write_workbook(dir.path(), "people", common::people());
    let mut session = session_in(dir.path());
    session.open(&fixture, None).unwrap();

    let out = session
        .dedupe_to_file("id", &dir.path().join("cleaned"))
        .unwrap();
    assert_eq!(session.table().unwrap().df.height(), 6);
    assert_eq!(session.state(), SessionState::Loaded);

    let cleaned = Table::load(&out, None).unwrap();
    assert_eq!(cleaned.sheet, "Cleaned");
    assert_eq!(cleaned.df.height(), 3);
}

#[test]
fn statistics_flow_over_a_loaded_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = common::write_workbook(dir.path(), "people", common::people());
    let mut session = session_in(dir.path());
    session.open(&fixture, None).unwrap();

    let stats = session.describe().unwrap();
    // id and score are numeric, name is not
    assert_eq!(stats.height(), 2);

    let corr = session.correlation().unwrap();
    assert_eq!(corr.height(), 2);

    // results export like any other sheet
    let out = session
        .export_frame("Descriptive", &stats, &dir.path().join("stats"))
        .unwrap();
    let reloaded = Table::load(&out, None).unwrap();
    assert_eq!(reloaded.sheet, "Descriptive");
    assert_eq!(reloaded.df.height(), 2);
}

#[test]
fn chart_requires_a_numeric_column() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = common::write_workbook(dir.path(), "people", common::people());
    let mut session = session_in(dir.path());
    session.open(&fixture, None).unwrap();

    let err = session
        .chart(
            xltool::chart::ChartKind::Line,
            None,
            "name",
            &dir.path().join("chart"),
        )
        .unwrap_err();
    assert!(err.to_string().contains("name"));
}
