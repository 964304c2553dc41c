use polars::prelude::*;
use std::path::Path;

use xltool::config::ConfigManager;
use xltool::lookup::MatchMode;
use xltool::session::Session;
use xltool::table::Table;

mod common;

fn session_in(dir: &Path) -> Session {
    Session::new(ConfigManager::with_dir(dir.join("config")))
}

#[test]
fn compare_exports_three_sheets() {
    let dir = tempfile::tempdir().unwrap();
    let left = common::write_workbook(dir.path(), "left", common::compare_left());
    let right = common::write_workbook(dir.path(), "right", common::compare_right());
    let mut session = session_in(dir.path());

    let (out, cmp) = session
        .compare_to_file(&left, "k", &right, "k", &dir.path().join("cmp"))
        .unwrap();

    // both right-side "x" rows pair with the single left "x" row
    assert_eq!(cmp.matched.height(), 2);
    assert_eq!(cmp.only_left.height(), 1);
    assert_eq!(cmp.only_right.height(), 0);

    let workbook = Table::load(&out, None).unwrap();
    assert_eq!(
        workbook.sheet_names,
        vec!["Matches", "Only_in_file1", "Only_in_file2"]
    );

    let matches = Table::load(&out, Some("Matches")).unwrap();
    assert_eq!(matches.df.height(), 2);
    assert!(matches.columns().contains(&"v".to_string()));
    assert!(matches.columns().contains(&"w".to_string()));

    let only_left = Table::load(&out, Some("Only_in_file1")).unwrap();
    assert_eq!(only_left.df.height(), 1);
    assert_eq!(
        only_left.df.column("k").unwrap().get(0).unwrap(),
        AnyValue::String("y")
    );

    // comparison recorded as the last export
    assert_eq!(session.last_exported(), Some(out.as_path()));
}

#[test]
fn compare_rereads_files_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let left = common::write_workbook(dir.path(), "left", common::compare_left());
    let right = common::write_workbook(dir.path(), "right", common::compare_right());
    let mut session = session_in(dir.path());

    // prime the auxiliary cache with the stale right-hand file
    session.open(&right, None).unwrap();

    // rewrite the right file with different keys
    common::write_workbook(dir.path(), "right", df!("k" => ["y"], "w" => [99i64]).unwrap());

    let cmp = session.compare_files(&left, "k", &right, "k").unwrap();
    // the fresh read sees "y", not the cached "x" rows
    assert_eq!(cmp.matched.height(), 1);
    assert_eq!(cmp.only_left.height(), 1);
}

#[test]
fn compare_missing_column_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let left = common::write_workbook(dir.path(), "left", common::compare_left());
    let right = common::write_workbook(dir.path(), "right", common::compare_right());
    let session = session_in(dir.path());

    let err = session
        .compare_files(&left, "nope", &right, "k")
        .unwrap_err();
    assert!(err.to_string().contains("nope"));
}

#[test]
fn lookup_partial_is_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = common::write_workbook(
        dir.path(),
        "fruit",
        df!("name" => ["Apple", "banana"]).unwrap(),
    );
    let mut session = session_in(dir.path());
    session.open(&fixture, None).unwrap();

    let result = session
        .lookup(None, "name", "A", MatchMode::Partial)
        .unwrap();
    assert_eq!(result.rows.height(), 2);

    let result = session
        .lookup(None, "name", "apple", MatchMode::Partial)
        .unwrap();
    assert_eq!(result.rows.height(), 1);
    assert_eq!(
        result.rows.column("name").unwrap().get(0).unwrap(),
        AnyValue::String("Apple")
    );
}

#[test]
fn lookup_against_a_browsed_file_returns_full_rows() {
    let dir = tempfile::tempdir().unwrap();
    let active = common::write_workbook(dir.path(), "active", common::compare_left());
    let aux = common::write_workbook(dir.path(), "people", common::people());
    let mut session = session_in(dir.path());
    session.open(&active, None).unwrap();

    let result = session
        .lookup(Some(&aux), "name", "Bob", MatchMode::Exact)
        .unwrap();
    assert_eq!(result.rows.height(), 1);
    assert_eq!(result.rows.width(), 3);
    assert_eq!(
        result.rows.column("score").unwrap().get(0).unwrap(),
        AnyValue::Float64(20.5)
    );

    // no match is an empty result, not an error
    let result = session
        .lookup(Some(&aux), "name", "Zed", MatchMode::Exact)
        .unwrap();
    assert!(result.is_empty());
}
