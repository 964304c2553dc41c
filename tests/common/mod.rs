use polars::prelude::*;
use std::path::{Path, PathBuf};

use xltool::xlsx;

/// Write a one-sheet workbook into `dir` and return its path.
pub fn write_workbook(dir: &Path, name: &str, df: DataFrame) -> PathBuf {
    xlsx::save_sheets(&dir.join(name), &[("Sheet1".to_string(), df)]).expect("write fixture")
}

/// People with duplicate ids and whitespace-padded names.
pub fn people() -> DataFrame {
    df!(
        "id" => [1i64, 1, 2, 3, 3, 3],
        "name" => ["  Alice ", "alice-dup", "Bob", "Carol", "carol-dup", "carol-dup2"],
        "score" => [10.5f64, 11.0, 20.5, 30.0, 31.5, 32.0],
    )
    .unwrap()
}

/// Left side of the comparison scenario: keys "x" and "y".
pub fn compare_left() -> DataFrame {
    df!(
        "k" => ["x", "y"],
        "v" => [1i64, 2],
    )
    .unwrap()
}

/// Right side of the comparison scenario: "x" twice.
pub fn compare_right() -> DataFrame {
    df!(
        "k" => ["x", "x"],
        "w" => [10i64, 11],
    )
    .unwrap()
}
