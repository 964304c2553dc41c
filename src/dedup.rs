//! Duplicate removal by key column.

use std::collections::HashSet;

use polars::prelude::*;

use crate::error::{Error, Result};

/// Drop every row whose key was already seen, keeping the first occurrence
/// in original row order. Keys are compared by their string form; null keys
/// form a single group. Returns the cleaned frame and the number of rows
/// removed.
pub fn dedupe(df: &DataFrame, key: &str) -> Result<(DataFrame, usize)> {
    let column = df
        .column(key)
        .map_err(|_| Error::column_not_found(key))?
        .as_materialized_series();
    let keys = column.cast(&DataType::String)?;
    let keys = keys.str()?;

    let mut seen: HashSet<String> = HashSet::with_capacity(df.height());
    let mut seen_null = false;
    let mut keep = Vec::with_capacity(df.height());
    for value in keys.iter() {
        let fresh = match value {
            Some(v) => seen.insert(v.to_string()),
            None => !std::mem::replace(&mut seen_null, true),
        };
        keep.push(fresh);
    }

    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    let cleaned = df.filter(&mask)?;
    let removed = df.height() - cleaned.height();
    Ok((cleaned, removed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_occurrence_in_order() {
        let df = df!(
            "id" => [1i64, 1, 2],
            "name" => ["a", "b", "c"],
        )
        .unwrap();
        let (cleaned, removed) = dedupe(&df, "id").unwrap();
        assert_eq!(removed, 1);
        assert_eq!(cleaned.height(), 2);
        assert_eq!(
            cleaned.column("name").unwrap().get(0).unwrap(),
            AnyValue::String("a")
        );
        assert_eq!(
            cleaned.column("name").unwrap().get(1).unwrap(),
            AnyValue::String("c")
        );
    }

    #[test]
    fn idempotent() {
        let df = df!(
            "k" => ["x", "x", "y", "x", "y"],
            "v" => [1i64, 2, 3, 4, 5],
        )
        .unwrap();
        let (once, removed) = dedupe(&df, "k").unwrap();
        assert_eq!(removed, 3);
        let (twice, removed_again) = dedupe(&once, "k").unwrap();
        assert_eq!(removed_again, 0);
        assert!(once.equals(&twice));
    }

    #[test]
    fn null_keys_collapse_to_one_row() {
        let df = df!(
            "k" => [Some("a"), None, None, Some("b")],
            "v" => [1i64, 2, 3, 4],
        )
        .unwrap();
        let (cleaned, removed) = dedupe(&df, "k").unwrap();
        assert_eq!(removed, 1);
        assert_eq!(cleaned.height(), 3);
    }

    #[test]
    fn missing_key_column_errors() {
        let df = df!("a" => [1i64]).unwrap();
        assert!(matches!(
            dedupe(&df, "nope"),
            Err(Error::ColumnNotFound { .. })
        ));
    }
}
