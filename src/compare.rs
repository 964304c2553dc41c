//! Two-table comparison by key column: matched rows plus the rows unique
//! to each side.

use std::collections::HashSet;

use polars::prelude::*;

use crate::error::{Error, Result};

/// Helper key column used to join on the string form of the keys. Dropped
/// from every output frame.
const KEY: &str = "__cmp_key";

/// Suffix applied to right-side columns whose name collides with a
/// left-side column.
pub const RIGHT_SUFFIX: &str = "_file2";

pub struct Comparison {
    /// Inner join on the trimmed string keys; one output row per (left,
    /// right) pair sharing a key, so a key occurring k times on the left
    /// and m times on the right emits k*m rows.
    pub matched: DataFrame,
    /// Left rows whose key occurs nowhere on the right, in original order.
    pub only_left: DataFrame,
    /// Right rows whose key occurs nowhere on the left, in original order.
    pub only_right: DataFrame,
    /// The compared tables, kept as provenance.
    pub left: DataFrame,
    pub right: DataFrame,
}

/// Compare two tables by one key column each. Keys are coerced to their
/// string form and trimmed before comparison, so values that render
/// differently ("1" vs "1.0") are distinct keys even when numerically
/// equal. Null keys match nothing and land in the unmatched partitions.
pub fn compare(
    left: &DataFrame,
    key_left: &str,
    right: &DataFrame,
    key_right: &str,
) -> Result<Comparison> {
    let left_keys = string_keys(left, key_left)?;
    let right_keys = string_keys(right, key_right)?;

    let mut left_keyed = left.clone();
    left_keyed.with_column(Series::new(KEY.into(), left_keys.clone()))?;
    let mut right_keyed = right.clone();
    right_keyed.with_column(Series::new(KEY.into(), right_keys.clone()))?;

    let matched = left_keyed
        .lazy()
        .join(
            right_keyed.lazy(),
            [col(KEY)],
            [col(KEY)],
            JoinArgs::new(JoinType::Inner).with_suffix(Some(RIGHT_SUFFIX.into())),
        )
        .collect()?;
    let helper_cols: Vec<String> = matched
        .get_column_names()
        .iter()
        .filter(|n| n.starts_with(KEY))
        .map(|n| n.to_string())
        .collect();
    let matched = matched.drop_many(helper_cols);

    let left_set = key_set(&left_keys);
    let right_set = key_set(&right_keys);
    let only_left = filter_absent(left, &left_keys, &right_set)?;
    let only_right = filter_absent(right, &right_keys, &left_set)?;

    Ok(Comparison {
        matched,
        only_left,
        only_right,
        left: left.clone(),
        right: right.clone(),
    })
}

/// The trimmed string form of every key cell; nulls stay null.
fn string_keys(df: &DataFrame, key: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(key)
        .map_err(|_| Error::column_not_found(key))?
        .as_materialized_series();
    let strings = column.cast(&DataType::String)?;
    Ok(strings
        .str()?
        .iter()
        .map(|v| v.map(|s| s.trim().to_string()))
        .collect())
}

fn key_set(keys: &[Option<String>]) -> HashSet<&str> {
    keys.iter()
        .filter_map(|k| k.as_deref())
        .collect()
}

/// Rows whose key does not occur in the other side's key set. A null key
/// is never "present" on the other side.
fn filter_absent(
    df: &DataFrame,
    keys: &[Option<String>],
    other: &HashSet<&str>,
) -> Result<DataFrame> {
    let mask: Vec<bool> = keys
        .iter()
        .map(|k| match k {
            Some(v) => !other.contains(v.as_str()),
            None => true,
        })
        .collect();
    let mask = BooleanChunked::from_slice("absent".into(), &mask);
    Ok(df.filter(&mask)?)
}
