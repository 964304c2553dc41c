//! Descriptive statistics and correlation over the numeric columns of a
//! table, materialized as DataFrames so results can be previewed and
//! exported like any other sheet.

use polars::prelude::*;

use crate::error::{Error, Result};

/// Summary of the numeric columns: one row per column with count,
/// null_count, mean, std (ddof=1), min, quartiles, median, and max.
pub fn describe(df: &DataFrame) -> Result<DataFrame> {
    let numeric = numeric_columns(df);
    if numeric.is_empty() {
        return Err(Error::Unsupported("no numeric columns to describe".into()));
    }

    let mut counts = Vec::with_capacity(numeric.len());
    let mut null_counts = Vec::with_capacity(numeric.len());
    let mut means = Vec::with_capacity(numeric.len());
    let mut stds = Vec::with_capacity(numeric.len());
    let mut mins = Vec::with_capacity(numeric.len());
    let mut q25s = Vec::with_capacity(numeric.len());
    let mut medians = Vec::with_capacity(numeric.len());
    let mut q75s = Vec::with_capacity(numeric.len());
    let mut maxs = Vec::with_capacity(numeric.len());

    for name in &numeric {
        let series = df.column(name)?.as_materialized_series();
        let values = values_as_f64(series);

        counts.push(values.len() as i64);
        null_counts.push(series.null_count() as i64);
        means.push(series.mean().unwrap_or(f64::NAN));
        stds.push(series.std(1).unwrap_or(f64::NAN));

        let mut sorted = values;
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        mins.push(sorted.first().copied().unwrap_or(f64::NAN));
        q25s.push(percentile(&sorted, 25.0));
        medians.push(percentile(&sorted, 50.0));
        q75s.push(percentile(&sorted, 75.0));
        maxs.push(sorted.last().copied().unwrap_or(f64::NAN));
    }

    let columns = vec![
        Series::new("column".into(), numeric).into(),
        Series::new("count".into(), counts).into(),
        Series::new("null_count".into(), null_counts).into(),
        Series::new("mean".into(), means).into(),
        Series::new("std".into(), stds).into(),
        Series::new("min".into(), mins).into(),
        Series::new("q25".into(), q25s).into(),
        Series::new("median".into(), medians).into(),
        Series::new("q75".into(), q75s).into(),
        Series::new("max".into(), maxs).into(),
    ];
    Ok(DataFrame::new(columns)?)
}

/// Pairwise Pearson correlation over the numeric columns. The first output
/// column names the row, then one f64 column per numeric input column.
pub fn correlation_matrix(df: &DataFrame) -> Result<DataFrame> {
    let numeric = numeric_columns(df);
    if numeric.len() < 2 {
        return Err(Error::Unsupported(
            "need at least 2 numeric columns for a correlation matrix".into(),
        ));
    }

    let n = numeric.len();
    let mut matrix = vec![vec![1.0f64; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let col1 = df.column(&numeric[i])?;
            let col2 = df.column(&numeric[j])?;

            // pairwise null removal
            let mask = col1.is_not_null() & col2.is_not_null();
            let col1 = col1.filter(&mask)?;
            let col2 = col2.filter(&mask)?;

            let r = if col1.len() < 2 {
                f64::NAN
            } else {
                pearson(
                    col1.as_materialized_series(),
                    col2.as_materialized_series(),
                )
            };
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }

    let mut columns = vec![Series::new("column".into(), numeric.clone()).into()];
    for (j, name) in numeric.iter().enumerate() {
        let col: Vec<f64> = (0..n).map(|i| matrix[i][j]).collect();
        columns.push(Series::new(name.as_str().into(), col).into());
    }
    Ok(DataFrame::new(columns)?)
}

fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| is_numeric_type(c.dtype()))
        .map(|c| c.name().to_string())
        .collect()
}

pub(crate) fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Non-null values of a numeric series as f64.
pub(crate) fn values_as_f64(series: &Series) -> Vec<f64> {
    match series.cast(&DataType::Float64) {
        Ok(cast) => match cast.f64() {
            Ok(ca) => ca.iter().flatten().collect(),
            Err(_) => Vec::new(),
        },
        Err(_) => Vec::new(),
    }
}

/// Nearest-rank percentile of an already sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn pearson(col1: &Series, col2: &Series) -> f64 {
    let values1 = values_as_f64(col1);
    let values2 = values_as_f64(col2);
    if values1.len() != values2.len() || values1.len() < 2 {
        return f64::NAN;
    }

    let mean1: f64 = values1.iter().sum::<f64>() / values1.len() as f64;
    let mean2: f64 = values2.iter().sum::<f64>() / values2.len() as f64;

    let numerator: f64 = values1
        .iter()
        .zip(values2.iter())
        .map(|(v1, v2)| (v1 - mean1) * (v2 - mean2))
        .sum();
    let var1: f64 = values1.iter().map(|v| (v - mean1).powi(2)).sum();
    let var2: f64 = values2.iter().map(|v| (v - mean2).powi(2)).sum();

    if var1 == 0.0 || var2 == 0.0 {
        return 0.0;
    }
    numerator / (var1.sqrt() * var2.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_covers_every_numeric_column() {
        let df = df!(
            "id" => [1i64, 2, 3, 4],
            "score" => [Some(1.0f64), Some(2.0), None, Some(4.0)],
            "name" => ["a", "b", "c", "d"],
        )
        .unwrap();
        let stats = describe(&df).unwrap();
        assert_eq!(stats.height(), 2);

        let counts: Vec<Option<i64>> = stats
            .column("count")
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .iter()
            .collect();
        let nulls: Vec<Option<i64>> = stats
            .column("null_count")
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .iter()
            .collect();
        // count + null_count == height for each column
        assert_eq!(counts[0].unwrap() + nulls[0].unwrap(), 4);
        assert_eq!(counts[1].unwrap() + nulls[1].unwrap(), 4);

        assert_eq!(
            stats.column("mean").unwrap().get(0).unwrap(),
            AnyValue::Float64(2.5)
        );
    }

    #[test]
    fn describe_without_numeric_columns_is_unsupported() {
        let df = df!("name" => ["a", "b"]).unwrap();
        assert!(matches!(describe(&df), Err(Error::Unsupported(_))));
    }

    #[test]
    fn quartiles_of_known_data() {
        let df = df!("v" => [1.0f64, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let stats = describe(&df).unwrap();
        let get = |name: &str| match stats.column(name).unwrap().get(0).unwrap() {
            AnyValue::Float64(v) => v,
            other => panic!("expected f64, got {other:?}"),
        };
        assert_eq!(get("min"), 1.0);
        assert_eq!(get("median"), 3.0);
        assert_eq!(get("max"), 5.0);
        assert_eq!(get("q25"), 2.0);
        assert_eq!(get("q75"), 4.0);
    }

    #[test]
    fn perfectly_correlated_columns() {
        let df = df!(
            "a" => [1.0f64, 2.0, 3.0, 4.0],
            "b" => [2.0f64, 4.0, 6.0, 8.0],
            "c" => [4.0f64, 3.0, 2.0, 1.0],
        )
        .unwrap();
        let corr = correlation_matrix(&df).unwrap();
        assert_eq!(corr.height(), 3);
        let at = |col: &str| match corr.column(col).unwrap().get(0).unwrap() {
            AnyValue::Float64(v) => v,
            other => panic!("expected f64, got {other:?}"),
        };
        assert!((at("b") - 1.0).abs() < 1e-12);
        assert!((at("c") + 1.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_needs_two_numeric_columns() {
        let df = df!("a" => [1.0f64, 2.0]).unwrap();
        assert!(matches!(correlation_matrix(&df), Err(Error::Unsupported(_))));
    }
}
