//! Row lookup by column value, exact or substring.

use polars::prelude::*;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    Exact,
    Partial,
}

impl MatchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchMode::Exact => "Exact",
            MatchMode::Partial => "Partial",
        }
    }

    /// Parses user input; anything that is not a prefix of "partial"
    /// (case-insensitive) means exact.
    pub fn parse(input: &str) -> MatchMode {
        let lower = input.trim().to_ascii_lowercase();
        if !lower.is_empty() && "partial".starts_with(&lower) {
            MatchMode::Partial
        } else {
            MatchMode::Exact
        }
    }
}

/// The rows that matched, tagged with the predicate that produced them.
/// Recomputed on every call; never maintained incrementally.
pub struct MatchResult {
    pub rows: DataFrame,
    pub column: String,
    pub query: String,
    pub mode: MatchMode,
}

impl MatchResult {
    pub fn is_empty(&self) -> bool {
        self.rows.height() == 0
    }
}

/// Find rows whose cell in `column` matches `query`. Exact compares the
/// trimmed string forms; Partial is a case-insensitive substring test.
/// Missing cells never match. An empty result is not an error.
pub fn find(df: &DataFrame, column: &str, query: &str, mode: MatchMode) -> Result<MatchResult> {
    let series = df
        .column(column)
        .map_err(|_| Error::column_not_found(column))?
        .as_materialized_series();
    let values = series.cast(&DataType::String)?;
    let values = values.str()?;

    let mask: Vec<bool> = match mode {
        MatchMode::Exact => {
            let wanted = query.trim();
            values
                .iter()
                .map(|v| v.is_some_and(|s| s.trim() == wanted))
                .collect()
        }
        MatchMode::Partial => {
            let needle = query.to_lowercase();
            values
                .iter()
                .map(|v| v.is_some_and(|s| s.to_lowercase().contains(&needle)))
                .collect()
        }
    };

    let mask = BooleanChunked::from_slice("matches".into(), &mask);
    Ok(MatchResult {
        rows: df.filter(&mask)?,
        column: column.to_string(),
        query: query.to_string(),
        mode,
    })
}
