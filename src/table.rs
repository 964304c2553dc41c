//! The in-memory table: one worksheet loaded into a polars DataFrame,
//! together with where it came from.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;

use crate::error::{Error, Result};

/// One loaded worksheet plus its source context. The sheet name list is
/// recorded at load time so the session can offer sheet switching without
/// reopening the workbook.
#[derive(Clone)]
pub struct Table {
    pub df: DataFrame,
    pub path: PathBuf,
    pub sheet: String,
    pub sheet_names: Vec<String>,
}

/// A cell value as seen by edits and previews. Conversions from raw input
/// text are total: anything that fails to parse under the column's type
/// comes back as `Text`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Datetime(NaiveDateTime),
    Missing,
}

impl CellValue {
    /// Parse raw input for a cell of the given column type. Never fails:
    /// unparseable input becomes `Text`, which callers store by converting
    /// the column to text.
    pub fn parse(dtype: &DataType, raw: &str) -> CellValue {
        let trimmed = raw.trim();
        match dtype {
            DataType::Int64 | DataType::Int32 => match trimmed.parse::<i64>() {
                Ok(v) => CellValue::Int(v),
                Err(_) => CellValue::Text(raw.to_string()),
            },
            DataType::Float64 | DataType::Float32 => match trimmed.parse::<f64>() {
                Ok(v) => CellValue::Float(v),
                Err(_) => CellValue::Text(raw.to_string()),
            },
            DataType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" => CellValue::Bool(true),
                "false" => CellValue::Bool(false),
                _ => CellValue::Text(raw.to_string()),
            },
            DataType::Date => match parse_datetime_text(trimmed) {
                Some(dt) => CellValue::Date(dt.date()),
                None => CellValue::Text(raw.to_string()),
            },
            DataType::Datetime(_, _) => match parse_datetime_text(trimmed) {
                Some(dt) => CellValue::Datetime(dt),
                None => CellValue::Text(raw.to_string()),
            },
            _ => CellValue::Text(raw.to_string()),
        }
    }

    fn from_any(value: &AnyValue) -> CellValue {
        match value {
            AnyValue::Null => CellValue::Missing,
            AnyValue::Boolean(b) => CellValue::Bool(*b),
            AnyValue::Int32(v) => CellValue::Int(i64::from(*v)),
            AnyValue::Int64(v) => CellValue::Int(*v),
            AnyValue::Float32(v) => CellValue::Float(f64::from(*v)),
            AnyValue::Float64(v) => CellValue::Float(*v),
            other => CellValue::Text(other.str_value().to_string()),
        }
    }

    /// The string rendering shown in prompts and previews. Missing renders
    /// as the empty string.
    pub fn render(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Int(v) => v.to_string(),
            CellValue::Float(v) => v.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::Datetime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Missing => String::new(),
        }
    }
}

/// Inferred logical type of a worksheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Int,
    Float,
    Bool,
    Text,
    Date,
    Datetime,
}

impl Table {
    /// Read one worksheet from the workbook at `path`. The selector is a
    /// sheet name, or a 0-based index if it parses as an integer; `None`
    /// selects the first sheet.
    pub fn load(path: &Path, selector: Option<&str>) -> Result<Table> {
        let mut workbook = open_workbook_auto(path).map_err(|e| Error::read(path, e))?;
        let sheet_names = workbook.sheet_names().to_vec();
        if sheet_names.is_empty() {
            return Err(Error::read(path, "workbook has no worksheets"));
        }

        let sheet = match selector {
            None => sheet_names[0].clone(),
            Some(sel) => {
                if let Ok(idx) = sel.parse::<usize>() {
                    sheet_names
                        .get(idx)
                        .cloned()
                        .ok_or_else(|| Error::read(path, format!("no sheet at index {idx}")))?
                } else if sheet_names.iter().any(|n| n == sel) {
                    sel.to_string()
                } else {
                    return Err(Error::read(path, format!("no sheet named '{sel}'")));
                }
            }
        };

        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| Error::read(path, e))?;
        let df = range_to_dataframe(&range)?;

        Ok(Table {
            df,
            path: path.to_path_buf(),
            sheet,
            sheet_names,
        })
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn columns(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect()
    }

    /// Read one cell back as a `CellValue`.
    pub fn cell(&self, row: usize, column: &str) -> Result<CellValue> {
        let series = self.column(column)?;
        if row >= series.len() {
            return Err(Error::RowOutOfRange {
                row,
                rows: series.len(),
            });
        }
        let value = series.get(row)?;
        Ok(CellValue::from_any(&value))
    }

    /// Replace one cell. Input is parsed under the column's current type;
    /// if it does not parse, the column is converted to text and the
    /// literal input is stored. Only a bad row or column name errors.
    pub fn set_cell(&mut self, row: usize, column: &str, raw: &str) -> Result<()> {
        let rows = self.df.height();
        if row >= rows {
            return Err(Error::RowOutOfRange { row, rows });
        }
        let series = self.column(column)?.clone();

        let replaced = match CellValue::parse(series.dtype(), raw) {
            CellValue::Int(v) => replace_i64(&series.cast(&DataType::Int64)?, row, v)?,
            CellValue::Float(v) => replace_f64(&series.cast(&DataType::Float64)?, row, v)?,
            CellValue::Bool(b) => replace_bool(&series, row, b)?,
            CellValue::Date(d) => {
                let physical = series.cast(&DataType::Int32)?;
                let days = (d - epoch_date()).num_days() as i32;
                replace_i32(&physical, row, days)?.cast(&DataType::Date)?
            }
            CellValue::Datetime(dt) => {
                let dtype = series.dtype().clone();
                let physical = series.cast(&DataType::Int64)?;
                replace_i64(&physical, row, dt.and_utc().timestamp_micros())?.cast(&dtype)?
            }
            CellValue::Text(text) => {
                let cast = series.cast(&DataType::String)?;
                replace_str(&cast, row, &text)?
            }
            CellValue::Missing => unreachable!("parse never yields Missing"),
        };

        self.df.replace(column, replaced)?;
        Ok(())
    }

    /// Strip leading/trailing whitespace from every text cell. Non-text
    /// columns are untouched.
    pub fn trim_whitespace(&mut self) -> Result<()> {
        let mut replacements = Vec::new();
        for col in self.df.get_columns() {
            let series = col.as_materialized_series();
            if series.dtype() != &DataType::String {
                continue;
            }
            let trimmed: Vec<Option<String>> = series
                .str()?
                .iter()
                .map(|v| v.map(|s| s.trim().to_string()))
                .collect();
            replacements.push(Series::new(series.name().clone(), trimmed));
        }
        for series in replacements {
            let name = series.name().to_string();
            self.df.replace(&name, series)?;
        }
        Ok(())
    }

    fn column(&self, column: &str) -> Result<&Series> {
        self.df
            .column(column)
            .map_err(|_| Error::column_not_found(column))
            .map(|c| c.as_materialized_series())
    }
}

fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid date")
}

fn replace_i64(series: &Series, row: usize, value: i64) -> Result<Series> {
    let mut values: Vec<Option<i64>> = series.i64()?.iter().collect();
    values[row] = Some(value);
    Ok(Series::new(series.name().clone(), values))
}

fn replace_i32(series: &Series, row: usize, value: i32) -> Result<Series> {
    let mut values: Vec<Option<i32>> = series.i32()?.iter().collect();
    values[row] = Some(value);
    Ok(Series::new(series.name().clone(), values))
}

fn replace_f64(series: &Series, row: usize, value: f64) -> Result<Series> {
    let mut values: Vec<Option<f64>> = series.f64()?.iter().collect();
    values[row] = Some(value);
    Ok(Series::new(series.name().clone(), values))
}

fn replace_bool(series: &Series, row: usize, value: bool) -> Result<Series> {
    let mut values: Vec<Option<bool>> = series.bool()?.iter().collect();
    values[row] = Some(value);
    Ok(Series::new(series.name().clone(), values))
}

fn replace_str(series: &Series, row: usize, value: &str) -> Result<Series> {
    let mut values: Vec<Option<String>> = series
        .str()?
        .iter()
        .map(|v| v.map(ToString::to_string))
        .collect();
    values[row] = Some(value.to_string());
    Ok(Series::new(series.name().clone(), values))
}

/// Convert a calamine cell range into a DataFrame: first row is the header,
/// every other row is data, column types are inferred from the cells.
fn range_to_dataframe(range: &calamine::Range<Data>) -> Result<DataFrame> {
    let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
    if rows.is_empty() {
        return Ok(DataFrame::new(vec![])?);
    }

    let headers: Vec<String> = rows[0]
        .iter()
        .map(|c| calamine::DataType::as_string(c).unwrap_or_else(|| c.to_string()))
        .collect();

    let mut columns = Vec::with_capacity(headers.len());
    for (idx, header) in headers.iter().enumerate() {
        let cells: Vec<Option<&Data>> = rows[1..].iter().map(|row| row.get(idx)).collect();
        let name = if header.is_empty() {
            format!("column_{}", idx + 1)
        } else {
            header.clone()
        };
        let series = cells_to_series(&name, &cells, infer_column_type(&cells))?;
        columns.push(series.into());
    }
    Ok(DataFrame::new(columns)?)
}

fn infer_column_type(cells: &[Option<&Data>]) -> ColumnType {
    use calamine::DataType as Cell;

    let mut has_int = false;
    let mut has_float = false;
    let mut has_bool = false;
    let mut has_datetime = false;
    for cell in cells.iter().flatten() {
        if Cell::is_string(*cell) {
            // A single text cell makes the column text, unless every
            // non-empty cell is a date/datetime rendered as text.
            return if text_cells_are_datetimes(cells) {
                if parsed_cells_all_midnight(cells) {
                    ColumnType::Date
                } else {
                    ColumnType::Datetime
                }
            } else {
                ColumnType::Text
            };
        }
        if Cell::is_datetime(*cell) || Cell::is_datetime_iso(*cell) {
            has_datetime = true;
        } else if Cell::is_float(*cell) {
            has_float = true;
        } else if Cell::is_int(*cell) {
            has_int = true;
        } else if Cell::is_bool(*cell) {
            has_bool = true;
        }
    }

    if has_datetime {
        if parsed_cells_all_midnight(cells) {
            ColumnType::Date
        } else {
            ColumnType::Datetime
        }
    } else if has_float {
        let all_whole = cells.iter().flatten().all(|cell| {
            calamine::DataType::as_f64(*cell)
                .is_none_or(|f| f.is_finite() && (f - f.trunc()).abs() < 1e-10)
        });
        if all_whole {
            ColumnType::Int
        } else {
            ColumnType::Float
        }
    } else if has_int {
        ColumnType::Int
    } else if has_bool {
        ColumnType::Bool
    } else {
        ColumnType::Text
    }
}

/// True when the column holds text but every non-empty cell parses as a
/// date or datetime (and at least one does).
fn text_cells_are_datetimes(cells: &[Option<&Data>]) -> bool {
    use calamine::DataType as Cell;
    let any = cells
        .iter()
        .flatten()
        .any(|c| cell_to_naive_datetime(c).is_some());
    let all = cells
        .iter()
        .flatten()
        .all(|c| Cell::is_empty(*c) || cell_to_naive_datetime(c).is_some());
    any && all
}

fn parsed_cells_all_midnight(cells: &[Option<&Data>]) -> bool {
    let midnight = NaiveTime::from_hms_opt(0, 0, 0).expect("valid time");
    cells
        .iter()
        .flatten()
        .filter_map(|c| cell_to_naive_datetime(c))
        .all(|dt| dt.time() == midnight)
}

/// A cell as a NaiveDateTime: Excel serial, ISO datetime, or parseable text.
fn cell_to_naive_datetime(cell: &Data) -> Option<NaiveDateTime> {
    use calamine::DataType;
    if let Some(dt) = cell.as_datetime() {
        return Some(dt);
    }
    let s = cell.get_datetime_iso().or_else(|| cell.get_string())?;
    parse_datetime_text(s)
}

/// Parses an ISO-style date or datetime string; tries formats in order.
pub(crate) fn parse_datetime_text(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0).expect("midnight"));
    }
    None
}

fn cells_to_series(name: &str, cells: &[Option<&Data>], ty: ColumnType) -> Result<Series> {
    use calamine::DataType as Cell;
    let series = match ty {
        ColumnType::Int => {
            let v: Vec<Option<i64>> = cells.iter().map(|c| c.and_then(|c| c.as_i64())).collect();
            Series::new(name.into(), v)
        }
        ColumnType::Float => {
            let v: Vec<Option<f64>> = cells.iter().map(|c| c.and_then(|c| c.as_f64())).collect();
            Series::new(name.into(), v)
        }
        ColumnType::Bool => {
            let v: Vec<Option<bool>> = cells
                .iter()
                .map(|c| c.and_then(|c| Cell::get_bool(c)))
                .collect();
            Series::new(name.into(), v)
        }
        ColumnType::Text => {
            let v: Vec<Option<String>> = cells
                .iter()
                .map(|c| {
                    c.and_then(|c| {
                        if Cell::is_empty(c) {
                            None
                        } else {
                            c.as_string()
                        }
                    })
                })
                .collect();
            Series::new(name.into(), v)
        }
        ColumnType::Date => {
            let epoch = epoch_date();
            let v: Vec<Option<i32>> = cells
                .iter()
                .map(|c| {
                    c.and_then(cell_to_naive_datetime)
                        .map(|dt| (dt.date() - epoch).num_days() as i32)
                })
                .collect();
            Series::new(name.into(), v).cast(&DataType::Date)?
        }
        ColumnType::Datetime => {
            let v: Vec<Option<i64>> = cells
                .iter()
                .map(|c| {
                    c.and_then(cell_to_naive_datetime)
                        .map(|dt| dt.and_utc().timestamp_micros())
                })
                .collect();
            Series::new(name.into(), v).cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        }
    };
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let df = df!(
            "id" => [1i64, 2, 3],
            "name" => ["  alice ", "bob", " carol"],
            "score" => [1.5f64, 2.0, 3.25],
        )
        .unwrap();
        Table {
            df,
            path: PathBuf::from("sample.xlsx"),
            sheet: "Sheet1".to_string(),
            sheet_names: vec!["Sheet1".to_string()],
        }
    }

    #[test]
    fn parse_numeric_accepts_whitespace() {
        assert_eq!(CellValue::parse(&DataType::Int64, " 42 "), CellValue::Int(42));
        assert_eq!(
            CellValue::parse(&DataType::Float64, " 2.5"),
            CellValue::Float(2.5)
        );
    }

    #[test]
    fn parse_falls_back_to_text() {
        assert_eq!(
            CellValue::parse(&DataType::Int64, "not a number"),
            CellValue::Text("not a number".to_string())
        );
        assert_eq!(
            CellValue::parse(&DataType::Date, "tomorrow"),
            CellValue::Text("tomorrow".to_string())
        );
    }

    #[test]
    fn set_cell_typed_roundtrip() {
        let mut table = sample_table();
        table.set_cell(1, "id", "99").unwrap();
        assert_eq!(table.cell(1, "id").unwrap(), CellValue::Int(99));
        assert_eq!(table.df.column("id").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn set_cell_unparseable_converts_column_to_text() {
        let mut table = sample_table();
        table.set_cell(0, "id", "n/a").unwrap();
        assert_eq!(table.df.column("id").unwrap().dtype(), &DataType::String);
        assert_eq!(
            table.cell(0, "id").unwrap(),
            CellValue::Text("n/a".to_string())
        );
        // other cells keep their rendering
        assert_eq!(table.cell(1, "id").unwrap(), CellValue::Text("2".to_string()));
    }

    #[test]
    fn set_cell_bad_addresses() {
        let mut table = sample_table();
        assert!(matches!(
            table.set_cell(0, "missing", "x"),
            Err(Error::ColumnNotFound { .. })
        ));
        assert!(matches!(
            table.set_cell(10, "id", "x"),
            Err(Error::RowOutOfRange { .. })
        ));
    }

    #[test]
    fn trim_whitespace_only_touches_text() {
        let mut table = sample_table();
        table.trim_whitespace().unwrap();
        assert_eq!(
            table.cell(0, "name").unwrap(),
            CellValue::Text("alice".to_string())
        );
        assert_eq!(table.cell(2, "score").unwrap(), CellValue::Float(3.25));
    }

    #[test]
    fn datetime_text_formats() {
        assert!(parse_datetime_text("2024-01-31").is_some());
        assert!(parse_datetime_text("2024-01-31 10:30:00").is_some());
        assert!(parse_datetime_text("2024-01-31T10:30:00.250").is_some());
        assert!(parse_datetime_text("31/01/2024").is_none());
    }
}
