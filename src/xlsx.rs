//! Workbook writing: one or more named DataFrames into a single .xlsx file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate};
use polars::prelude::*;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::error::{Error, Result};

/// Excel caps worksheet names at 31 characters.
const MAX_SHEET_NAME: usize = 31;

/// Write the given sheets to `path`, appending the `.xlsx` extension when
/// missing. Sheet names longer than 31 characters are truncated. A sheet
/// whose typed write fails is retried once with every cell coerced to
/// text; a failure after that surfaces as a write error for the path.
pub fn save_sheets(path: &Path, sheets: &[(String, DataFrame)]) -> Result<PathBuf> {
    let path = ensure_xlsx(path);
    let mut text_mode = vec![false; sheets.len()];
    loop {
        match build_workbook(&path, sheets, &text_mode) {
            Ok(()) => return Ok(path),
            Err((Some(idx), _)) if !text_mode[idx] => text_mode[idx] = true,
            Err((_, e)) => return Err(Error::write(&path, e)),
        }
    }
}

/// Append `.xlsx` unless the path already carries it.
pub fn ensure_xlsx(path: &Path) -> PathBuf {
    let has_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
    if has_ext {
        path.to_path_buf()
    } else {
        let mut s = path.as_os_str().to_os_string();
        s.push(".xlsx");
        PathBuf::from(s)
    }
}

pub fn truncate_sheet_name(name: &str) -> String {
    name.chars().take(MAX_SHEET_NAME).collect()
}

fn build_workbook(
    path: &Path,
    sheets: &[(String, DataFrame)],
    text_mode: &[bool],
) -> std::result::Result<(), (Option<usize>, XlsxError)> {
    let mut workbook = Workbook::new();
    for (idx, (name, df)) in sheets.iter().enumerate() {
        let worksheet = workbook.add_worksheet();
        write_sheet(worksheet, name, df, text_mode[idx]).map_err(|e| (Some(idx), e))?;
    }
    workbook.save(path).map_err(|e| (None, e))
}

fn write_sheet(
    worksheet: &mut Worksheet,
    name: &str,
    df: &DataFrame,
    as_text: bool,
) -> std::result::Result<(), XlsxError> {
    worksheet.set_name(truncate_sheet_name(name))?;

    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    for (col_idx, column) in df.get_columns().iter().enumerate() {
        let col = col_idx as u16;
        worksheet.write_string_with_format(0, col, column.name().as_str(), &header_format)?;

        let series = column.as_materialized_series();
        for row_idx in 0..series.len() {
            let row = (row_idx + 1) as u32;
            let value = series
                .get(row_idx)
                .expect("row index within series length");
            if matches!(value, AnyValue::Null) {
                continue;
            }
            if as_text {
                worksheet.write_string(row, col, value.str_value().as_ref())?;
                continue;
            }
            match value {
                AnyValue::String(s) => {
                    worksheet.write_string(row, col, s)?;
                }
                AnyValue::StringOwned(s) => {
                    worksheet.write_string(row, col, s.as_str())?;
                }
                AnyValue::Boolean(b) => {
                    worksheet.write_boolean(row, col, b)?;
                }
                AnyValue::Int32(v) => {
                    worksheet.write_number(row, col, v as f64)?;
                }
                AnyValue::Int64(v) => {
                    worksheet.write_number(row, col, v as f64)?;
                }
                AnyValue::Float32(v) => {
                    worksheet.write_number(row, col, f64::from(v))?;
                }
                AnyValue::Float64(v) => {
                    worksheet.write_number(row, col, v)?;
                }
                AnyValue::Date(days) => {
                    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid date");
                    let date = epoch + chrono::Duration::days(i64::from(days));
                    worksheet.write_datetime_with_format(row, col, &date, &date_format)?;
                }
                AnyValue::Datetime(v, unit, _) => {
                    let micros = match unit {
                        TimeUnit::Nanoseconds => v / 1_000,
                        TimeUnit::Microseconds => v,
                        TimeUnit::Milliseconds => v * 1_000,
                    };
                    match DateTime::from_timestamp_micros(micros) {
                        Some(dt) => worksheet.write_datetime_with_format(
                            row,
                            col,
                            &dt.naive_utc(),
                            &datetime_format,
                        )?,
                        None => worksheet.write_string(row, col, value.str_value().as_ref())?,
                    };
                }
                other => {
                    worksheet.write_string(row, col, other.str_value().as_ref())?;
                }
            }
        }
    }
    Ok(())
}
