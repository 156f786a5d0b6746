//! Null-marker normalization and business-key completeness filtering.
//!
//! Extract files encode missing values with a zoo of marker tokens (`\N`,
//! `null`, empty string, ...). Everything downstream assumes those have been
//! collapsed to a real null before any join or cast happens.

use crate::error::Result;
use crate::frame::has_column;
use itertools::Itertools;
use polars::prelude::*;
use tracing::{info, warn};

/// Marker tokens treated as null in the raw extracts.
pub const NULL_MARKERS: [&str; 8] = ["\\N", "null", "NULL", "None", "", "N/A", "n/a", "NA"];

/// Replace null-marker tokens with real nulls in the selected columns
/// (default: all columns). Only string-typed columns can carry marker
/// tokens; other dtypes and absent columns are skipped. Returns a new
/// frame; the input is never mutated.
pub fn normalize_nulls(
    df: &DataFrame,
    columns: Option<&[&str]>,
    markers: Option<&[&str]>,
) -> Result<DataFrame> {
    let markers: Vec<&str> = markers.unwrap_or(&NULL_MARKERS).to_vec();
    if markers.is_empty() {
        return Ok(df.clone());
    }
    let selected: Vec<String> = match columns {
        Some(cols) => cols.iter().map(|c| c.to_string()).collect(),
        None => df.get_column_names().iter().map(|c| c.to_string()).collect(),
    };

    let schema = df.schema();
    let mut exprs = Vec::new();
    for name in &selected {
        match schema.get(name.as_str()) {
            Some(DataType::String) => {}
            _ => continue,
        }
        let mut is_marker = col(name.as_str()).eq(lit(markers[0]));
        for marker in &markers[1..] {
            is_marker = is_marker.or(col(name.as_str()).eq(lit(*marker)));
        }
        exprs.push(
            when(is_marker)
                .then(lit(NULL))
                .otherwise(col(name.as_str()))
                .alias(name.as_str()),
        );
    }

    if exprs.is_empty() {
        return Ok(df.clone());
    }
    Ok(df.clone().lazy().with_columns(exprs).collect()?)
}

/// Drop rows that are null in any of the named key columns.
///
/// Key columns that do not exist are skipped; if none exist this is a
/// recoverable configuration problem, so the frame is returned unchanged
/// with a warning rather than an error. The number of rows removed and the
/// columns responsible go to the log.
pub fn drop_rows_with_missing_keys(
    df: &DataFrame,
    key_columns: &[&str],
    stage: &str,
) -> Result<DataFrame> {
    let existing: Vec<&str> = key_columns
        .iter()
        .copied()
        .filter(|c| has_column(df, c))
        .collect();

    if existing.is_empty() {
        warn!(
            "{stage}: none of the key columns [{}] exist in the frame; no rows dropped",
            key_columns.iter().join(", ")
        );
        return Ok(df.clone());
    }

    let mut keep = col(existing[0]).is_not_null();
    for column in &existing[1..] {
        keep = keep.and(col(*column).is_not_null());
    }

    let initial_rows = df.height();
    let cleaned = df.clone().lazy().filter(keep).collect()?;
    let rows_dropped = initial_rows - cleaned.height();
    if rows_dropped > 0 {
        info!(
            "{stage}: dropped {rows_dropped} rows with null values in [{}]",
            existing.iter().join(", ")
        );
    }
    Ok(cleaned)
}
