//! Small DataFrame helpers shared by the pipeline stages.

use crate::error::{EtlError, Result};
use polars::prelude::*;

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| *c == name)
}

/// Fail fast when a transform's column contract cannot be expressed.
pub fn require_columns(df: &DataFrame, columns: &[&str], frame: &str) -> Result<()> {
    for column in columns {
        if !has_column(df, column) {
            return Err(EtlError::MissingColumn {
                column: (*column).to_string(),
                frame: frame.to_string(),
            });
        }
    }
    Ok(())
}

/// Remove exact-duplicate rows, keeping first occurrence in input order.
pub fn dedupe(df: &DataFrame) -> Result<DataFrame> {
    Ok(df
        .clone()
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?)
}
