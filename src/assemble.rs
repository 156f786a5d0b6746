//! Final fact assembly: canonical names, typed columns, duplicate removal
//! and the data-quality report.
//!
//! Nothing here raises for an unmapped key: resolution gaps are a quality
//! signal carried in the output and the log, not a failure.

use crate::error::Result;
use crate::frame::has_column;
use polars::prelude::*;
use tracing::{info, warn};

/// Rename measurement columns to their canonical target names, skipping
/// pairs whose source column is absent.
pub fn rename_existing(df: &DataFrame, renames: &[(&str, &str)]) -> Result<DataFrame> {
    let mut out = df.clone();
    for (from, to) in renames {
        if has_column(&out, from) {
            out.rename(from, to)?;
        }
    }
    Ok(out)
}

/// Select the canonical target columns, tolerating partially available
/// input: only the columns that actually exist are kept.
pub fn select_existing(df: &DataFrame, wanted: &[&str]) -> Result<DataFrame> {
    let existing: Vec<&str> = wanted.iter().copied().filter(|c| has_column(df, c)).collect();
    Ok(df.select(existing)?)
}

/// Coerce columns to the given dtype. Casts are non-strict: a value that
/// fails to parse becomes null rather than an error. Absent columns are
/// skipped.
pub fn coerce_columns(df: &DataFrame, columns: &[&str], dtype: DataType) -> Result<DataFrame> {
    let exprs: Vec<Expr> = columns
        .iter()
        .copied()
        .filter(|c| has_column(df, c))
        .map(|c| col(c).cast(dtype.clone()))
        .collect();
    if exprs.is_empty() {
        return Ok(df.clone());
    }
    Ok(df.clone().lazy().with_columns(exprs).collect()?)
}

/// Results-specific rule: a missing or unparseable final position means
/// "did not finish / no classified position" and is stored as 0. The zero
/// is a sentinel distinct from null: "known to be unclassified" rather
/// than "unknown".
pub fn fill_final_position(df: &DataFrame) -> Result<DataFrame> {
    if !has_column(df, "final_position") {
        return Ok(df.clone());
    }
    Ok(df
        .clone()
        .lazy()
        .with_column(
            col("final_position")
                .cast(DataType::Int64)
                .fill_null(lit(0))
                .alias("final_position"),
        )
        .collect()?)
}

/// The pipeline's data-quality report: per-surrogate-key null counts.
/// Unresolved keys are logged, never raised.
pub fn log_null_summary(df: &DataFrame, id_columns: &[&str], stage: &str) -> Result<()> {
    let mut unresolved = Vec::new();
    for column in id_columns {
        if !has_column(df, column) {
            continue;
        }
        let nulls = df.column(column)?.null_count();
        if nulls > 0 {
            unresolved.push((*column, nulls));
        }
    }
    if unresolved.is_empty() {
        info!("{stage}: all surrogate keys resolved");
    } else {
        for (column, nulls) in unresolved {
            warn!("{stage}: {nulls} rows with unresolved {column}");
        }
    }
    Ok(())
}
