//! Dimension resolution: natural keys in, surrogate keys out.
//!
//! Both entry points are left joins by contract. An inner join would
//! silently drop unmatched fact rows and corrupt the data-quality signal,
//! so every input row survives resolution; unmatched rows carry a null
//! surrogate key and are reported by the assembler's null summary.

use crate::error::Result;
use crate::frame::require_columns;
use itertools::Itertools;
use polars::prelude::*;
use tracing::warn;

/// Read-only copies of the dimension tables for one pipeline run, each
/// carrying the surrogate key plus its natural-key columns.
pub struct DimensionSnapshots {
    pub driver: DataFrame,
    pub constructor: DataFrame,
    pub race: DataFrame,
    pub circuit: DataFrame,
    pub status: DataFrame,
}

/// Within a snapshot the natural key must be unique; duplicates make
/// resolution ambiguous. The resolver only surfaces the problem; it never
/// picks a winner or deduplicates on the dimension's behalf.
fn warn_on_duplicate_keys(dim: &DataFrame, key_columns: &[&str], id_column: &str) -> Result<()> {
    let subset: Vec<String> = key_columns.iter().map(|c| c.to_string()).collect();
    let unique_rows = dim
        .clone()
        .lazy()
        .unique_stable(Some(subset), UniqueKeepStrategy::First)
        .collect()?
        .height();
    if unique_rows < dim.height() {
        warn!(
            "dimension '{id_column}': natural key [{}] is not unique ({} rows, {} distinct keys); \
             resolution is ambiguous for the duplicated keys",
            key_columns.iter().join(", "),
            dim.height(),
            unique_rows
        );
    }
    Ok(())
}

/// Resolve a surrogate key by exact typed equality on the natural key.
///
/// Left-joins the fact to the dimension snapshot on `key_columns`, attaches
/// `id_column`, and removes the natural-key columns, which are spent once
/// resolved. Key dtypes are aligned to the dimension side first so that a
/// date stored as text on one side still compares as a calendar date.
pub fn resolve_exact(
    fact: &DataFrame,
    dim: &DataFrame,
    key_columns: &[&str],
    id_column: &str,
) -> Result<DataFrame> {
    require_columns(fact, key_columns, "fact frame")?;
    require_columns(dim, key_columns, "dimension snapshot")?;
    require_columns(dim, &[id_column], "dimension snapshot")?;

    let mut selection: Vec<Expr> = vec![col(id_column)];
    selection.extend(key_columns.iter().map(|c| col(*c)));
    let dim_proj = dim.clone().lazy().select(selection).collect()?;
    warn_on_duplicate_keys(&dim_proj, key_columns, id_column)?;

    let fact_schema = fact.schema();
    let dim_schema = dim_proj.schema();
    let mut fact_lf = fact.clone().lazy();
    for key in key_columns {
        let fact_dtype = fact_schema.get(key);
        let dim_dtype = dim_schema.get(key);
        if fact_dtype != dim_dtype {
            if let Some(target) = dim_dtype {
                fact_lf = fact_lf.with_column(col(*key).cast(target.clone()));
            }
        }
    }

    let on_exprs: Vec<Expr> = key_columns.iter().map(|c| col(*c)).collect();
    let joined = fact_lf
        .join(
            dim_proj.lazy(),
            on_exprs.clone(),
            on_exprs,
            JoinArgs::new(JoinType::Left),
        )
        .collect()?;
    Ok(joined.drop_many(key_columns))
}

/// Resolve a surrogate key on a free-text natural key, matching
/// case/whitespace-insensitively (trim + lowercase) on both sides.
///
/// The normalized join column lives on derived copies only: neither the
/// fact frame nor the shared dimension snapshot is mutated, so reusing the
/// same snapshot across pipelines cannot leak helper columns between runs.
pub fn resolve_text(
    fact: &DataFrame,
    dim: &DataFrame,
    fact_column: &str,
    dim_column: &str,
    id_column: &str,
) -> Result<DataFrame> {
    require_columns(fact, &[fact_column], "fact frame")?;
    require_columns(dim, &[dim_column, id_column], "dimension snapshot")?;

    let match_column = format!("{dim_column}_norm");
    let normalized = |source: &str| {
        col(source)
            .cast(DataType::String)
            .str()
            .strip_chars(lit(NULL))
            .str()
            .to_lowercase()
    };

    let dim_proj = dim
        .clone()
        .lazy()
        .select([col(id_column), normalized(dim_column).alias(&match_column)])
        .collect()?;
    warn_on_duplicate_keys(&dim_proj, &[match_column.as_str()], id_column)?;

    let joined = fact
        .clone()
        .lazy()
        .with_column(normalized(fact_column).alias(&match_column))
        .join(
            dim_proj.lazy(),
            [col(&match_column)],
            [col(&match_column)],
            JoinArgs::new(JoinType::Left),
        )
        .collect()?;
    Ok(joined.drop_many(&[fact_column, match_column.as_str()]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_dim() -> DataFrame {
        df![
            "driver_id" => &[1i64, 2],
            "driver_name" => &["Lewis", "Max"],
            "driver_surname" => &["Hamilton", "Verstappen"],
        ]
        .unwrap()
    }

    #[test]
    fn test_exact_match_attaches_surrogate_key() {
        let fact = df![
            "driver_name" => &["Lewis"],
            "driver_surname" => &["Hamilton"],
            "laps" => &[53],
        ]
        .unwrap();

        let out = resolve_exact(&fact, &driver_dim(), &["driver_name", "driver_surname"], "driver_id").unwrap();
        assert_eq!(out.column("driver_id").unwrap().i64().unwrap().get(0), Some(1));
        // natural-key columns are removed once resolved
        assert!(!out.get_column_names().contains(&"driver_name"));
        assert!(!out.get_column_names().contains(&"driver_surname"));
        assert!(out.get_column_names().contains(&"laps"));
    }

    #[test]
    fn test_left_join_preserves_unmatched_rows() {
        let fact = df![
            "driver_name" => &["Lewis", "Fernando"],
            "driver_surname" => &["Hamilton", "Alonso"],
        ]
        .unwrap();

        let out = resolve_exact(&fact, &driver_dim(), &["driver_name", "driver_surname"], "driver_id").unwrap();
        assert_eq!(out.height(), 2);
        assert_eq!(out.column("driver_id").unwrap().null_count(), 1);
    }

    #[test]
    fn test_key_dtypes_align_to_dimension_side() {
        // year arrives as text on the fact side, typed on the dimension side
        let fact = df!["year" => &["2021"], "race_name" => &["Italian Grand Prix"]].unwrap();
        let dim = df![
            "race_id" => &[7i64],
            "year" => &[2021i64],
            "race_name" => &["Italian Grand Prix"],
        ]
        .unwrap();

        let out = resolve_exact(&fact, &dim, &["year", "race_name"], "race_id").unwrap();
        assert_eq!(out.column("race_id").unwrap().i64().unwrap().get(0), Some(7));
    }

    #[test]
    fn test_duplicate_natural_key_warns_but_does_not_dedupe() {
        // two dimension rows carry the same natural key; resolution succeeds
        // and the ambiguity surfaces as multiplied rows, not as an error or
        // a silently picked winner
        let fact = df![
            "driver_name" => &["Lewis", "Max"],
            "driver_surname" => &["Hamilton", "Verstappen"],
        ]
        .unwrap();
        let dim = df![
            "driver_id" => &[1i64, 9, 2],
            "driver_name" => &["Lewis", "Lewis", "Max"],
            "driver_surname" => &["Hamilton", "Hamilton", "Verstappen"],
        ]
        .unwrap();

        let out = resolve_exact(&fact, &dim, &["driver_name", "driver_surname"], "driver_id").unwrap();
        assert_eq!(out.height(), 3);
        assert_eq!(out.column("driver_id").unwrap().null_count(), 0);
    }

    #[test]
    fn test_duplicate_text_key_multiplies_matches() {
        let fact = df!["circuit_name" => &["Monza"]].unwrap();
        let dim = df![
            "circuit_id" => &[31i64, 77],
            "circuit_name" => &["Monza", "MONZA"],
        ]
        .unwrap();

        let out = resolve_text(&fact, &dim, "circuit_name", "circuit_name", "circuit_id").unwrap();
        assert_eq!(out.height(), 2);
        assert_eq!(out.column("circuit_id").unwrap().null_count(), 0);
    }

    #[test]
    fn test_text_resolution_ignores_case_and_whitespace() {
        let fact = df!["circuit_name" => &["  MONZA ", "monaco", "Spa"]].unwrap();
        let dim = df![
            "circuit_id" => &[31i64, 32],
            "circuit_name" => &["Monza", "Monaco"],
        ]
        .unwrap();

        let out = resolve_text(&fact, &dim, "circuit_name", "circuit_name", "circuit_id").unwrap();
        let ids = out.column("circuit_id").unwrap();
        assert_eq!(ids.i64().unwrap().get(0), Some(31));
        assert_eq!(ids.i64().unwrap().get(1), Some(32));
        assert_eq!(ids.null_count(), 1);
        assert!(!out.get_column_names().contains(&"circuit_name"));
        assert!(!out.get_column_names().contains(&"circuit_name_norm"));
    }

    #[test]
    fn test_snapshot_is_not_mutated_by_text_resolution() {
        let fact = df!["status" => &["Finished"]].unwrap();
        let dim = df![
            "status_id" => &[41i64],
            "status" => &["Finished"],
        ]
        .unwrap();
        let dim_before = dim.clone();

        resolve_text(&fact, &dim, "status", "status", "status_id").unwrap();
        assert!(dim.equals_missing(&dim_before));
    }
}
