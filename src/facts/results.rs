//! Race-results fact pipeline.
//!
//! Resolves all five dimensions. Surrogate keys in the output are
//! float-typed nullable columns, and `final_position` is never null: a
//! missing or unparseable position is stored as the sentinel 0
//! ("unclassified"), distinct from the null that marks an unresolved key.

use crate::assemble::{
    coerce_columns, fill_final_position, log_null_summary, rename_existing, select_existing,
};
use crate::cleaning::{drop_rows_with_missing_keys, normalize_nulls};
use crate::error::Result;
use crate::frame::dedupe;
use crate::keys::{
    attach, constructor_names, driver_keys, race_circuit_names, race_keys, status_texts,
    ReferenceExtracts,
};
use crate::resolve::{resolve_exact, resolve_text, DimensionSnapshots};
use polars::prelude::*;
use tracing::info;

const STAGE: &str = "results";

pub const RESULT_COLUMNS: [&str; 11] = [
    "circuit_id",
    "constructor_id",
    "race_id",
    "driver_id",
    "status_id",
    "car_number",
    "starting_position",
    "final_position",
    "position_order",
    "points",
    "laps",
];

const ID_COLUMNS: [&str; 5] = ["circuit_id", "constructor_id", "race_id", "driver_id", "status_id"];

/// Resolve a results extract to `{circuit_id, constructor_id, race_id,
/// driver_id, status_id, car_number, starting_position, final_position,
/// position_order, points, laps}`.
pub fn prepare_results_data(
    results: &DataFrame,
    refs: &ReferenceExtracts,
    dims: &DimensionSnapshots,
) -> Result<DataFrame> {
    info!("{STAGE}: resolving business keys for {} rows", results.height());
    let df = normalize_nulls(results, None, None)?;

    let df = attach(&df, &driver_keys(&refs.drivers)?, &["driverId"])?;
    let df = attach(&df, &constructor_names(&refs.constructors)?, &["constructorId"])?;
    let df = attach(&df, &race_keys(&refs.races)?, &["raceId"])?;
    let df = attach(&df, &race_circuit_names(&refs.races, &refs.circuits)?, &["raceId"])?;
    let df = attach(&df, &status_texts(&refs.status)?, &["statusId"])?;
    let df = df.drop_many(&["driverId", "constructorId", "raceId", "statusId"]);

    let df = drop_rows_with_missing_keys(&df, &["circuit_name", "status"], STAGE)?;

    info!("{STAGE}: mapping surrogate keys");
    let df = resolve_exact(
        &df,
        &dims.driver,
        &["driver_name", "driver_surname", "date_of_birth"],
        "driver_id",
    )?;
    let df = resolve_exact(&df, &dims.constructor, &["constructor_name"], "constructor_id")?;
    let df = resolve_exact(&df, &dims.race, &["year", "race_name"], "race_id")?;
    let df = resolve_text(&df, &dims.circuit, "circuit_name", "circuit_name", "circuit_id")?;
    let df = resolve_text(&df, &dims.status, "status", "status", "status_id")?;

    let df = coerce_columns(&df, &["number", "grid", "positionOrder", "laps"], DataType::Int64)?;
    let df = coerce_columns(&df, &["points"], DataType::Float64)?;
    let df = rename_existing(
        &df,
        &[
            ("number", "car_number"),
            ("grid", "starting_position"),
            ("position", "final_position"),
            ("positionOrder", "position_order"),
        ],
    )?;
    let df = select_existing(&df, &RESULT_COLUMNS)?;
    let df = fill_final_position(&df)?;
    let df = coerce_columns(&df, &ID_COLUMNS, DataType::Float64)?;
    log_null_summary(&df, &ID_COLUMNS, STAGE)?;
    dedupe(&df)
}
