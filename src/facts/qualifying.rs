//! Qualifying fact pipeline.

use crate::assemble::{coerce_columns, log_null_summary, select_existing};
use crate::cleaning::{drop_rows_with_missing_keys, normalize_nulls};
use crate::error::Result;
use crate::frame::dedupe;
use crate::keys::{
    attach, constructor_names, driver_keys, race_circuit_names, race_keys, ReferenceExtracts,
};
use crate::resolve::{resolve_exact, resolve_text, DimensionSnapshots};
use polars::prelude::*;
use tracing::info;

const STAGE: &str = "qualifying";

pub const QUALIFYING_COLUMNS: [&str; 7] =
    ["circuit_id", "constructor_id", "race_id", "driver_id", "q1", "q2", "q3"];

const ID_COLUMNS: [&str; 4] = ["driver_id", "constructor_id", "race_id", "circuit_id"];

/// Resolve a qualifying extract to
/// `{circuit_id, constructor_id, race_id, driver_id, q1, q2, q3}`.
pub fn prepare_qualifying_data(
    qualifying: &DataFrame,
    refs: &ReferenceExtracts,
    dims: &DimensionSnapshots,
) -> Result<DataFrame> {
    info!("{STAGE}: resolving business keys for {} rows", qualifying.height());
    let df = normalize_nulls(qualifying, None, None)?;

    // attach natural keys by source reference ids, then discard the ids
    let df = attach(&df, &driver_keys(&refs.drivers)?, &["driverId"])?;
    let df = attach(&df, &constructor_names(&refs.constructors)?, &["constructorId"])?;
    let df = attach(&df, &race_keys(&refs.races)?, &["raceId"])?;
    let df = attach(&df, &race_circuit_names(&refs.races, &refs.circuits)?, &["raceId"])?;
    let df = df.drop_many(&["driverId", "constructorId", "raceId"]);

    let df = drop_rows_with_missing_keys(&df, &["circuit_name"], STAGE)?;

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

    let df = select_existing(&df, &QUALIFYING_COLUMNS)?;
    let df = coerce_columns(&df, &ID_COLUMNS, DataType::Int64)?;
    log_null_summary(&df, &ID_COLUMNS, STAGE)?;
    dedupe(&df)
}
