//! Pit-stop fact pipeline.
//!
//! The pit-stop extract carries no constructor reference of its own; the
//! constructor is recovered through the results extract on (race, driver)
//! before it can be resolved. Rows whose keys fail to resolve are retained
//! with null surrogate keys; pit stops have no completeness drop, only the
//! null-count report.

use crate::assemble::{coerce_columns, log_null_summary, rename_existing, select_existing};
use crate::cleaning::normalize_nulls;
use crate::error::Result;
use crate::frame::dedupe;
use crate::keys::{
    attach, constructor_names, driver_keys, race_driver_constructors, race_keys, ReferenceExtracts,
};
use crate::resolve::{resolve_exact, DimensionSnapshots};
use polars::prelude::*;
use tracing::info;

const STAGE: &str = "pit_stops";

pub const PIT_STOP_COLUMNS: [&str; 7] = [
    "constructor_id",
    "race_id",
    "driver_id",
    "stop_number",
    "lap_number",
    "stop_time",
    "stop_duration",
];

const ID_COLUMNS: [&str; 3] = ["driver_id", "constructor_id", "race_id"];

/// Resolve a pit-stop extract to `{constructor_id, race_id, driver_id,
/// stop_number, lap_number, stop_time, stop_duration}`.
pub fn prepare_pit_stops_data(
    pit_stops: &DataFrame,
    refs: &ReferenceExtracts,
    dims: &DimensionSnapshots,
) -> Result<DataFrame> {
    info!("{STAGE}: resolving business keys for {} rows", pit_stops.height());
    let df = normalize_nulls(pit_stops, None, None)?;

    let df = attach(&df, &driver_keys(&refs.drivers)?, &["driverId"])?;
    let df = attach(&df, &race_keys(&refs.races)?, &["raceId"])?;
    // recover the constructor reference through results, then map it to its name
    let df = attach(&df, &race_driver_constructors(&refs.results)?, &["raceId", "driverId"])?;
    let df = attach(&df, &constructor_names(&refs.constructors)?, &["constructorId"])?;
    let df = df.drop_many(&["driverId", "raceId", "constructorId"]);

    info!("{STAGE}: mapping surrogate keys");
    let df = resolve_exact(
        &df,
        &dims.driver,
        &["driver_name", "driver_surname", "date_of_birth"],
        "driver_id",
    )?;
    let df = resolve_exact(&df, &dims.race, &["year", "race_name"], "race_id")?;
    let df = resolve_exact(&df, &dims.constructor, &["constructor_name"], "constructor_id")?;

    let df = rename_existing(
        &df,
        &[
            ("stop", "stop_number"),
            ("lap", "lap_number"),
            ("time", "stop_time"),
            ("milliseconds", "stop_duration"),
        ],
    )?;
    let df = select_existing(&df, &PIT_STOP_COLUMNS)?;
    let df = coerce_columns(&df, &ID_COLUMNS, DataType::Int64)?;
    let df = coerce_columns(
        &df,
        &["stop_number", "lap_number", "stop_duration"],
        DataType::Int64,
    )?;
    log_null_summary(&df, &ID_COLUMNS, STAGE)?;
    dedupe(&df)
}
