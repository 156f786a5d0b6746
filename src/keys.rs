//! Natural-key projection.
//!
//! Fact extracts reference their dimensions by the source's own id columns
//! (`driverId`, `raceId`, ...). Those ids mean nothing to the warehouse; the
//! business keys do. This module derives, per entity, the natural-key
//! columns a fact needs in order to join against a dimension snapshot:
//! driver = forename + surname + date of birth, race = year + name, circuit
//! and status = display text. Projections are derived, immutable frames;
//! the reference extracts are never mutated.

use crate::error::Result;
use crate::frame::require_columns;
use polars::prelude::*;

/// Auxiliary extracts used purely to resolve natural-key indirections.
///
/// The results extract is part of the bundle because pit stops carry no
/// constructor reference of their own; it has to be recovered through
/// results on (race, driver). Making that an explicit collaborator keeps
/// the dependency visible at the call site.
pub struct ReferenceExtracts {
    pub drivers: DataFrame,
    pub constructors: DataFrame,
    pub races: DataFrame,
    pub circuits: DataFrame,
    pub status: DataFrame,
    pub results: DataFrame,
}

/// Parse a column to a calendar date when it arrives as text; pass dates
/// through. Unparsable values become null and later fail the completeness
/// filter where the date is a required key.
fn date_expr(df: &DataFrame, name: &str) -> Expr {
    match df.schema().get(name) {
        Some(DataType::String) => col(name).str().to_date(StrptimeOptions {
            format: Some("%Y-%m-%d".into()),
            strict: false,
            ..Default::default()
        }),
        _ => col(name).cast(DataType::Date),
    }
}

/// `{driverId, driver_name, driver_surname, date_of_birth}`
pub fn driver_keys(drivers: &DataFrame) -> Result<DataFrame> {
    require_columns(drivers, &["driverId", "forename", "surname", "dob"], "drivers extract")?;
    Ok(drivers
        .clone()
        .lazy()
        .select([
            col("driverId"),
            col("forename").alias("driver_name"),
            col("surname").alias("driver_surname"),
            date_expr(drivers, "dob").alias("date_of_birth"),
        ])
        .collect()?)
}

/// `{constructorId, constructor_name}`
pub fn constructor_names(constructors: &DataFrame) -> Result<DataFrame> {
    require_columns(constructors, &["constructorId", "name"], "constructors extract")?;
    Ok(constructors
        .clone()
        .lazy()
        .select([col("constructorId"), col("name").alias("constructor_name")])
        .collect()?)
}

/// `{raceId, year, race_name}`
pub fn race_keys(races: &DataFrame) -> Result<DataFrame> {
    require_columns(races, &["raceId", "year", "name"], "races extract")?;
    Ok(races
        .clone()
        .lazy()
        .select([
            col("raceId"),
            col("year").cast(DataType::Int64),
            col("name").alias("race_name"),
        ])
        .collect()?)
}

/// `{raceId, circuit_name}`. The circuit key is not on the fact at all; it
/// is reached by joining races to circuits on the source circuit reference.
pub fn race_circuit_names(races: &DataFrame, circuits: &DataFrame) -> Result<DataFrame> {
    require_columns(races, &["raceId", "circuitId"], "races extract")?;
    require_columns(circuits, &["circuitId", "name"], "circuits extract")?;
    Ok(races
        .clone()
        .lazy()
        .select([col("raceId"), col("circuitId")])
        .join(
            circuits
                .clone()
                .lazy()
                .select([col("circuitId"), col("name").alias("circuit_name")]),
            [col("circuitId")],
            [col("circuitId")],
            JoinArgs::new(JoinType::Left),
        )
        .select([col("raceId"), col("circuit_name")])
        .collect()?)
}

/// `{statusId, status}`
pub fn status_texts(status: &DataFrame) -> Result<DataFrame> {
    require_columns(status, &["statusId", "status"], "status extract")?;
    Ok(status
        .clone()
        .lazy()
        .select([col("statusId"), col("status")])
        .collect()?)
}

/// `{raceId, driverId, constructorId}` recovered from the results extract,
/// deduplicated to one constructor per (race, driver).
pub fn race_driver_constructors(results: &DataFrame) -> Result<DataFrame> {
    require_columns(results, &["raceId", "driverId", "constructorId"], "results extract")?;
    Ok(results
        .clone()
        .lazy()
        .select([col("raceId"), col("driverId"), col("constructorId")])
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?)
}

/// Left-join a natural-key projection onto a fact frame by the source
/// reference id(s). Every fact row is preserved.
pub fn attach(fact: &DataFrame, projection: &DataFrame, on: &[&str]) -> Result<DataFrame> {
    require_columns(fact, on, "fact frame")?;
    require_columns(projection, on, "key projection")?;
    let on_exprs: Vec<Expr> = on.iter().map(|c| col(*c)).collect();
    Ok(fact
        .clone()
        .lazy()
        .join(
            projection.clone().lazy(),
            on_exprs.clone(),
            on_exprs,
            JoinArgs::new(JoinType::Left),
        )
        .collect()?)
}
