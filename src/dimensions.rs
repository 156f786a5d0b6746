//! Dimension table preparation: rename, clean, deduplicate.
//!
//! These feed the dimension load step; surrogate keys are assigned by the
//! store when the rows land, never here. There is no cross-table resolution
//! in this module.

use crate::cleaning::normalize_nulls;
use crate::error::Result;
use crate::frame::{dedupe, require_columns};
use polars::prelude::*;
use tracing::{info, warn};

fn date_options() -> StrptimeOptions {
    StrptimeOptions {
        format: Some("%Y-%m-%d".into()),
        strict: false,
        ..Default::default()
    }
}

/// `{driver_name, driver_surname, date_of_birth, driver_nationality}`
pub fn prepare_driver_data(drivers: &DataFrame) -> Result<DataFrame> {
    require_columns(drivers, &["forename", "surname", "dob", "nationality"], "drivers extract")?;
    let drivers = normalize_nulls(drivers, None, None)?;
    let out = drivers
        .lazy()
        .select([
            col("forename").alias("driver_name"),
            col("surname").alias("driver_surname"),
            col("dob").str().to_date(date_options()).alias("date_of_birth"),
            col("nationality").alias("driver_nationality"),
        ])
        .collect()?;
    dedupe(&out)
}

/// `{constructor_name, constructor_nationality}`
pub fn prepare_constructor_data(constructors: &DataFrame) -> Result<DataFrame> {
    require_columns(constructors, &["name", "nationality"], "constructors extract")?;
    let out = constructors
        .clone()
        .lazy()
        .select([
            col("name").alias("constructor_name"),
            col("nationality").alias("constructor_nationality"),
        ])
        .collect()?;
    dedupe(&out)
}

/// Parse the race date and add `race_year`/`race_month`/`race_day`
/// columns. A date that fails to parse yields nulls in all three; the
/// count of failures goes to the log. A missing date column is a fatal
/// structural error.
pub fn expand_race_date(races: &DataFrame, date_column: &str) -> Result<DataFrame> {
    require_columns(races, &[date_column], "races extract")?;
    let races = normalize_nulls(races, Some(&[date_column]), None)?;

    let parsed = match races.schema().get(date_column) {
        Some(DataType::String) => col(date_column).str().to_date(date_options()),
        _ => col(date_column).cast(DataType::Date),
    };
    let out = races
        .lazy()
        .with_columns([
            parsed.clone().alias("race_date"),
            parsed.clone().dt().year().cast(DataType::Int64).alias("race_year"),
            parsed.clone().dt().month().cast(DataType::Int64).alias("race_month"),
            parsed.dt().day().cast(DataType::Int64).alias("race_day"),
        ])
        .collect()?;

    let total = out.height();
    let invalid = out.column("race_date")?.null_count();
    if invalid > 0 {
        warn!("races: {invalid}/{total} race dates failed to parse");
    } else {
        info!("races: all {total} race dates parsed");
    }
    Ok(out)
}

/// `{year, month, day, race_name}`. Expects a frame that went through
/// [`expand_race_date`] first.
pub fn prepare_race_data(races: &DataFrame) -> Result<DataFrame> {
    require_columns(races, &["race_year", "race_month", "race_day", "name"], "races extract")?;
    let out = races
        .clone()
        .lazy()
        .select([
            col("race_year").alias("year"),
            col("race_month").alias("month"),
            col("race_day").alias("day"),
            col("name").alias("race_name"),
        ])
        .collect()?;
    dedupe(&out)
}

/// `{circuit_name, circuit_location, circuit_country, latitude, longitude, altitude}`
pub fn prepare_circuit_data(circuits: &DataFrame) -> Result<DataFrame> {
    require_columns(
        circuits,
        &["name", "location", "country", "lat", "lng", "alt"],
        "circuits extract",
    )?;
    let circuits = normalize_nulls(circuits, None, None)?;
    let out = circuits
        .lazy()
        .select([
            col("name").alias("circuit_name"),
            col("location").alias("circuit_location"),
            col("country").alias("circuit_country"),
            col("lat").cast(DataType::Float64).alias("latitude"),
            col("lng").cast(DataType::Float64).alias("longitude"),
            col("alt").cast(DataType::Float64).alias("altitude"),
        ])
        .collect()?;
    dedupe(&out)
}

/// `{status}`
pub fn prepare_status_data(status: &DataFrame) -> Result<DataFrame> {
    require_columns(status, &["status"], "status extract")?;
    let status = normalize_nulls(status, None, None)?;
    let out = status.lazy().select([col("status")]).collect()?;
    dedupe(&out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;

    #[test]
    fn test_prepare_driver_data_deduplicates() {
        let drivers = df![
            "driverId" => &[1, 2, 3],
            "forename" => &["Lewis", "Lewis", "Max"],
            "surname" => &["Hamilton", "Hamilton", "Verstappen"],
            "dob" => &["1985-01-07", "1985-01-07", "1997-09-30"],
            "nationality" => &["British", "British", "Dutch"],
        ]
        .unwrap();

        let out = prepare_driver_data(&drivers).unwrap();
        assert_eq!(out.height(), 2);
        assert_eq!(
            out.get_column_names(),
            &["driver_name", "driver_surname", "date_of_birth", "driver_nationality"]
        );
        assert_eq!(out.column("date_of_birth").unwrap().dtype(), &DataType::Date);
    }

    #[test]
    fn test_expand_race_date() {
        let races = df![
            "raceId" => &[100, 101, 102],
            "name" => &["Italian Grand Prix", "Monaco Grand Prix", "?"],
            "date" => &["2021-09-12", "\\N", "2021-05-23"],
        ]
        .unwrap();

        let out = expand_race_date(&races, "date").unwrap();
        assert_eq!(out.column("race_year").unwrap().i64().unwrap().get(0), Some(2021));
        assert_eq!(out.column("race_month").unwrap().i64().unwrap().get(0), Some(9));
        assert_eq!(out.column("race_day").unwrap().i64().unwrap().get(2), Some(23));
        // null-marker date coerces to null, row retained
        assert_eq!(out.column("race_year").unwrap().null_count(), 1);
        assert_eq!(out.height(), 3);
    }

    #[test]
    fn test_expand_race_date_missing_column_is_fatal() {
        let races = df!["raceId" => &[1]].unwrap();
        let err = expand_race_date(&races, "date").unwrap_err();
        assert!(matches!(err, EtlError::MissingColumn { .. }));
    }

    #[test]
    fn test_prepare_circuit_data_coerces_altitude() {
        let circuits = df![
            "name" => &["Monza", "Monaco"],
            "location" => &["Monza", "Monte-Carlo"],
            "country" => &["Italy", "Monaco"],
            "lat" => &[45.6156, 43.7347],
            "lng" => &[9.28111, 7.42056],
            "alt" => &["162", "\\N"],
        ]
        .unwrap();

        let out = prepare_circuit_data(&circuits).unwrap();
        let alt = out.column("altitude").unwrap().f64().unwrap();
        assert_eq!(alt.get(0), Some(162.0));
        assert_eq!(alt.get(1), None);
    }

    #[test]
    fn test_prepare_status_data() {
        let status = df![
            "statusId" => &[1, 2, 3],
            "status" => &["Finished", "Finished", "Engine"],
        ]
        .unwrap();

        let out = prepare_status_data(&status).unwrap();
        assert_eq!(out.height(), 2);
        assert_eq!(out.get_column_names(), &["status"]);
    }
}
