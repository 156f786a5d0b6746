use gridstar::facts::prepare_results_data;
use gridstar::facts::results::RESULT_COLUMNS;
use gridstar::keys::ReferenceExtracts;
use gridstar::resolve::DimensionSnapshots;
use polars::prelude::*;

// circuit names carry stray whitespace and status text arrives upper-cased;
// both must still match their dimension rows after normalization
fn reference_extracts() -> ReferenceExtracts {
    ReferenceExtracts {
        drivers: df![
            "driverId" => &[1, 2],
            "forename" => &["Lewis", "Max"],
            "surname" => &["Hamilton", "Verstappen"],
            "dob" => &["1985-01-07", "1997-09-30"],
        ]
        .unwrap(),
        constructors: df![
            "constructorId" => &[10, 20],
            "name" => &["Mercedes", "Red Bull"],
        ]
        .unwrap(),
        races: df![
            "raceId" => &[100],
            "year" => &[2021],
            "name" => &["Italian Grand Prix"],
            "circuitId" => &[5],
            "date" => &["2021-09-12"],
        ]
        .unwrap(),
        circuits: df![
            "circuitId" => &[5],
            "name" => &["  Monza "],
        ]
        .unwrap(),
        status: df![
            "statusId" => &[1, 2],
            "status" => &["FINISHED", "Engine"],
        ]
        .unwrap(),
        results: df![
            "raceId" => &[100],
            "driverId" => &[1],
            "constructorId" => &[10],
        ]
        .unwrap(),
    }
}

fn dimension_snapshots() -> DimensionSnapshots {
    let driver = df![
        "driver_id" => &[1i64, 2],
        "driver_name" => &["Lewis", "Max"],
        "driver_surname" => &["Hamilton", "Verstappen"],
        "date_of_birth" => &["1985-01-07", "1997-09-30"],
    ]
    .unwrap()
    .lazy()
    .with_column(col("date_of_birth").str().to_date(StrptimeOptions {
        format: Some("%Y-%m-%d".into()),
        strict: false,
        ..Default::default()
    }))
    .collect()
    .unwrap();

    DimensionSnapshots {
        driver,
        constructor: df![
            "constructor_id" => &[11i64, 21],
            "constructor_name" => &["Mercedes", "Red Bull"],
        ]
        .unwrap(),
        race: df![
            "race_id" => &[201i64],
            "year" => &[2021i64],
            "race_name" => &["Italian Grand Prix"],
        ]
        .unwrap(),
        circuit: df![
            "circuit_id" => &[31i64],
            "circuit_name" => &["Monza"],
        ]
        .unwrap(),
        status: df![
            "status_id" => &[41i64, 42],
            "status" => &["Finished", "Engine"],
        ]
        .unwrap(),
    }
}

#[test]
fn test_results_full_resolution() {
    // rows 1 and 2 are exact duplicates; row 3 is a retired car with an
    // unclassified position; row 4 references an unknown race and is
    // dropped by the completeness filter (null circuit and status keys)
    let results = df![
        "resultId" => &[1, 2, 3, 4],
        "raceId" => &[100, 100, 100, 999],
        "driverId" => &[1, 1, 2, 2],
        "constructorId" => &[10, 10, 20, 20],
        "number" => &["44", "44", "33", "33"],
        "grid" => &[1, 1, 2, 2],
        "position" => &["1", "1", "\\N", "\\N"],
        "positionOrder" => &[1, 1, 19, 19],
        "points" => &[25.0, 25.0, 0.0, 0.0],
        "laps" => &[53, 53, 23, 23],
        "statusId" => &[1, 1, 2, 2],
    ]
    .unwrap();

    let out =
        prepare_results_data(&results, &reference_extracts(), &dimension_snapshots()).unwrap();

    // 4 input rows - 1 dropped - 1 duplicate
    assert_eq!(out.height(), 2);
    assert_eq!(out.get_column_names(), &RESULT_COLUMNS);

    // surrogate keys are float-typed on the results fact
    let driver_id = out.column("driver_id").unwrap();
    assert_eq!(driver_id.dtype(), &DataType::Float64);
    assert_eq!(driver_id.f64().unwrap().get(0), Some(1.0));
    assert_eq!(out.column("circuit_id").unwrap().f64().unwrap().get(0), Some(31.0));
    assert_eq!(out.column("status_id").unwrap().f64().unwrap().get(0), Some(41.0));
    assert_eq!(out.column("status_id").unwrap().f64().unwrap().get(1), Some(42.0));
}

#[test]
fn test_final_position_is_never_null() {
    let results = df![
        "resultId" => &[1, 2],
        "raceId" => &[100, 100],
        "driverId" => &[1, 2],
        "constructorId" => &[10, 20],
        "number" => &["44", "33"],
        "grid" => &[1, 2],
        "position" => &["1", "\\N"],
        "positionOrder" => &[1, 19],
        "points" => &[25.0, 0.0],
        "laps" => &[53, 23],
        "statusId" => &[1, 2],
    ]
    .unwrap();

    let out =
        prepare_results_data(&results, &reference_extracts(), &dimension_snapshots()).unwrap();

    let positions = out.column("final_position").unwrap();
    assert_eq!(positions.null_count(), 0);
    assert_eq!(positions.i64().unwrap().get(0), Some(1));
    // unclassified position is the sentinel 0, not null
    assert_eq!(positions.i64().unwrap().get(1), Some(0));
}

#[test]
fn test_results_circuit_and_status_match_insensitively() {
    // extract circuit name has stray whitespace, status text is upper-cased;
    // dimension rows are clean mixed case
    let results = df![
        "resultId" => &[1],
        "raceId" => &[100],
        "driverId" => &[1],
        "constructorId" => &[10],
        "number" => &["44"],
        "grid" => &[1],
        "position" => &["1"],
        "positionOrder" => &[1],
        "points" => &[25.0],
        "laps" => &[53],
        "statusId" => &[1],
    ]
    .unwrap();

    let out =
        prepare_results_data(&results, &reference_extracts(), &dimension_snapshots()).unwrap();

    assert_eq!(out.height(), 1);
    assert_eq!(out.column("circuit_id").unwrap().f64().unwrap().get(0), Some(31.0));
    assert_eq!(out.column("status_id").unwrap().f64().unwrap().get(0), Some(41.0));
}

#[test]
fn test_results_car_number_marker_coerces_to_null() {
    let results = df![
        "resultId" => &[1],
        "raceId" => &[100],
        "driverId" => &[2],
        "constructorId" => &[20],
        "number" => &["\\N"],
        "grid" => &[2],
        "position" => &["4"],
        "positionOrder" => &[4],
        "points" => &[12.0],
        "laps" => &[53],
        "statusId" => &[1],
    ]
    .unwrap();

    let out =
        prepare_results_data(&results, &reference_extracts(), &dimension_snapshots()).unwrap();

    assert_eq!(out.column("car_number").unwrap().null_count(), 1);
    assert_eq!(out.column("final_position").unwrap().i64().unwrap().get(0), Some(4));
}
