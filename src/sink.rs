//! Warehouse sink: Postgres persistence for dimension and fact frames,
//! plus the dimension-snapshot reads the resolvers run against.
//!
//! Dimension inserts are `ON CONFLICT DO NOTHING` against the natural-key
//! unique constraints, so re-running a load is harmless. Fact inserts are
//! plain appends; deduplication across runs is out of scope.

use crate::error::{EtlError, Result};
use crate::resolve::DimensionSnapshots;
use chrono::{Datelike, NaiveDate};
use itertools::Itertools;
use polars::prelude::*;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{Postgres, Row};
use tracing::info;

/// Keeps each multi-row INSERT well below the Postgres bind limit.
const INSERT_CHUNK_ROWS: usize = 500;

/// Days from 0001-01-01 (CE) to the Unix epoch; polars dates are days
/// since the epoch, chrono counts from CE.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

const SCHEMA_STATEMENTS: [&str; 8] = [
    "CREATE TABLE IF NOT EXISTS driver (
        driver_id SERIAL PRIMARY KEY,
        driver_name TEXT,
        driver_surname TEXT,
        date_of_birth DATE,
        driver_nationality TEXT,
        UNIQUE (driver_name, driver_surname, date_of_birth)
    )",
    "CREATE TABLE IF NOT EXISTS constructor (
        constructor_id SERIAL PRIMARY KEY,
        constructor_name TEXT,
        constructor_nationality TEXT,
        UNIQUE (constructor_name)
    )",
    "CREATE TABLE IF NOT EXISTS race (
        race_id SERIAL PRIMARY KEY,
        year BIGINT,
        month BIGINT,
        day BIGINT,
        race_name TEXT,
        UNIQUE (year, race_name)
    )",
    "CREATE TABLE IF NOT EXISTS circuit (
        circuit_id SERIAL PRIMARY KEY,
        circuit_name TEXT,
        circuit_location TEXT,
        circuit_country TEXT,
        latitude DOUBLE PRECISION,
        longitude DOUBLE PRECISION,
        altitude DOUBLE PRECISION,
        UNIQUE (circuit_name)
    )",
    "CREATE TABLE IF NOT EXISTS status (
        status_id SERIAL PRIMARY KEY,
        status TEXT,
        UNIQUE (status)
    )",
    "CREATE TABLE IF NOT EXISTS qualifying (
        circuit_id BIGINT,
        constructor_id BIGINT,
        race_id BIGINT,
        driver_id BIGINT,
        q1 TEXT,
        q2 TEXT,
        q3 TEXT
    )",
    "CREATE TABLE IF NOT EXISTS pit_stops (
        constructor_id BIGINT,
        race_id BIGINT,
        driver_id BIGINT,
        stop_number BIGINT,
        lap_number BIGINT,
        stop_time TEXT,
        stop_duration BIGINT
    )",
    "CREATE TABLE IF NOT EXISTS results (
        circuit_id DOUBLE PRECISION,
        constructor_id DOUBLE PRECISION,
        race_id DOUBLE PRECISION,
        driver_id DOUBLE PRECISION,
        status_id DOUBLE PRECISION,
        car_number BIGINT,
        starting_position BIGINT,
        final_position BIGINT,
        position_order BIGINT,
        points DOUBLE PRECISION,
        laps BIGINT
    )",
];

/// Typed per-column accessors for row-wise binding.
enum ColumnValues<'a> {
    Int32(&'a Int32Chunked),
    Int64(&'a Int64Chunked),
    Float64(&'a Float64Chunked),
    Str(&'a StringChunked),
    /// Date columns, pre-cast to their physical day offsets.
    Date(Int32Chunked),
}

fn column_values(series: &Series) -> Result<ColumnValues<'_>> {
    match series.dtype() {
        DataType::Int32 => Ok(ColumnValues::Int32(series.i32()?)),
        DataType::Int64 => Ok(ColumnValues::Int64(series.i64()?)),
        DataType::Float64 => Ok(ColumnValues::Float64(series.f64()?)),
        DataType::String => Ok(ColumnValues::Str(series.str()?)),
        DataType::Date => Ok(ColumnValues::Date(
            series.cast(&DataType::Int32)?.i32()?.clone(),
        )),
        other => Err(EtlError::Sink(format!(
            "unsupported dtype {other} for column '{}'",
            series.name()
        ))),
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    values: &'q ColumnValues<'q>,
    row: usize,
) -> Query<'q, Postgres, PgArguments> {
    match values {
        ColumnValues::Int32(ca) => query.bind(ca.get(row)),
        ColumnValues::Int64(ca) => query.bind(ca.get(row)),
        ColumnValues::Float64(ca) => query.bind(ca.get(row)),
        ColumnValues::Str(ca) => query.bind(ca.get(row)),
        ColumnValues::Date(ca) => query.bind(
            ca.get(row)
                .and_then(|days| NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE)),
        ),
    }
}

pub struct WarehouseSink {
    pool: PgPool,
}

impl WarehouseSink {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn load_dimension(&self, table: &str, df: &DataFrame) -> Result<u64> {
        let inserted = self.insert_frame(table, df, true).await?;
        info!("loaded {inserted} rows into dimension '{table}' ({} offered)", df.height());
        Ok(inserted)
    }

    pub async fn load_fact(&self, table: &str, df: &DataFrame) -> Result<u64> {
        let inserted = self.insert_frame(table, df, false).await?;
        info!("loaded {inserted} rows into fact table '{table}'");
        Ok(inserted)
    }

    async fn insert_frame(&self, table: &str, df: &DataFrame, ignore_conflicts: bool) -> Result<u64> {
        if df.height() == 0 {
            return Ok(0);
        }
        let values: Vec<ColumnValues> = df
            .get_columns()
            .iter()
            .map(column_values)
            .collect::<Result<_>>()?;
        let column_list = df
            .get_column_names()
            .iter()
            .map(|c| format!("\"{c}\""))
            .join(", ");
        let width = values.len();

        let mut inserted = 0u64;
        let mut offset = 0;
        while offset < df.height() {
            let rows = (df.height() - offset).min(INSERT_CHUNK_ROWS);
            let tuples = (0..rows)
                .map(|r| {
                    let placeholders =
                        (1..=width).map(|c| format!("${}", r * width + c)).join(", ");
                    format!("({placeholders})")
                })
                .join(", ");
            let suffix = if ignore_conflicts { " ON CONFLICT DO NOTHING" } else { "" };
            let sql = format!("INSERT INTO {table} ({column_list}) VALUES {tuples}{suffix}");

            let mut query = sqlx::query(&sql);
            for row in offset..offset + rows {
                for column in &values {
                    query = bind_value(query, column, row);
                }
            }
            inserted += query.execute(&self.pool).await?.rows_affected();
            offset += rows;
        }
        Ok(inserted)
    }

    /// Read the current dimension contents back as snapshots for one
    /// resolution run: surrogate key plus natural-key columns, nothing else.
    pub async fn fetch_snapshots(&self) -> Result<DimensionSnapshots> {
        Ok(DimensionSnapshots {
            driver: self.fetch_driver_snapshot().await?,
            constructor: self
                .fetch_text_snapshot("constructor", "constructor_id", "constructor_name")
                .await?,
            race: self.fetch_race_snapshot().await?,
            circuit: self
                .fetch_text_snapshot("circuit", "circuit_id", "circuit_name")
                .await?,
            status: self.fetch_text_snapshot("status", "status_id", "status").await?,
        })
    }

    async fn fetch_driver_snapshot(&self) -> Result<DataFrame> {
        let rows = sqlx::query(
            "SELECT driver_id, driver_name, driver_surname, date_of_birth FROM driver",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut ids = Vec::with_capacity(rows.len());
        let mut names = Vec::with_capacity(rows.len());
        let mut surnames = Vec::with_capacity(rows.len());
        let mut dob_days: Vec<Option<i32>> = Vec::with_capacity(rows.len());
        for row in &rows {
            ids.push(row.try_get::<i32, _>("driver_id")? as i64);
            names.push(row.try_get::<Option<String>, _>("driver_name")?);
            surnames.push(row.try_get::<Option<String>, _>("driver_surname")?);
            dob_days.push(
                row.try_get::<Option<NaiveDate>, _>("date_of_birth")?
                    .map(|d| d.num_days_from_ce() - EPOCH_DAYS_FROM_CE),
            );
        }
        Ok(DataFrame::new(vec![
            Series::new("driver_id", ids),
            Series::new("driver_name", names),
            Series::new("driver_surname", surnames),
            Series::new("date_of_birth", dob_days).cast(&DataType::Date)?,
        ])?)
    }

    async fn fetch_race_snapshot(&self) -> Result<DataFrame> {
        let rows = sqlx::query("SELECT race_id, year, race_name FROM race")
            .fetch_all(&self.pool)
            .await?;

        let mut ids = Vec::with_capacity(rows.len());
        let mut years = Vec::with_capacity(rows.len());
        let mut names = Vec::with_capacity(rows.len());
        for row in &rows {
            ids.push(row.try_get::<i32, _>("race_id")? as i64);
            years.push(row.try_get::<Option<i64>, _>("year")?);
            names.push(row.try_get::<Option<String>, _>("race_name")?);
        }
        Ok(DataFrame::new(vec![
            Series::new("race_id", ids),
            Series::new("year", years),
            Series::new("race_name", names),
        ])?)
    }

    async fn fetch_text_snapshot(
        &self,
        table: &str,
        id_column: &str,
        text_column: &str,
    ) -> Result<DataFrame> {
        let sql = format!("SELECT \"{id_column}\", \"{text_column}\" FROM {table}");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut ids = Vec::with_capacity(rows.len());
        let mut texts = Vec::with_capacity(rows.len());
        for row in &rows {
            ids.push(row.try_get::<i32, _>(id_column)? as i64);
            texts.push(row.try_get::<Option<String>, _>(text_column)?);
        }
        Ok(DataFrame::new(vec![
            Series::new(id_column, ids),
            Series::new(text_column, texts),
        ])?)
    }
}
