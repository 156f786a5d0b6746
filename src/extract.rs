//! Source reader: the eight season extract files.

use crate::error::Result;
use crate::keys::ReferenceExtracts;
use polars::prelude::*;
use std::path::Path;
use tracing::info;

/// Raw extract frames, one per entity type, as read from the data
/// directory. Kept as plain columns-named frames; all typing and cleaning
/// happens in the pipeline stages.
pub struct Extracts {
    pub circuits: DataFrame,
    pub constructors: DataFrame,
    pub drivers: DataFrame,
    pub pit_stops: DataFrame,
    pub qualifying: DataFrame,
    pub races: DataFrame,
    pub results: DataFrame,
    pub status: DataFrame,
}

fn read_csv(data_dir: &Path, file: &str) -> Result<DataFrame> {
    let path = data_dir.join(file);
    let df = LazyCsvReader::new(&path)
        .with_infer_schema_length(Some(1000))
        .finish()?
        .collect()?;
    info!("read {} rows from {}", df.height(), path.display());
    Ok(df)
}

impl Extracts {
    pub fn read(data_dir: &Path) -> Result<Self> {
        Ok(Self {
            circuits: read_csv(data_dir, "circuits.csv")?,
            constructors: read_csv(data_dir, "constructors.csv")?,
            drivers: read_csv(data_dir, "drivers.csv")?,
            pit_stops: read_csv(data_dir, "pit_stops.csv")?,
            qualifying: read_csv(data_dir, "qualifying.csv")?,
            races: read_csv(data_dir, "races.csv")?,
            results: read_csv(data_dir, "results.csv")?,
            status: read_csv(data_dir, "status.csv")?,
        })
    }

    /// The auxiliary extracts the resolution pipelines join through.
    pub fn reference_extracts(&self) -> ReferenceExtracts {
        ReferenceExtracts {
            drivers: self.drivers.clone(),
            constructors: self.constructors.clone(),
            races: self.races.clone(),
            circuits: self.circuits.clone(),
            status: self.status.clone(),
            results: self.results.clone(),
        }
    }
}
