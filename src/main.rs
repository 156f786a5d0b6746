use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use gridstar::config;
use gridstar::dimensions::{
    expand_race_date, prepare_circuit_data, prepare_constructor_data, prepare_driver_data,
    prepare_race_data, prepare_status_data,
};
use gridstar::extract::Extracts;
use gridstar::facts::{prepare_pit_stops_data, prepare_qualifying_data, prepare_results_data};
use gridstar::sink::WarehouseSink;

#[derive(Parser)]
#[command(name = "gridstar")]
#[command(about = "Load motor-racing season extracts into a star-schema warehouse")]
struct Args {
    /// Directory holding the season extract CSVs
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Path to the warehouse connection config (DATABASE_URL overrides)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Skip the dimension load and resolve against the existing snapshots
    #[arg(long)]
    resolve_only: bool,

    /// Run the resolution pipelines but do not write the fact tables
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    info!("gridstar starting; extracts from {}", args.data_dir.display());

    let extracts = Extracts::read(&args.data_dir)?;
    let races = expand_race_date(&extracts.races, "date")?;

    let url = config::database_url(&args.config)?;
    let sink = WarehouseSink::connect(&url).await?;
    sink.ensure_schema().await?;

    if !args.resolve_only {
        sink.load_dimension("driver", &prepare_driver_data(&extracts.drivers)?).await?;
        sink.load_dimension("constructor", &prepare_constructor_data(&extracts.constructors)?)
            .await?;
        sink.load_dimension("race", &prepare_race_data(&races)?).await?;
        sink.load_dimension("circuit", &prepare_circuit_data(&extracts.circuits)?).await?;
        sink.load_dimension("status", &prepare_status_data(&extracts.status)?).await?;
    }

    let dims = sink.fetch_snapshots().await?;
    let refs = extracts.reference_extracts();

    let qualifying = prepare_qualifying_data(&extracts.qualifying, &refs, &dims)?;
    let pit_stops = prepare_pit_stops_data(&extracts.pit_stops, &refs, &dims)?;
    let results = prepare_results_data(&extracts.results, &refs, &dims)?;

    if args.dry_run {
        info!(
            "dry run: skipping fact load ({} qualifying, {} pit stop, {} result rows resolved)",
            qualifying.height(),
            pit_stops.height(),
            results.height()
        );
        return Ok(());
    }

    sink.load_fact("qualifying", &qualifying).await?;
    sink.load_fact("pit_stops", &pit_stops).await?;
    sink.load_fact("results", &results).await?;

    info!("all fact tables loaded");
    Ok(())
}
