//! The district heating network design driver: loads a run's inputs from disk, invokes
//! the `dhn` pipeline, and writes the resulting design as JSON — a thin binary following
//! `parsimon-worker`'s `Args: Parser` shape, stripped of the TCP worker-distribution code
//! this domain has no use for.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;

use dhn_core::catalogue::parse_catalogue;
use dhn_core::config::Config;
use dhn_core::geometry::Point2;
use dhn_core::prices::PriceTable;
use dhn_core::units::{KiloWattHours, KiloWatts};
use dhn_core::{Building, BuildingId, RoadSegment, RoadSegmentId};

#[derive(Parser, Debug)]
#[command(author, version, about = "District heating network design driver")]
struct Args {
    /// Pipeline configuration, JSON.
    #[arg(long)]
    config: PathBuf,

    /// Building records, JSON.
    #[arg(long)]
    buildings: PathBuf,

    /// Road segment records, JSON.
    #[arg(long)]
    roads: PathBuf,

    /// Directory holding the pipe diameter catalogue file.
    #[arg(long)]
    catalogue_dir: PathBuf,

    /// Pipe price table, JSON.
    #[arg(long)]
    prices: PathBuf,

    /// Directory to write `design.json` into.
    #[arg(long)]
    out_dir: PathBuf,

    /// Directory to write `brkga_generation_{k}.json` records and
    /// `times_per_generation.json` into. Omit to skip per-generation persistence.
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Overrides `config`'s seed.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BuildingRecord {
    id: u64,
    x: f64,
    y: f64,
    peak_demand_kw: f64,
    #[serde(default)]
    annual_demand_kwh: f64,
}

#[derive(Debug, Deserialize)]
struct RoadSegmentRecord {
    id: u64,
    ax: f64,
    ay: f64,
    bx: f64,
    by: f64,
    road_type: String,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config: Config = read_json(&args.config).context("failed to load config")?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate().context("config failed validation")?;

    let buildings = load_buildings(&args.buildings)?;
    let road_segments = load_roads(&args.roads)?;
    let catalogue = load_catalogue(&args.catalogue_dir)?;
    let prices_json = fs::read_to_string(&args.prices)
        .with_context(|| format!("failed to read prices file {}", args.prices.display()))?;
    let prices = PriceTable::parse(&prices_json).context("failed to parse price table")?;

    log::info!(
        "running dhn on {} buildings, {} road segments",
        buildings.len(),
        road_segments.len()
    );

    if let Some(dir) = &args.results_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create results directory {}", dir.display()))?;
    }

    let progress = indicatif::ProgressBar::new_spinner();
    progress.set_message("evolving cluster assignment...");
    progress.enable_steady_tick(std::time::Duration::from_millis(120));
    let outcome = dhn::run(
        &buildings,
        &road_segments,
        &config,
        &catalogue,
        &prices,
        args.results_dir.as_deref(),
    )
    .context("dhn pipeline run failed")?;
    progress.finish_with_message(format!(
        "done after {} generations",
        outcome.generations_run
    ));

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create output directory {}", args.out_dir.display()))?;
    let out_path = args.out_dir.join("design.json");
    let out_json = serde_json::to_string_pretty(&outcome.design)?;
    fs::write(&out_path, out_json)
        .with_context(|| format!("failed to write {}", out_path.display()))?;

    log::info!("wrote design to {}", out_path.display());
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn load_buildings(path: &Path) -> Result<Vec<Building>> {
    let records: Vec<BuildingRecord> = read_json(path).context("failed to load buildings")?;
    Ok(records
        .into_iter()
        .map(|r| {
            Building::new(
                BuildingId::new(r.id),
                Point2::new(r.x, r.y),
                KiloWatts::new(r.peak_demand_kw),
                KiloWattHours::new(r.annual_demand_kwh),
            )
        })
        .collect())
}

fn load_roads(path: &Path) -> Result<Vec<RoadSegment>> {
    let records: Vec<RoadSegmentRecord> = read_json(path).context("failed to load road segments")?;
    Ok(records
        .into_iter()
        .map(|r| {
            RoadSegment::new(
                RoadSegmentId::new(r.id),
                Point2::new(r.ax, r.ay),
                Point2::new(r.bx, r.by),
                r.road_type,
            )
        })
        .collect())
}

fn load_catalogue(dir: &Path) -> Result<dhn_core::catalogue::PipeCatalogue> {
    let entry = fs::read_dir(dir)
        .with_context(|| format!("failed to read catalogue directory {}", dir.display()))?
        .filter_map(|e| e.ok())
        .find(|e| e.path().extension().is_some_and(|ext| ext == "txt"))
        .with_context(|| format!("no catalogue file found in {}", dir.display()))?;
    let text = fs::read_to_string(entry.path())
        .with_context(|| format!("failed to read {}", entry.path().display()))?;
    match parse_catalogue(&text) {
        Ok(cat) => Ok(cat),
        Err(err) => bail!("failed to parse catalogue {}: {err}", entry.path().display()),
    }
}
