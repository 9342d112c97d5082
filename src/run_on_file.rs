use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Instant;

mod error;
mod feature;
mod filter;
mod geo;
mod markers;
mod output;
mod source;

use feature::Feature;
use filter::within_radius;
use geo::Coordinate;
use source::FileSource;

#[derive(Parser, Debug)]
#[command(name = "spot-filter")]
#[command(about = "Filter a GeoJSON file of parking signs to those within a radius of a point, as CSV.", long_about = None)]
struct Cli {
    /// Path to the GeoJSON FeatureCollection
    #[arg(short, long)]
    data: PathBuf,

    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Radius in meters. Any positive value; not snapped.
    #[arg(short, long, default_value_t = 500.0)]
    radius: f64,

    /// Output CSV. If omitted, writes to stdout.
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .format_timestamp(None)
    .init();

    let source = FileSource::open(&cli.data)
        .with_context(|| format!("loading {}", cli.data.display()))?;
    let center = Coordinate::new(cli.lat, cli.lon);

    let now = Instant::now();
    let hits = within_radius(Some(source.features()), Some(center), cli.radius);
    log::info!(
        "{} of {} features within {}m of {} ({:.3} ms)",
        hits.len(),
        source.features().len(),
        cli.radius,
        center,
        now.elapsed().as_secs_f64() * 1000.0
    );
    if let Some((_, farthest)) = hits
        .iter()
        .max_by_key(|(_, d)| ordered_float::OrderedFloat(*d))
    {
        log::debug!("farthest kept sign is {:.1}m away", farthest);
    }

    let kept: Vec<Feature> = hits.into_iter().map(|(f, _)| f.clone()).collect();
    let written = match &cli.out {
        Some(out_path) => {
            let file = File::create(out_path)
                .with_context(|| format!("creating CSV {}", out_path.display()))?;
            output::write_markers(file, center, &kept)?
        }
        None => output::write_markers(io::stdout().lock(), center, &kept)?,
    };
    log::info!("Wrote {} markers", written);

    Ok(())
}
