use anyhow::{Context, Result};
use clap::Parser;
use crossbeam::channel::{self, select, Sender};
use std::fs::File;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

mod config;
mod error;
mod feature;
mod filter;
mod geo;
mod location;
mod markers;
mod output;
mod radius;
mod session;
mod source;

use config::LocationArgs;
use geo::Coordinate;
use location::{LocationFix, LocationSource, LocationState};
use radius::RadiusControl;
use session::{Completion, Session, SessionWorker};
use source::{BackendSource, FeatureSource, FileSource};

#[derive(Parser, Debug)]
#[command(name = "spot")]
#[command(about = "Show parking signs within a search radius of your location.", long_about = None)]
struct Cli {
    /// Base URL of the parking backend (serves /nearby)
    #[arg(long, env = "SPOT_API_URL", default_value_t = String::from(source::DEFAULT_API_URL))]
    api_url: String,

    /// Read signs from a GeoJSON FeatureCollection instead of the backend
    #[arg(long, env = "SPOT_DATA")]
    data: Option<PathBuf>,

    /// Search radius in meters, snapped to the radius bounds
    #[arg(short, long, env = "SPOT_RADIUS", default_value_t = radius::DEFAULT_RADIUS_M as f64)]
    radius: f64,

    /// Smallest radius the control allows
    #[arg(long, env = "SPOT_MIN_RADIUS", default_value_t = radius::MIN_RADIUS_M)]
    min_radius: u32,

    /// Largest radius the control allows
    #[arg(long, env = "SPOT_MAX_RADIUS", default_value_t = radius::MAX_RADIUS_M)]
    max_radius: u32,

    /// Radius step for +/- and snapping
    #[arg(long, env = "SPOT_RADIUS_STEP", default_value_t = radius::RADIUS_STEP_M)]
    radius_step: u32,

    #[command(flatten)]
    location: LocationArgs,

    /// HTTP timeout for backend requests, in seconds
    #[arg(long, default_value_t = 10)]
    http_timeout_s: u64,

    /// Write the marker table as CSV. If omitted, prints a summary to stdout.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Keep running: read radius / center changes from stdin
    #[arg(short, long, default_value_t = false)]
    watch: bool,

    #[arg(short, long)]
    verbose: bool,
}

/// A line typed in watch mode.
#[derive(Debug, PartialEq)]
enum Command {
    Radius(f64),
    StepUp,
    StepDown,
    Center(Coordinate),
    Relocate,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    match line {
        "" => None,
        "+" => Some(Command::StepUp),
        "-" => Some(Command::StepDown),
        "q" | "quit" => Some(Command::Quit),
        "l" | "locate" => Some(Command::Relocate),
        _ => {
            if let Ok(meters) = line.parse::<f64>() {
                Some(Command::Radius(meters))
            } else {
                location::parse_position(line).ok().map(Command::Center)
            }
        }
    }
}

fn open_source(cli: &Cli) -> Result<Arc<dyn FeatureSource>> {
    match &cli.data {
        Some(path) => {
            let source = FileSource::open(path)
                .with_context(|| format!("loading {}", path.display()))?;
            Ok(Arc::new(source))
        }
        None => {
            let source =
                BackendSource::new(&cli.api_url, Duration::from_secs(cli.http_timeout_s))
                    .with_context(|| format!("creating HTTP client for {}", cli.api_url))?;
            Ok(Arc::new(source))
        }
    }
}

fn report(session: &Session, out: Option<&PathBuf>) -> Result<()> {
    let center = match session.center() {
        Some(center) => center,
        None => return Ok(()),
    };
    if let Some(out_path) = out {
        let file =
            File::create(out_path).with_context(|| format!("creating CSV {}", out_path.display()))?;
        let written = output::write_markers(file, center, session.features())?;
        println!("Wrote {} markers to {}", written, out_path.display());
    } else {
        output::Summary::from_features(center, session.features()).print(session.radius());
    }
    Ok(())
}

/// Event seen by the watch loop.
enum Event {
    Fetched(Result<(session::FetchTicket, Vec<feature::Feature>), channel::RecvError>),
    Located(Result<LocationFix, channel::RecvError>),
    Line(Result<String, channel::RecvError>),
}

fn apply_fix(fix: LocationFix, state: &mut LocationState, session: &mut Session) {
    if let Some(e) = &fix.error {
        println!("{} - Using default location", e);
    }
    session.set_center(fix.coordinate);
    *state = LocationState::Resolved(fix);
}

/// Device lookups can take up to their timeout; the answer comes back on `tx`.
fn locate_in_background(locator: &Arc<dyn LocationSource>, tx: &Sender<LocationFix>) {
    let locator = Arc::clone(locator);
    let tx = tx.clone();
    thread::spawn(move || {
        let _ = tx.send(locator.locate());
    });
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    config::init_logging(cli.verbose);

    let locator = cli.location.build()?;
    let source = open_source(&cli)?;

    let mut radius = RadiusControl::with_bounds(cli.min_radius, cli.max_radius, cli.radius_step)?;
    radius.set(cli.radius);
    let mut session = Session::new(radius.meters() as f64);

    let mut state = LocationState::Resolving;
    log::info!("Getting your location...");
    apply_fix(locator.locate(), &mut state, &mut session);
    log::info!(
        "Searching {}m around {}",
        radius.meters(),
        state.coordinate().unwrap_or(cli.location.default_center())
    );

    let worker = SessionWorker::new(source);
    if let Some(ticket) = session.request() {
        worker.spawn(ticket);
    }

    if !cli.watch {
        while session.is_loading() {
            let (ticket, features) = worker
                .results()
                .recv()
                .context("fetch worker went away")?;
            session.complete(ticket, features);
        }
        return report(&session, cli.out.as_ref());
    }

    let (line_tx, line_rx) = channel::unbounded::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines().map_while(|l| l.ok()) {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });
    let (fix_tx, fix_rx) = channel::unbounded::<LocationFix>();
    let (min, max) = radius.bounds();
    println!("Commands: <meters {}-{}> | + | - | <lat>,<lon> | locate | quit", min, max);

    loop {
        let event = select! {
            recv(worker.results()) -> msg => Event::Fetched(msg),
            recv(fix_rx) -> msg => Event::Located(msg),
            recv(line_rx) -> msg => Event::Line(msg),
        };
        match event {
            Event::Fetched(msg) => {
                let (ticket, features) = msg.context("fetch worker went away")?;
                if session.complete(ticket, features) == Completion::Applied {
                    report(&session, cli.out.as_ref())?;
                }
                continue;
            }
            Event::Located(msg) => {
                let fix = msg.context("location lookup went away")?;
                apply_fix(fix, &mut state, &mut session);
            }
            // stdin closed
            Event::Line(Err(_)) => break,
            Event::Line(Ok(line)) => match parse_command(&line) {
                Some(Command::Quit) => break,
                Some(Command::Radius(meters)) => {
                    radius.set(meters);
                }
                Some(Command::StepUp) => {
                    radius.step_up();
                }
                Some(Command::StepDown) => {
                    radius.step_down();
                }
                Some(Command::Center(at)) => session.set_center(at),
                Some(Command::Relocate) => {
                    if !state.is_resolving() {
                        state = LocationState::Resolving;
                        println!("Getting your location...");
                        locate_in_background(&locator, &fix_tx);
                    }
                    continue;
                }
                None => {
                    println!("? {}", line.trim());
                    continue;
                }
            },
        }
        session.set_radius(radius.meters() as f64);
        if let Some(ticket) = session.request() {
            log::debug!("fetch #{} for {}m", ticket.generation, ticket.query.radius_m);
            worker.spawn(ticket);
        }
    }

    Ok(())
}
