use std::process::Command;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel;
use thiserror::Error;

use crate::geo::Coordinate;

/// Downtown Montreal.
pub const DEFAULT_LOCATION: Coordinate = Coordinate::new(45.5017, -73.5673);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("running location command `{command}`: {source}")]
    Command {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("location command `{command}` exited with {status}")]
    CommandFailed { command: String, status: String },
    #[error("could not read a position from {0:?}")]
    Parse(String),
    #[error("position not available after {0:?}")]
    Timeout(Duration),
}

/// A center to search around. `error` is set when the fallback was used.
#[derive(Clone, Debug, PartialEq)]
pub struct LocationFix {
    pub coordinate: Coordinate,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LocationState {
    Resolving,
    Resolved(LocationFix),
}

impl LocationState {
    pub fn is_resolving(&self) -> bool {
        matches!(self, LocationState::Resolving)
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            LocationState::Resolving => None,
            LocationState::Resolved(fix) => Some(fix.coordinate),
        }
    }
}

pub trait LocationSource: Send + Sync {
    /// Blocks until a center is known. Never fails: problems surface in `LocationFix::error`.
    fn locate(&self) -> LocationFix;
}

pub struct FixedLocation(pub Coordinate);

impl Default for FixedLocation {
    fn default() -> Self {
        FixedLocation(DEFAULT_LOCATION)
    }
}

impl LocationSource for FixedLocation {
    fn locate(&self) -> LocationFix {
        LocationFix {
            coordinate: self.0,
            error: None,
        }
    }
}

/// Something that can ask the device where it is.
pub trait PositionProvider: Send + Sync + 'static {
    fn current_position(&self) -> Result<Coordinate, LocationError>;
}

/// Runs an external program and reads `lat,lon` (or `lat lon`) from its stdout.
pub struct CommandProvider {
    program: String,
    args: Vec<String>,
}

impl CommandProvider {
    /// Splits `command_line` on whitespace; the first word is the program.
    pub fn new(command_line: &str) -> Option<Self> {
        let mut words = command_line.split_whitespace().map(String::from);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl PositionProvider for CommandProvider {
    fn current_position(&self) -> Result<Coordinate, LocationError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|source| LocationError::Command {
                command: self.command_line(),
                source,
            })?;
        if !output.status.success() {
            return Err(LocationError::CommandFailed {
                command: self.command_line(),
                status: output.status.to_string(),
            });
        }
        parse_position(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parses the first line of `text` as `lat,lon` or `lat lon`.
pub fn parse_position(text: &str) -> Result<Coordinate, LocationError> {
    let line = text.lines().next().unwrap_or("").trim();
    let mut parts = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty());
    match (parts.next(), parts.next(), parts.next()) {
        (Some(lat), Some(lon), None) => match (lat.parse::<f64>(), lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => Ok(Coordinate::new(lat, lon)),
            _ => Err(LocationError::Parse(line.to_string())),
        },
        _ => Err(LocationError::Parse(line.to_string())),
    }
}

/// Device position with a deadline, a fallback and a short-lived cache.
pub struct DeviceLocation<P: PositionProvider> {
    provider: Arc<P>,
    fallback: Coordinate,
    timeout: Duration,
    max_age: Duration,
    cached: Mutex<Option<(Coordinate, Instant)>>,
}

impl<P: PositionProvider> DeviceLocation<P> {
    pub fn new(provider: P, fallback: Coordinate) -> Self {
        Self {
            provider: Arc::new(provider),
            fallback,
            timeout: DEFAULT_TIMEOUT,
            max_age: DEFAULT_MAX_AGE,
            cached: Mutex::new(None),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    fn cached_fix(&self) -> Option<Coordinate> {
        let cached = self.cached.lock().ok()?;
        match *cached {
            Some((at, when)) if when.elapsed() <= self.max_age => Some(at),
            _ => None,
        }
    }

    fn resolve(&self) -> Result<Coordinate, LocationError> {
        let (tx, rx) = channel::bounded(1);
        let provider = Arc::clone(&self.provider);
        // A provider that hangs is left behind; its answer lands in a dropped channel.
        thread::spawn(move || {
            let _ = tx.send(provider.current_position());
        });
        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(_) => Err(LocationError::Timeout(self.timeout)),
        }
    }
}

impl<P: PositionProvider> LocationSource for DeviceLocation<P> {
    fn locate(&self) -> LocationFix {
        if let Some(coordinate) = self.cached_fix() {
            log::debug!("reusing cached position {}", coordinate);
            return LocationFix {
                coordinate,
                error: None,
            };
        }
        match self.resolve() {
            Ok(coordinate) => {
                if let Ok(mut cached) = self.cached.lock() {
                    *cached = Some((coordinate, Instant::now()));
                }
                LocationFix {
                    coordinate,
                    error: None,
                }
            }
            Err(e) => {
                log::warn!("{}; using default location {}", e, self.fallback);
                LocationFix {
                    coordinate: self.fallback,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        answer: Option<Coordinate>,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl PositionProvider for Scripted {
        fn current_position(&self) -> Result<Coordinate, LocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            self.answer
                .ok_or_else(|| LocationError::Parse(String::from("no fix")))
        }
    }

    fn scripted(answer: Option<Coordinate>, delay: Duration) -> (Scripted, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Scripted {
                answer,
                delay,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }

    #[test]
    fn fixed_location_never_errors() {
        let fix = FixedLocation::default().locate();
        assert_eq!(fix.coordinate, DEFAULT_LOCATION);
        assert_eq!(fix.error, None);
    }

    #[test]
    fn device_fix_is_used() {
        let paris = Coordinate::new(48.8566, 2.3522);
        let (provider, _) = scripted(Some(paris), Duration::ZERO);
        let fix = DeviceLocation::new(provider, DEFAULT_LOCATION).locate();
        assert_eq!(fix.coordinate, paris);
        assert!(fix.error.is_none());
    }

    #[test]
    fn provider_error_falls_back() {
        let (provider, _) = scripted(None, Duration::ZERO);
        let fix = DeviceLocation::new(provider, DEFAULT_LOCATION).locate();
        assert_eq!(fix.coordinate, DEFAULT_LOCATION);
        assert!(fix.error.unwrap().contains("no fix"));
    }

    #[test]
    fn slow_provider_times_out() {
        let (provider, _) = scripted(Some(Coordinate::new(1.0, 1.0)), Duration::from_millis(500));
        let fix = DeviceLocation::new(provider, DEFAULT_LOCATION)
            .timeout(Duration::from_millis(20))
            .locate();
        assert_eq!(fix.coordinate, DEFAULT_LOCATION);
        assert!(fix.error.is_some());
    }

    #[test]
    fn recent_fix_is_cached() {
        let (provider, calls) = scripted(Some(Coordinate::new(1.0, 2.0)), Duration::ZERO);
        let device = DeviceLocation::new(provider, DEFAULT_LOCATION);
        device.locate();
        device.locate();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let (provider, calls) = scripted(Some(Coordinate::new(1.0, 2.0)), Duration::ZERO);
        let device = DeviceLocation::new(provider, DEFAULT_LOCATION).max_age(Duration::ZERO);
        device.locate();
        thread::sleep(Duration::from_millis(2));
        device.locate();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn parses_positions() {
        assert_eq!(parse_position("45.5,-73.5\n").unwrap(), Coordinate::new(45.5, -73.5));
        assert_eq!(parse_position("  45.5 -73.5 ").unwrap(), Coordinate::new(45.5, -73.5));
        assert_eq!(parse_position("45.5, -73.5").unwrap(), Coordinate::new(45.5, -73.5));
        assert!(parse_position("").is_err());
        assert!(parse_position("north,west").is_err());
        assert!(parse_position("1,2,3").is_err());
    }

    #[test]
    fn state_flags() {
        assert!(LocationState::Resolving.is_resolving());
        let resolved = LocationState::Resolved(FixedLocation::default().locate());
        assert_eq!(resolved.coordinate(), Some(DEFAULT_LOCATION));
    }

    #[test]
    fn empty_command_line() {
        assert!(CommandProvider::new("   ").is_none());
        let provider = CommandProvider::new("echo 45.5,-73.5").unwrap();
        assert_eq!(provider.command_line(), "echo 45.5,-73.5");
    }
}
