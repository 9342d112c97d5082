use std::sync::Arc;
use std::time::Duration;

use clap::{Args, ValueEnum};
use thiserror::Error;

use crate::geo::Coordinate;
use crate::location::{CommandProvider, DeviceLocation, FixedLocation, LocationSource};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid radius bounds: min={min} max={max} step={step}")]
    RadiusBounds { min: u32, max: u32, step: u32 },
    #[error("device location requires a location command")]
    MissingLocationCommand,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LocationMode {
    /// Always search around --lat/--lon
    Fixed,
    /// Ask --location-cmd, fall back to --lat/--lon on error or timeout
    Device,
}

#[derive(Args, Debug, Clone)]
pub struct LocationArgs {
    /// Latitude of the default center
    #[arg(long, env = "SPOT_LAT", default_value_t = 45.5017, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude of the default center
    #[arg(long, env = "SPOT_LON", default_value_t = -73.5673, allow_hyphen_values = true)]
    pub lon: f64,

    #[arg(long, value_enum, env = "SPOT_LOCATION", default_value_t = LocationMode::Fixed)]
    pub location: LocationMode,

    /// Command printing "lat,lon" on stdout (used with --location device)
    #[arg(long, env = "SPOT_LOCATION_CMD")]
    pub location_cmd: Option<String>,

    /// How long to wait for the device position
    #[arg(long, env = "SPOT_LOCATION_TIMEOUT_MS", default_value_t = 10_000)]
    pub location_timeout_ms: u64,

    /// How long a device position stays valid
    #[arg(long, env = "SPOT_LOCATION_MAX_AGE_S", default_value_t = 300)]
    pub location_max_age_s: u64,
}

impl LocationArgs {
    pub fn default_center(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }

    pub fn build(&self) -> Result<Arc<dyn LocationSource>, ConfigError> {
        match self.location {
            LocationMode::Fixed => Ok(Arc::new(FixedLocation(self.default_center()))),
            LocationMode::Device => {
                let provider = self
                    .location_cmd
                    .as_deref()
                    .and_then(CommandProvider::new)
                    .ok_or(ConfigError::MissingLocationCommand)?;
                Ok(Arc::new(
                    DeviceLocation::new(provider, self.default_center())
                        .timeout(Duration::from_millis(self.location_timeout_ms))
                        .max_age(Duration::from_secs(self.location_max_age_s)),
                ))
            }
        }
    }
}

pub fn init_logging(verbose: bool) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if verbose { "debug" } else { "info" }),
    )
    .format_timestamp(None)
    .init();
}
