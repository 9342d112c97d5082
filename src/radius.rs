use crate::config::ConfigError;

pub const MIN_RADIUS_M: u32 = 100;
pub const MAX_RADIUS_M: u32 = 2000;
pub const RADIUS_STEP_M: u32 = 100;
pub const DEFAULT_RADIUS_M: u32 = 500;

/// Stepped search radius, in meters.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RadiusControl {
    value: u32,
    min: u32,
    max: u32,
    step: u32,
}

impl Default for RadiusControl {
    fn default() -> Self {
        Self {
            value: DEFAULT_RADIUS_M,
            min: MIN_RADIUS_M,
            max: MAX_RADIUS_M,
            step: RADIUS_STEP_M,
        }
    }
}

impl RadiusControl {
    pub fn with_bounds(min: u32, max: u32, step: u32) -> Result<Self, ConfigError> {
        if min == 0 || step == 0 || min > max {
            return Err(ConfigError::RadiusBounds { min, max, step });
        }
        let mut control = Self { value: min, min, max, step };
        control.set(DEFAULT_RADIUS_M as f64);
        Ok(control)
    }

    pub fn meters(&self) -> u32 {
        self.value
    }

    pub fn bounds(&self) -> (u32, u32) {
        (self.min, self.max)
    }

    /// Snaps to the nearest step above `min`, then clamps. Returns the new value.
    pub fn set(&mut self, meters: f64) -> u32 {
        let value = if meters.is_nan() || meters <= self.min as f64 {
            self.min
        } else if meters >= self.max as f64 {
            self.max
        } else {
            let steps = ((meters - self.min as f64) / self.step as f64).round() as u32;
            (self.min + steps * self.step).min(self.max)
        };
        self.value = value;
        value
    }

    pub fn step_up(&mut self) -> u32 {
        self.value = self.value.saturating_add(self.step).min(self.max);
        self.value
    }

    pub fn step_down(&mut self) -> u32 {
        self.value = self.value.saturating_sub(self.step).max(self.min);
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let radius = RadiusControl::default();
        assert_eq!(radius.meters(), 500);
        assert_eq!(radius.bounds(), (100, 2000));
    }

    #[test]
    fn snaps_and_clamps() {
        let mut radius = RadiusControl::default();
        assert_eq!(radius.set(740.0), 700);
        assert_eq!(radius.set(750.0), 800);
        assert_eq!(radius.set(20.0), 100);
        assert_eq!(radius.set(-5.0), 100);
        assert_eq!(radius.set(9000.0), 2000);
        assert_eq!(radius.set(f64::NAN), 100);
    }

    #[test]
    fn stepping_saturates() {
        let mut radius = RadiusControl::default();
        radius.set(1900.0);
        assert_eq!(radius.step_up(), 2000);
        assert_eq!(radius.step_up(), 2000);
        radius.set(200.0);
        assert_eq!(radius.step_down(), 100);
        assert_eq!(radius.step_down(), 100);
    }

    #[test]
    fn custom_bounds() {
        let radius = RadiusControl::with_bounds(250, 400, 50).unwrap();
        assert_eq!(radius.meters(), 400);
        assert!(RadiusControl::with_bounds(0, 400, 50).is_err());
        assert!(RadiusControl::with_bounds(100, 400, 0).is_err());
        assert!(RadiusControl::with_bounds(500, 400, 50).is_err());
    }
}
