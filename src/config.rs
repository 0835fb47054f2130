//! Configuration
//!
//! Turbo defaults and named timing values. Loaded from `Default` or from
//! `REEL_*` environment variables.

use std::collections::BTreeMap;

use crate::core::turbo::TurboControl;
use crate::error::ConfigError;

/// Environment variable holding the turbo multiplier.
pub const ENV_TURBO_MULTIPLIER: &str = "REEL_TURBO_MULTIPLIER";
/// Environment variable holding the initial turbo flag.
pub const ENV_TURBO_ACTIVE: &str = "REEL_TURBO_ACTIVE";
/// Prefix for timing overrides, e.g. `REEL_TIMING_SPIN_DURATION=800`.
pub const ENV_TIMING_PREFIX: &str = "REEL_TIMING_";

/// Gap between consecutive reel stops.
pub const TIMING_REEL_STOP_INTERVAL: &str = "reel-stop-interval";
/// Time from spin start to the first reel stop.
pub const TIMING_SPIN_DURATION: &str = "spin-duration";
/// Length of a win celebration.
pub const TIMING_WIN_PRESENTATION: &str = "win-presentation";
/// Pause between autoplay rounds.
pub const TIMING_AUTOPLAY_DELAY: &str = "autoplay-delay";

/// Named delays in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingConfig {
    values: BTreeMap<String, i64>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        let mut timings = Self::empty();
        timings.set(TIMING_REEL_STOP_INTERVAL, 150);
        timings.set(TIMING_SPIN_DURATION, 1000);
        timings.set(TIMING_WIN_PRESENTATION, 2000);
        timings.set(TIMING_AUTOPLAY_DELAY, 500);
        timings
    }
}

impl TimingConfig {
    /// No timings configured.
    pub fn empty() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Configure (or override) a timing.
    pub fn set(&mut self, name: impl Into<String>, ms: i64) {
        self.values.insert(name.into(), ms);
    }

    /// Configured value for `name`.
    ///
    /// An unconfigured name is an error, never a silent default.
    pub fn get(&self, name: &str) -> Result<i64, ConfigError> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::UnknownTiming(name.to_string()))
    }

    /// Configured value for `name` divided by the current turbo divisor.
    pub fn scaled(&self, name: &str, turbo: &TurboControl) -> Result<i64, ConfigError> {
        self.get(name).map(|ms| turbo.scale(ms))
    }
}

/// Core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// Turbo speed multiplier (clamped to >= 1).
    pub turbo_multiplier: u32,
    /// Whether turbo starts active.
    pub turbo_active: bool,
    /// Named delays.
    pub timings: TimingConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            turbo_multiplier: 2,
            turbo_active: false,
            timings: TimingConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Create config from environment variables, starting from defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Create config from `(name, value)` pairs, starting from defaults.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();

        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            if key == ENV_TURBO_MULTIPLIER {
                config.turbo_multiplier = parse_var(key, value)?;
            } else if key == ENV_TURBO_ACTIVE {
                config.turbo_active = matches!(value, "true" | "1");
            } else if let Some(name) = key.strip_prefix(ENV_TIMING_PREFIX) {
                let name = name.to_ascii_lowercase().replace('_', "-");
                config.timings.set(name, parse_var(key, value)?);
            }
        }

        Ok(config)
    }

    /// Turbo state described by this config.
    pub fn turbo(&self) -> TurboControl {
        TurboControl::new(self.turbo_multiplier, self.turbo_active)
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var: var.to_string(),
        value: value.to_string(),
    })
}
