use log::warn;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:polls.db";
pub const DEFAULT_COLLECTION: &str = "ONGOING_POLLS";

/// Longest period any observer timer may be armed with.
pub const MAX_OBSERVER_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub collection: String,
    pub observer: ObserverSettings,
}

/// Cadences of a live result session, all counted in `time_unit`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverSettings {
    pub time_unit: Duration,
    pub refresh_units: u32,
    pub countdown_ticks: u32,
    pub timeout_units: u32,
}

impl Default for ObserverSettings {
    fn default() -> Self {
        Self {
            time_unit: Duration::from_secs(1),
            refresh_units: 2,
            countdown_ticks: 10,
            timeout_units: 10,
        }
    }
}

impl ObserverSettings {
    // Out-of-range periods fall back to the default cadence rather than
    // panicking when a timer is armed.
    pub fn refresh_period(&self) -> Duration {
        let fallback = Self::default();
        self.period("refresh", self.refresh_units.max(1), fallback.time_unit * fallback.refresh_units)
    }

    pub fn countdown_period(&self) -> Duration {
        self.period("countdown", 1, Self::default().time_unit)
    }

    pub fn session_timeout(&self) -> Duration {
        let fallback = Self::default();
        self.period("timeout", self.timeout_units, fallback.time_unit * fallback.timeout_units)
    }

    fn period(&self, name: &str, units: u32, fallback: Duration) -> Duration {
        match self.time_unit.checked_mul(units) {
            Some(period) if !period.is_zero() && period <= MAX_OBSERVER_PERIOD => period,
            _ => {
                warn!(
                    "Observer {} period of {} x {:?} is out of range, using {:?}",
                    name, units, self.time_unit, fallback
                );
                fallback
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            observer: ObserverSettings::default(),
        }
    }
}

impl Config {
    // Expects `.env` to have been loaded already, if there is one.
    pub fn from_env() -> Self {
        let defaults = ObserverSettings::default();
        let unit_ms = env_or("OBSERVER_TIME_UNIT_MS", 1000u64);

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            collection: env::var("POLL_COLLECTION")
                .unwrap_or_else(|_| DEFAULT_COLLECTION.to_string()),
            observer: ObserverSettings {
                time_unit: Duration::from_millis(unit_ms.max(1)),
                refresh_units: env_or("OBSERVER_REFRESH_UNITS", defaults.refresh_units),
                countdown_ticks: env_or("OBSERVER_COUNTDOWN_TICKS", defaults.countdown_ticks),
                timeout_units: env_or("OBSERVER_TIMEOUT_UNITS", defaults.timeout_units),
            },
        }
    }
}

fn env_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
