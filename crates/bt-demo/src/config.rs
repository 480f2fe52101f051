//! Demo driver configuration.

use std::env;
use std::time::Duration;

/// How the demo drives its tree.
#[derive(Clone, Debug)]
pub struct DemoConfig {
    /// Sleep between consecutive ticks.
    pub period: Duration,
    /// Number of ticks to run, `None` to run until interrupted.
    pub ticks: Option<u64>,
    /// Budget handed to every node's `setup`.
    pub setup_timeout: Duration,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(500),
            ticks: Some(10),
            setup_timeout: Duration::from_millis(1000),
        }
    }
}

impl DemoConfig {
    /// Construct configuration from environment variables.
    ///
    /// Environment variables:
    /// - `BT_DEMO_PERIOD_MS` - Tick period in milliseconds (default: 500)
    /// - `BT_DEMO_TICKS` - Number of ticks, 0 to run continuously (default: 10)
    /// - `BT_DEMO_SETUP_TIMEOUT_MS` - Setup timeout in milliseconds (default: 1000)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).and_then(|value| value.parse::<u64>().ok());
        let mut config = Self::default();

        if let Some(period) = read("BT_DEMO_PERIOD_MS") {
            config.period = Duration::from_millis(period);
        }

        if let Some(ticks) = read("BT_DEMO_TICKS") {
            config.ticks = (ticks > 0).then_some(ticks);
        }

        if let Some(timeout) = read("BT_DEMO_SETUP_TIMEOUT_MS") {
            config.setup_timeout = Duration::from_millis(timeout);
        }

        config
    }
}
