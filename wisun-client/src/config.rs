//! Client configuration

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;
use wisun_session::DEFAULT_SCAN_DURATION;

/// Settings for a meter-reading client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Serial device the adapter is attached to.
    pub serial_port: String,
    /// Route-B authentication id.
    pub route_b_id: String,
    /// Route-B password.
    pub route_b_password: String,
    /// Scan duration argument for the adapter's scan command.
    pub scan_duration: u8,
    /// Interval between instantaneous power read requests.
    pub power_interval: Duration,
    /// Interval between cumulative energy read requests.
    pub energy_interval: Duration,
}

impl ClientConfig {
    /// Read the configuration from the environment.
    ///
    /// `SERIAL_PORT`, `ROUTE_B_ID` and `ROUTE_B_PASSWORD` are required.
    /// `SCAN_DURATION`, `POWER_INTERVAL_MS` and `ENERGY_INTERVAL_MS` are
    /// optional and default to 6, 10000 and 60000.
    pub fn from_env() -> Result<Self> {
        let serial_port = env::var("SERIAL_PORT").context("SERIAL_PORT is not set")?;
        let route_b_id = env::var("ROUTE_B_ID").context("ROUTE_B_ID is not set")?;
        let route_b_password =
            env::var("ROUTE_B_PASSWORD").context("ROUTE_B_PASSWORD is not set")?;
        let scan_duration = match env::var("SCAN_DURATION") {
            Ok(value) => value
                .parse()
                .context("SCAN_DURATION must be a small integer")?,
            Err(_) => DEFAULT_SCAN_DURATION,
        };
        Ok(Self {
            serial_port,
            route_b_id,
            route_b_password,
            scan_duration,
            power_interval: interval_from_env("POWER_INTERVAL_MS", Duration::from_secs(10))?,
            energy_interval: interval_from_env("ENERGY_INTERVAL_MS", Duration::from_secs(60))?,
        })
    }
}

fn interval_from_env(key: &str, default: Duration) -> Result<Duration> {
    match env::var(key) {
        Ok(value) => {
            let millis: u64 = value
                .parse()
                .with_context(|| format!("{} must be an interval in milliseconds", key))?;
            Ok(Duration::from_millis(millis))
        }
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env() {
        // Safety: tests in this module are the only writers of these
        // variables within this process.
        unsafe {
            env::set_var("SERIAL_PORT", "/dev/ttyUSB0");
            env::set_var("ROUTE_B_ID", "00112233445566778899AABBCCDDEEFF");
            env::set_var("ROUTE_B_PASSWORD", "0123456789AB");
            env::set_var("POWER_INTERVAL_MS", "5000");
            env::remove_var("SCAN_DURATION");
            env::remove_var("ENERGY_INTERVAL_MS");
        }

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.serial_port, "/dev/ttyUSB0");
        assert_eq!(config.scan_duration, DEFAULT_SCAN_DURATION);
        assert_eq!(config.power_interval, Duration::from_secs(5));
        assert_eq!(config.energy_interval, Duration::from_secs(60));
    }
}
