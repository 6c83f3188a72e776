//! Server configuration.

use std::time::Duration;

use tracing::warn;
use typerace_hub::HubConfig;

/// Environment variable holding the listen address.
pub const ENV_BIND: &str = "TYPERACE_BIND";
/// Environment variable holding the time unit in milliseconds.
pub const ENV_TIME_UNIT_MS: &str = "TYPERACE_TIME_UNIT_MS";
/// Environment variable holding the reaper interval in seconds.
pub const ENV_REAPER_SECS: &str = "TYPERACE_REAPER_SECS";

/// Everything needed to start a [`TyperaceServer`](crate::TyperaceServer).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: String,

    /// Upgrade path prefix; the room code follows it, e.g. `/ws/482913`.
    pub path_prefix: String,

    /// Timings for the hub.
    pub hub: HubConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            path_prefix: "/ws/".to_string(),
            hub: HubConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `TYPERACE_*` environment variables.
    ///
    /// Malformed values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the
    /// `TYPERACE_*` keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(bind) = lookup(ENV_BIND) {
            let bind = bind.trim();
            if bind.is_empty() {
                warn!(key = ENV_BIND, "empty value ignored");
            } else {
                config.bind = bind.to_string();
            }
        }
        if let Some(ms) = positive(&lookup, ENV_TIME_UNIT_MS) {
            config.hub.time_unit = Duration::from_millis(ms);
        }
        if let Some(secs) = positive(&lookup, ENV_REAPER_SECS) {
            config.hub.reaper_interval = Duration::from_secs(secs);
        }
        config
    }
}

fn positive(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            warn!(key, value = %raw, "expected a positive integer; ignored");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let pairs = pairs.to_vec();
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.path_prefix, "/ws/");
        assert_eq!(config.hub.countdown_units, 20);
    }

    #[test]
    fn test_from_lookup_applies_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            (ENV_BIND, "0.0.0.0:9000"),
            (ENV_TIME_UNIT_MS, "250"),
            (ENV_REAPER_SECS, "30"),
        ]));
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.hub.time_unit, Duration::from_millis(250));
        assert_eq!(config.hub.reaper_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_from_lookup_ignores_malformed_values() {
        let config = ServerConfig::from_lookup(lookup(&[
            (ENV_BIND, "  "),
            (ENV_TIME_UNIT_MS, "fast"),
            (ENV_REAPER_SECS, "0"),
        ]));
        let defaults = ServerConfig::default();
        assert_eq!(config.bind, defaults.bind);
        assert_eq!(config.hub.time_unit, defaults.hub.time_unit);
        assert_eq!(config.hub.reaper_interval, defaults.hub.reaper_interval);
    }
}
