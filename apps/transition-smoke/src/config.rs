//! Environment-backed runtime configuration for `transition-smoke`.

use std::{env, fmt, str::FromStr, time::Duration};

use thiserror::Error;
use transition_core::{DEFAULT_HISTORY_CAPACITY, QueueConfig};

const DEFAULT_ACTIONS: usize = 12;
const DEFAULT_SUBMITTERS: usize = 4;
const DEFAULT_SURFACE_DELAY_MS: u64 = 50;
const DEFAULT_SURFACE_NAME: &str = "main";

/// Runtime configuration used by the smoke run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeConfig {
    /// History ring capacity handed to the queue.
    pub history_capacity: usize,
    /// Total number of transitions submitted.
    pub actions: usize,
    /// Number of concurrent submitter tasks.
    pub submitters: usize,
    /// Delay before the simulated surface appears, and between lifecycle flips.
    pub surface_delay_ms: u64,
    /// Name given to the simulated foreground surface.
    pub surface_name: String,
}

impl SmokeConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let history_capacity: usize = parse_or(
            "TRANSITION_HISTORY_CAPACITY",
            DEFAULT_HISTORY_CAPACITY,
            &mut lookup,
        )?;
        let actions: usize = parse_or("TRANSITION_SMOKE_ACTIONS", DEFAULT_ACTIONS, &mut lookup)?;
        let submitters: usize =
            parse_or("TRANSITION_SMOKE_SUBMITTERS", DEFAULT_SUBMITTERS, &mut lookup)?;
        let surface_delay_ms: u64 = parse_or(
            "TRANSITION_SMOKE_SURFACE_DELAY_MS",
            DEFAULT_SURFACE_DELAY_MS,
            &mut lookup,
        )?;
        let surface_name = lookup("TRANSITION_SMOKE_SURFACE_NAME")
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_SURFACE_NAME.to_owned());

        for (key, value) in [
            ("TRANSITION_HISTORY_CAPACITY", history_capacity),
            ("TRANSITION_SMOKE_ACTIONS", actions),
            ("TRANSITION_SMOKE_SUBMITTERS", submitters),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key,
                    value: "0".to_owned(),
                    reason: "must be at least 1".to_owned(),
                });
            }
        }

        Ok(Self {
            history_capacity,
            actions,
            submitters,
            surface_delay_ms,
            surface_name,
        })
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            history_capacity: self.history_capacity,
        }
    }

    pub fn surface_delay(&self) -> Duration {
        Duration::from_millis(self.surface_delay_ms)
    }
}

/// Errors produced while parsing runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid {key}='{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Parse `key` when set, otherwise fall back to `default`.
fn parse_or<T, F>(key: &'static str, default: T, lookup: &mut F) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: FnMut(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|err: T::Err| ConfigError::InvalidValue {
            key,
            reason: err.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from_pairs(pairs: &[(&str, &str)]) -> Result<SmokeConfig, ConfigError> {
        let map = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<HashMap<_, _>>();
        SmokeConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn uses_defaults_without_env() {
        let cfg = config_from_pairs(&[]).expect("config should parse");

        assert_eq!(cfg.history_capacity, DEFAULT_HISTORY_CAPACITY);
        assert_eq!(cfg.actions, DEFAULT_ACTIONS);
        assert_eq!(cfg.submitters, DEFAULT_SUBMITTERS);
        assert_eq!(cfg.surface_delay(), Duration::from_millis(DEFAULT_SURFACE_DELAY_MS));
        assert_eq!(cfg.surface_name, "main");
        assert_eq!(cfg.queue_config(), QueueConfig::default());
    }

    #[test]
    fn parses_overrides() {
        let cfg = config_from_pairs(&[
            ("TRANSITION_HISTORY_CAPACITY", "3"),
            ("TRANSITION_SMOKE_ACTIONS", " 40 "),
            ("TRANSITION_SMOKE_SUBMITTERS", "8"),
            ("TRANSITION_SMOKE_SURFACE_DELAY_MS", "0"),
            ("TRANSITION_SMOKE_SURFACE_NAME", "  checkout "),
        ])
        .expect("config should parse");

        assert_eq!(cfg.queue_config().history_capacity, 3);
        assert_eq!(cfg.actions, 40);
        assert_eq!(cfg.submitters, 8);
        assert_eq!(cfg.surface_delay_ms, 0);
        assert_eq!(cfg.surface_name, "checkout");
    }

    #[test]
    fn blank_surface_name_falls_back_to_default() {
        let cfg = config_from_pairs(&[("TRANSITION_SMOKE_SURFACE_NAME", "   ")])
            .expect("config should parse");
        assert_eq!(cfg.surface_name, "main");
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = config_from_pairs(&[("TRANSITION_HISTORY_CAPACITY", "0")])
            .expect_err("zero capacity should fail");
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "TRANSITION_HISTORY_CAPACITY",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            }
        );
    }

    #[test]
    fn rejects_invalid_numeric_values() {
        let err = config_from_pairs(&[("TRANSITION_SMOKE_SURFACE_DELAY_MS", "soon")])
            .expect_err("invalid delay should fail");

        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "TRANSITION_SMOKE_SURFACE_DELAY_MS",
                ..
            }
        ));
        assert!(err.to_string().starts_with("invalid TRANSITION_SMOKE_SURFACE_DELAY_MS='soon'"));
    }
}
