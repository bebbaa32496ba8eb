use std::path::PathBuf;

use chrono::Duration;

use crate::notice::DEFAULT_NOTICE_TTL_SECS;

pub const ENV_DATA_DIR: &str = "TASKFLOW_DATA_DIR";
pub const ENV_NOTICE_SECS: &str = "TASKFLOW_NOTICE_SECS";
/// Longer notice lifetimes are clamped to one day.
pub const MAX_NOTICE_TTL_SECS: i64 = 24 * 60 * 60;
const APP_DIR_NAME: &str = "taskflow";

#[derive(Debug, Clone)]
pub struct Config {
    /// Holds the task data file and the log files.
    pub data_dir: PathBuf,
    pub notice_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            notice_ttl: Duration::seconds(DEFAULT_NOTICE_TTL_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();
        if let Some(dir) = get(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir.trim());
        }
        if let Some(secs) = get(ENV_NOTICE_SECS) {
            match secs
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs > 0)
                .and_then(|secs| Duration::try_seconds(secs.min(MAX_NOTICE_TTL_SECS)))
            {
                Some(ttl) => config.notice_ttl = ttl,
                None => log::warn!("ignoring invalid {ENV_NOTICE_SECS}={secs}"),
            }
        }
        config
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".taskflow"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config.notice_ttl, Duration::seconds(5));
        assert!(config.data_dir.ends_with("taskflow") || config.data_dir.ends_with(".taskflow"));
    }

    #[test]
    fn env_values_override_defaults() {
        let config = Config::from_lookup(lookup(&[
            (ENV_DATA_DIR, " /tmp/tf "),
            (ENV_NOTICE_SECS, "12"),
        ]));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/tf"));
        assert_eq!(config.notice_ttl, Duration::seconds(12));
    }

    #[test]
    fn blank_and_invalid_values_are_ignored() {
        let config = Config::from_lookup(lookup(&[(ENV_DATA_DIR, "  "), (ENV_NOTICE_SECS, "-3")]));
        assert_eq!(config.data_dir, default_data_dir());
        assert_eq!(config.notice_ttl, Duration::seconds(5));

        let config = Config::from_lookup(lookup(&[(ENV_NOTICE_SECS, "soon")]));
        assert_eq!(config.notice_ttl, Duration::seconds(5));
    }

    #[test]
    fn oversized_notice_seconds_are_clamped() {
        let config = Config::from_lookup(lookup(&[(ENV_NOTICE_SECS, "9000000000000000")]));
        assert_eq!(config.notice_ttl, Duration::seconds(MAX_NOTICE_TTL_SECS));

        let config = Config::from_lookup(lookup(&[(ENV_NOTICE_SECS, "86401")]));
        assert_eq!(config.notice_ttl, Duration::days(1));
    }
}
