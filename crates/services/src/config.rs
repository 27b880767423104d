use std::env;
use std::time::Duration;

const DEFAULT_TICK_MS: u64 = 1_000;
const DEFAULT_GRACE_MS: u64 = 1_500;
const DEFAULT_HISTORY_LIMIT: u32 = 3;

/// Timing and display knobs for the session runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Period of one countdown tick (one "second" of quiz time).
    pub tick: Duration,
    /// Pause between answering and moving to the next question.
    pub grace: Duration,
    /// How many recent results the history view shows.
    pub history_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(DEFAULT_TICK_MS),
            grace: Duration::from_millis(DEFAULT_GRACE_MS),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl EngineConfig {
    /// Read `QUIZ_TICK_MS`, `QUIZ_GRACE_MS` and `QUIZ_HISTORY_LIMIT`, falling
    /// back to defaults for unset or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str| {
            lookup(key)
                .and_then(|value| value.trim().parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
        };
        Self {
            tick: millis("QUIZ_TICK_MS").unwrap_or(defaults.tick),
            grace: millis("QUIZ_GRACE_MS").unwrap_or(defaults.grace),
            history_limit: lookup("QUIZ_HISTORY_LIMIT")
                .and_then(|value| value.trim().parse::<u32>().ok())
                .unwrap_or(defaults.history_limit),
        }
    }
}

/// Remote quiz backend settings. Absent unless `QUIZ_API_BASE_URL` is set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpBackendConfig {
    pub base_url: String,
}

impl HttpBackendConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("QUIZ_API_BASE_URL").ok()?;
        Self::new(base_url)
    }

    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Option<Self> {
        let base_url = base_url.into();
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            base_url: trimmed.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn engine_config_reads_overrides_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = [
            ("QUIZ_TICK_MS", "250"),
            ("QUIZ_GRACE_MS", "soon"),
            ("QUIZ_HISTORY_LIMIT", "5"),
        ]
        .into_iter()
        .collect();
        let config = EngineConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.tick, Duration::from_millis(250));
        assert_eq!(config.grace, Duration::from_millis(1_500));
        assert_eq!(config.history_limit, 5);
    }

    #[test]
    fn zero_durations_fall_back_to_defaults() {
        let config = EngineConfig::from_lookup(|_| Some("0".into()));
        assert_eq!(config.tick, EngineConfig::default().tick);
        assert_eq!(config.history_limit, 0);
    }

    #[test]
    fn backend_config_normalizes_base_url() {
        assert_eq!(
            HttpBackendConfig::new(" http://localhost:5000/ ").unwrap().base_url,
            "http://localhost:5000"
        );
        assert!(HttpBackendConfig::new("  ").is_none());
    }
}
