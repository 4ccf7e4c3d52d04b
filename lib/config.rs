use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// When stale, unreferenced snapshots are swept out of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvictionTrigger {
    /// Only when [`DirCache::evict_stale`](crate::DirCache::evict_stale) is called.
    #[default]
    Manual,
    /// Before every `open` and `list`.
    OnOpen,
    /// Periodically, from a task started with
    /// [`DirCache::spawn_sweeper`](crate::DirCache::spawn_sweeper).
    Interval(
        #[serde(
            serialize_with = "serialize_duration",
            deserialize_with = "deserialize_duration"
        )]
        Duration,
    ),
}

/// The cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DirCacheConfig {
    /// Snapshots older than this become eligible for eviction once no handle references them.
    /// `None` means snapshots never go stale.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_duration",
        deserialize_with = "deserialize_opt_duration"
    )]
    pub max_age: Option<Duration>,

    /// How eviction is driven.
    #[serde(default)]
    pub eviction: EvictionTrigger,
}

impl DirCacheConfig {
    /// Validate the correctness of the configuration.
    ///
    /// Returns a list of human-readable problems if the configuration is unusable.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let EvictionTrigger::Interval(period) = self.eviction {
            if period.is_zero() {
                errors.push("eviction interval must be greater than zero.".to_owned());
            }
            if self.max_age.is_none() {
                errors.push(
                    "interval eviction is configured but max-age is not set, so nothing could \
                     ever be evicted."
                        .to_owned(),
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Deserialize a duration from a human-readable string (e.g., "30s", "5m").
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(&s).map_err(serde::de::Error::custom)
}

fn deserialize_opt_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_duration(deserializer).map(Some)
}

fn serialize_duration<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*d).to_string())
}

#[allow(clippy::ref_option, reason = "signature is dictated by serde's serialize_with")]
fn serialize_opt_duration<S>(d: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match d {
        Some(d) => serialize_duration(d, serializer),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_manual_and_never_stale() {
        let config: DirCacheConfig = toml::from_str("").unwrap();
        assert_eq!(config, DirCacheConfig::default());
        assert_eq!(config.eviction, EvictionTrigger::Manual);
        assert!(config.max_age.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_humantime_durations() {
        let config: DirCacheConfig = toml::from_str(
            r#"
            max-age = "1m 30s"
            eviction = { interval = "250ms" }
            "#,
        )
        .unwrap();
        assert_eq!(config.max_age, Some(Duration::from_secs(90)));
        assert_eq!(
            config.eviction,
            EvictionTrigger::Interval(Duration::from_millis(250))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_on_open_trigger() {
        let config: DirCacheConfig = toml::from_str(
            r#"
            max-age = "10s"
            eviction = "on-open"
            "#,
        )
        .unwrap();
        assert_eq!(config.eviction, EvictionTrigger::OnOpen);
    }

    #[test]
    fn rejects_garbage_durations() {
        let parsed: Result<DirCacheConfig, _> = toml::from_str(r#"max-age = "soon""#);
        assert!(parsed.is_err());
    }

    #[test]
    fn interval_without_max_age_is_invalid() {
        let config = DirCacheConfig {
            max_age: None,
            eviction: EvictionTrigger::Interval(Duration::ZERO),
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn serializes_back_to_humantime() {
        let config = DirCacheConfig {
            max_age: Some(Duration::from_secs(30)),
            eviction: EvictionTrigger::OnOpen,
        };
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains(r#"max-age = "30s""#), "{text}");
        let back: DirCacheConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
