//! Game configuration loading: the round script and the reconciliation cadence.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use validator::{Validate, ValidationErrors};

use crate::content::{self, ContentError, RoundSpec};

/// Default location on disk where the engine looks for the JSON round script.
const DEFAULT_CONFIG_PATH: &str = "config/game.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CIPHER_HUNT_CONFIG_PATH";
/// Poll cadence used when the file does not set one.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Why a present configuration file was rejected.
///
/// A missing file is not an error: the engine falls back to the built-in
/// round script. A file that exists but cannot be trusted fails loudly,
/// because silently substituting the built-in rounds would hand every
/// participant the wrong game.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The file is not valid JSON for the expected shape.
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying JSON failure.
        source: serde_json::Error,
    },
    /// A field is out of its allowed range.
    #[error("invalid config at {}: {errors}", path.display())]
    Invalid {
        /// Path that was attempted.
        path: PathBuf,
        /// Field-level findings.
        errors: ValidationErrors,
    },
    /// The round script itself is unplayable.
    #[error("unplayable round script in {}: {source}", path.display())]
    Content {
        /// Path that was attempted.
        path: PathBuf,
        /// The first defect found in the rounds.
        source: ContentError,
    },
}

/// Immutable runtime configuration: the round script and the poll cadence.
#[derive(Debug, Clone)]
pub struct HuntConfig {
    rounds: Vec<RoundSpec>,
    poll_interval: Duration,
}

impl HuntConfig {
    /// Load the configuration from disk, falling back to the built-in round
    /// script when no file is present.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(resolve_config_path())
    }

    /// Load the configuration from an explicit path.
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using the built-in round script"
                );
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        let raw: RawConfig = serde_json::from_str(&contents).map_err(|source| {
            ConfigError::Parse {
                path: path.clone(),
                source,
            }
        })?;
        raw.validate().map_err(|errors| ConfigError::Invalid {
            path: path.clone(),
            errors,
        })?;
        content::validate_rounds(&raw.rounds).map_err(|source| ConfigError::Content {
            path: path.clone(),
            source,
        })?;

        info!(
            path = %path.display(),
            rounds = raw.rounds.len(),
            poll_interval_secs = raw.poll_interval_secs,
            "loaded round script from config"
        );
        Ok(Self {
            rounds: raw.rounds,
            poll_interval: Duration::from_secs(raw.poll_interval_secs),
        })
    }

    /// The authored rounds, in play order.
    pub fn rounds(&self) -> &[RoundSpec] {
        &self.rounds
    }

    /// Consume the configuration, yielding the rounds for the engine.
    pub fn into_rounds(self) -> Vec<RoundSpec> {
        self.rounds
    }

    /// How often the engine reconciles against the remote store.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for HuntConfig {
    fn default() -> Self {
        Self {
            rounds: content::builtin_rounds(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

/// JSON representation of the configuration file at [`DEFAULT_CONFIG_PATH`].
#[derive(Debug, Deserialize, Validate)]
struct RawConfig {
    #[serde(default = "default_poll_interval_secs")]
    #[validate(range(min = 1, max = 300))]
    poll_interval_secs: u64,
    #[validate(length(min = 1))]
    rounds: Vec<RoundSpec>,
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process;

    fn temp_path(tag: &str) -> PathBuf {
        env::temp_dir().join(format!("cipher-hunt-config-{tag}-{}.json", process::id()))
    }

    fn write_temp(tag: &str, contents: &str) -> PathBuf {
        let path = temp_path(tag);
        fs::write(&path, contents).unwrap();
        path
    }

    const VALID: &str = r#"{
        "poll_interval_secs": 30,
        "rounds": [
            {
                "title": "Warmup",
                "countdown_secs": 60,
                "points_per_question": 10,
                "gate_secret": "warmup_gate",
                "hint": "Check the lobby noticeboard.",
                "pools": [
                    {
                        "salt": "warmup",
                        "questions": [
                            {
                                "prompt": "2 + 2?",
                                "options": ["3", "4", "5", "6"],
                                "correct_index": 1
                            }
                        ]
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn missing_file_falls_back_to_the_builtin_script() {
        let config = HuntConfig::load_from(temp_path("missing")).unwrap();
        assert_eq!(config.rounds().len(), 4);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn valid_file_loads_with_its_own_cadence() {
        let path = write_temp("valid", VALID);
        let config = HuntConfig::load_from(path.clone()).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.rounds().len(), 1);
        assert_eq!(config.rounds()[0].title, "Warmup");
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
    }

    #[test]
    fn poll_interval_defaults_when_omitted() {
        let trimmed = VALID.replacen("\"poll_interval_secs\": 30,", "", 1);
        let path = write_temp("default-cadence", &trimmed);
        let config = HuntConfig::load_from(path.clone()).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let path = write_temp("malformed", "{ this is not json");
        let err = HuntConfig::load_from(path.clone()).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let broken = VALID.replacen(
            "\"poll_interval_secs\": 30,",
            "\"poll_interval_secs\": 0,",
            1,
        );
        let path = write_temp("zero-cadence", &broken);
        let err = HuntConfig::load_from(path.clone()).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn unplayable_rounds_are_rejected() {
        let broken = VALID.replace(
            r#""questions": [
                            {
                                "prompt": "2 + 2?",
                                "options": ["3", "4", "5", "6"],
                                "correct_index": 1
                            }
                        ]"#,
            r#""questions": []"#,
        );
        let path = write_temp("empty-pool", &broken);
        let err = HuntConfig::load_from(path.clone()).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(matches!(err, ConfigError::Content { .. }));
    }
}
