use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgSslMode};
use thiserror::Error;
use url::Url;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MARKET_DATA_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: usize = 150;
pub const DEFAULT_PORT: u16 = 4000;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} missing")]
    Missing(&'static str),
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Reads a variable, treating empty values as unset.
fn lookup_non_empty<F>(lookup: &F, var: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup_non_empty(lookup, var).ok_or(ConfigError::Missing(var))
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup_non_empty(lookup, var) {
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn env_lookup(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub ssl_mode: PgSslMode,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = require(&lookup, "DATABASE_URL")?;

        // Plaintext modes are rejected: the store must be reached over TLS.
        let ssl_mode = match lookup_non_empty(&lookup, "PG_SSL_MODE").as_deref() {
            None | Some("require") => PgSslMode::Require,
            Some("verify-ca") => PgSslMode::VerifyCa,
            Some("verify-full") => PgSslMode::VerifyFull,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "PG_SSL_MODE",
                    reason: format!(
                        "'{}' is not allowed (use require, verify-ca or verify-full)",
                        other
                    ),
                })
            }
        };

        Ok(Self { url, ssl_mode })
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        let options = PgConnectOptions::from_str(&self.url).map_err(|e| ConfigError::Invalid {
            var: "DATABASE_URL",
            reason: e.to_string(),
        })?;
        Ok(options.ssl_mode(self.ssl_mode))
    }
}

/// Settings for the chat completion call.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: usize,
    pub temperature: f32,
}

impl LlmConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = require(&lookup, "OPENAI_API_KEY")?;
        let model = lookup_non_empty(&lookup, "OPENAI_MODEL")
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
        let base_url = lookup_non_empty(&lookup, "OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());

        let temperature: f32 = parse_or(&lookup, "OPENAI_TEMPERATURE", DEFAULT_TEMPERATURE)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid {
                var: "OPENAI_TEMPERATURE",
                reason: format!("{} is outside 0..=2", temperature),
            });
        }

        let max_tokens: usize = parse_or(&lookup, "OPENAI_MAX_TOKENS", DEFAULT_MAX_TOKENS)?;
        if max_tokens == 0 {
            return Err(ConfigError::Invalid {
                var: "OPENAI_MAX_TOKENS",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens,
            temperature,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MarketDataConfig {
    pub base_url: Url,
}

impl MarketDataConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup_non_empty(&lookup, "MARKET_DATA_BASE_URL")
            .unwrap_or_else(|| DEFAULT_MARKET_DATA_BASE_URL.to_string());
        let base_url = Url::parse(&raw).map_err(|e| ConfigError::Invalid {
            var: "MARKET_DATA_BASE_URL",
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                var: "MARKET_DATA_BASE_URL",
                reason: format!("'{}' cannot hold a path", raw),
            });
        }
        Ok(Self { base_url })
    }
}

/// Everything a pipeline run needs. Built once at process entry.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub database: DatabaseConfig,
    pub market_data: MarketDataConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            llm: LlmConfig::from_lookup(&lookup)?,
            database: DatabaseConfig::from_lookup(&lookup)?,
            market_data: MarketDataConfig::from_lookup(&lookup)?,
        })
    }
}

pub fn server_port_from_env() -> Result<u16, ConfigError> {
    parse_or(&env_lookup, "PORT", DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_missing_openai_key_is_fatal() {
        let result = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/db")]));
        assert_eq!(result.unwrap_err(), ConfigError::Missing("OPENAI_API_KEY"));
    }

    #[test]
    fn test_missing_database_url_is_fatal() {
        let result = AppConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")]));
        assert_eq!(result.unwrap_err(), ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "  "),
            ("DATABASE_URL", "postgres://localhost/db"),
        ]));
        assert_eq!(result.unwrap_err(), ConfigError::Missing("OPENAI_API_KEY"));
    }

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("DATABASE_URL", "postgres://localhost/db"),
        ]))
        .unwrap();

        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.llm.max_tokens, 150);
        assert_eq!(config.llm.temperature, 0.7);
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(config.market_data.base_url.as_str(), "https://query1.finance.yahoo.com/");
        assert!(matches!(config.database.ssl_mode, PgSslMode::Require));
    }

    #[test]
    fn test_overrides_parsed() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("DATABASE_URL", "postgres://localhost/db"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("OPENAI_TEMPERATURE", "0.2"),
            ("OPENAI_MAX_TOKENS", "300"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
            ("PG_SSL_MODE", "verify-full"),
        ]))
        .unwrap();

        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.temperature, 0.2);
        assert_eq!(config.llm.max_tokens, 300);
        assert_eq!(config.llm.base_url, "http://localhost:8080/v1");
        assert!(matches!(config.database.ssl_mode, PgSslMode::VerifyFull));
    }

    #[test]
    fn test_market_data_base_url_must_parse() {
        let result = MarketDataConfig::from_lookup(lookup_from(&[("MARKET_DATA_BASE_URL", "not a url")]));
        assert!(matches!(result, Err(ConfigError::Invalid { var: "MARKET_DATA_BASE_URL", .. })));

        let result = MarketDataConfig::from_lookup(lookup_from(&[("MARKET_DATA_BASE_URL", "mailto:quotes@example.com")]));
        assert!(matches!(result, Err(ConfigError::Invalid { var: "MARKET_DATA_BASE_URL", .. })));
    }

    #[test]
    fn test_plaintext_ssl_mode_rejected() {
        let result = DatabaseConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("PG_SSL_MODE", "disable"),
        ]));
        assert!(matches!(result, Err(ConfigError::Invalid { var: "PG_SSL_MODE", .. })));
    }

    #[test]
    fn test_temperature_out_of_range_rejected() {
        let result = LlmConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_TEMPERATURE", "3.5"),
        ]));
        assert!(matches!(result, Err(ConfigError::Invalid { var: "OPENAI_TEMPERATURE", .. })));
    }

    #[test]
    fn test_zero_max_tokens_rejected() {
        let result = LlmConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MAX_TOKENS", "0"),
        ]));
        assert!(matches!(result, Err(ConfigError::Invalid { var: "OPENAI_MAX_TOKENS", .. })));
    }

    #[test]
    fn test_connect_options_rejects_bad_url() {
        let config = DatabaseConfig {
            url: "not a url".to_string(),
            ssl_mode: PgSslMode::Require,
        };
        assert!(config.connect_options().is_err());
    }
}
