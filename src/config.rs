use std::collections::HashMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

use chrono_tz::Tz;
use thiserror::Error;

use crate::clients::{calcom_client, openai_client};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config line {line}: {content}")]
    Syntax { line: usize, content: String },
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Key/value pairs from an env-style file (`KEY=value`, `#` comments, optional `export `).
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::Syntax {
                    line: idx + 1,
                    content: line.to_string(),
                });
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Api,
    Cli,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct CalComSettings {
    pub api_key: String,
    pub base_url: String,
    pub event_type_id: Option<i64>,
    pub attendee_name: Option<String>,
    pub attendee_email: Option<String>,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct OpenAISettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub resolver_model: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub calcom: CalComSettings,
    pub openai: OpenAISettings,
    pub time_zone: Tz,
    pub bind_address: SocketAddr,
    pub http_timeout: Duration,
    pub run_mode: RunMode,
    pub logging: LogSettings,
}

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8000";
const DEFAULT_TIME_ZONE: &str = "America/New_York";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

impl Settings {
    /// File values win over the process environment.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| config.get(key).or_else(|| env::var(key).ok()))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let time_zone_name = get("BOOKING_TIMEZONE").unwrap_or(DEFAULT_TIME_ZONE.to_string());
        let time_zone: Tz = time_zone_name.parse().map_err(|_| ConfigError::Invalid {
            key: "BOOKING_TIMEZONE",
            value: time_zone_name.clone(),
        })?;

        let event_type_id = match get("CALCOM_EVENT_TYPE_ID") {
            Some(raw) => Some(raw.trim().parse::<i64>().map_err(|_| ConfigError::Invalid {
                key: "CALCOM_EVENT_TYPE_ID",
                value: raw,
            })?),
            None => None,
        };

        let bind_raw = get("BIND_ADDRESS").unwrap_or(DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = bind_raw.parse::<SocketAddr>().map_err(|_| ConfigError::Invalid {
            key: "BIND_ADDRESS",
            value: bind_raw.clone(),
        })?;

        let http_timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "HTTP_TIMEOUT_SECS",
                        value: raw,
                    });
                }
            },
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let run_mode = match get("RUN_MODE").as_deref().map(str::trim) {
            None | Some("api") => RunMode::Api,
            Some("cli") => RunMode::Cli,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "RUN_MODE",
                    value: other.to_string(),
                });
            }
        };

        let format = match get("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("compact") => LogFormat::Compact,
            Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "LOG_FORMAT",
                    value: other.to_string(),
                });
            }
        };

        Ok(Settings {
            calcom: CalComSettings {
                api_key: require("CALCOM_API_KEY")?,
                base_url: get("CALCOM_BASE_URL")
                    .unwrap_or(calcom_client::DEFAULT_BASE_URL.to_string()),
                event_type_id,
                attendee_name: get("ATTENDEE_NAME"),
                attendee_email: get("ATTENDEE_EMAIL"),
                language: get("BOOKING_LANGUAGE").unwrap_or("en".to_string()),
            },
            openai: OpenAISettings {
                api_key: require("OPENAI_API_KEY")?,
                base_url: get("OPENAI_BASE_URL")
                    .unwrap_or(openai_client::DEFAULT_BASE_URL.to_string()),
                model: get("OPENAI_MODEL").unwrap_or("gpt-4o".to_string()),
                resolver_model: get("RESOLVER_MODEL").unwrap_or("gpt-4o-mini".to_string()),
            },
            time_zone,
            bind_address,
            http_timeout,
            run_mode,
            logging: LogSettings {
                level: get("LOG_LEVEL").unwrap_or("info".to_string()),
                format,
            },
        })
    }
}
