//! Configuration consumed from the host: monitored addresses, refresh rate and request template.

use std::fs;
use std::io::Error as IoError;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use toml::de::Error as TomlError;

use crate::model::AddressQuery;

/// Default lookup endpoint; `%s` is replaced by the street.
pub const DEFAULT_RESOURCE: &str = "https://api.bezstavy.cz/cezd/api/inspectaddress/%s";
/// Default request body.
pub const DEFAULT_PAYLOAD: &str = r#"{"ulice":"","mesto":"Statenice","psc":""}"#;
/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default display name.
pub const DEFAULT_NAME: &str = "ČEZ outages";

const STREET_PLACEHOLDER: &str = "%s";

#[derive(thiserror::Error, Debug)]
/// Errors surfaced while loading or validating configuration.
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config: {0}")]
    Io(#[from] IoError),
    /// Config file is not valid TOML or has the wrong shape.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] TomlError),
    /// No street configured.
    #[error("At least one street must be configured")]
    NoStreets,
    /// A configured street is blank.
    #[error("Street #{0} is blank")]
    BlankStreet(usize),
    /// Refresh rate is zero.
    #[error("Refresh rate must be greater than zero")]
    InvalidRefreshRate,
    /// Request timeout is zero.
    #[error("Request timeout must be greater than zero")]
    InvalidTimeout,
    /// Concurrency cap is zero.
    #[error("Concurrency cap must be greater than zero")]
    InvalidConcurrency,
    /// A password was configured without a username.
    #[error("Password configured without a username")]
    PasswordWithoutUsername,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
/// HTTP method used for the lookup.
pub enum HttpMethod {
    /// GET (default).
    #[default]
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Template every per-address request is built from.
pub struct RequestTemplate {
    /// URL template, `%s` is replaced by the street.
    pub resource: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Static body; empty sends no body.
    pub payload: String,
    /// Verify TLS certificates.
    pub verify_ssl: bool,
    /// Timeout per request in seconds.
    pub timeout: u64,
    /// Maximum lookups in flight; defaults to the number of streets.
    pub max_concurrent: Option<usize>,
    /// Optional static basic-auth username.
    pub username: Option<String>,
    /// Optional static basic-auth password.
    pub password: Option<String>,
}

impl Default for RequestTemplate {
    fn default() -> Self {
        Self {
            resource: DEFAULT_RESOURCE.to_owned(),
            method: HttpMethod::Get,
            payload: DEFAULT_PAYLOAD.to_owned(),
            verify_ssl: true,
            timeout: DEFAULT_TIMEOUT_SECS,
            max_concurrent: None,
            username: None,
            password: None,
        }
    }
}

impl RequestTemplate {
    /// Resolve the URL for one address.
    #[must_use]
    pub fn resolve_url(&self, query: &AddressQuery) -> String {
        self.resource
            .replace(STREET_PLACEHOLDER, query.street.trim())
    }

    /// Body to send, if any.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        let payload = self.payload.trim();
        (!payload.is_empty()).then_some(payload)
    }

    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Logging settings read by the host binary.
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: Option<String>,
    /// File to append log lines to; logging is off without it.
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Full configuration of one outage monitor.
pub struct OutageConfig {
    /// Display name of the produced signal.
    #[serde(default = "default_name")]
    pub name: String,
    /// Monitored streets, in order.
    pub streets: Vec<String>,
    /// Optional house numbers, paired with `streets` by index.
    #[serde(default)]
    pub street_numbers: Vec<String>,
    /// Optional parcel numbers, paired with `streets` by index.
    #[serde(default)]
    pub parcel_numbers: Vec<String>,
    /// Minimum seconds between network refresh cycles.
    pub refresh_rate: u64,
    /// Request template.
    #[serde(default)]
    pub request: RequestTemplate,
    /// Host logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_name() -> String {
    DEFAULT_NAME.to_owned()
}

impl OutageConfig {
    /// Read, parse and validate a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the document cannot be parsed or validated.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the core relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.streets.is_empty() {
            return Err(ConfigError::NoStreets);
        }
        if let Some(index) = self
            .streets
            .iter()
            .position(|street| street.trim().is_empty())
        {
            return Err(ConfigError::BlankStreet(index));
        }
        if self.refresh_rate == 0 {
            return Err(ConfigError::InvalidRefreshRate);
        }
        if self.request.timeout == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.request.max_concurrent == Some(0) {
            return Err(ConfigError::InvalidConcurrency);
        }
        if self.request.password.is_some() && self.request.username.is_none() {
            return Err(ConfigError::PasswordWithoutUsername);
        }
        Ok(())
    }

    /// Refresh interval as a time delta.
    #[must_use]
    pub fn refresh_interval(&self) -> TimeDelta {
        i64::try_from(self.refresh_rate)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    /// Lookup cap, defaulting to one in-flight request per street.
    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.request.max_concurrent.unwrap_or(self.streets.len())
    }

    /// One query per configured street, with house and parcel numbers paired by index.
    #[must_use]
    pub fn address_queries(&self) -> Vec<AddressQuery> {
        self.streets
            .iter()
            .enumerate()
            .map(|(index, street)| AddressQuery {
                street: street.trim().to_owned(),
                house_number: non_blank(self.street_numbers.get(index)),
                parcel_number: non_blank(self.parcel_numbers.get(index)),
            })
            .collect()
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|raw| raw.trim())
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_owned)
}
