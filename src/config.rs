//! The UI configuration document: where the REST service lives, how dates map
//! onto element properties, and the defaults for result limits and options.

use std::{collections::BTreeMap, fs, time::Duration};

use camino::Utf8Path;
use derive_getters::Getters;
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use url::Url;

use crate::{error::ConfigError, stores::Settings};

/// Result limit used when the config does not set one
pub const DEFAULT_RESULT_LIMIT: usize = 1000;

/// Parsed contents of the UI's `config.json`
#[derive(Clone, Debug, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfig {
    rest_endpoint: Url,
    #[serde(default)]
    time: Option<TimeConfig>,
    #[serde(default = "default_result_limit")]
    #[getter(skip)]
    result_limit: usize,
    /// Operation option keys the user may set, with their display labels
    #[serde(default)]
    #[getter(skip)]
    operation_options: BTreeMap<String, String>,
    #[serde(default)]
    #[getter(skip)]
    timeout_seconds: Option<u64>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    accept_invalid_certificates: bool,
}

const fn default_result_limit() -> usize {
    DEFAULT_RESULT_LIMIT
}

/// How a date range maps onto element properties
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TimeConfig {
    pub filter: TimeFilter,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeFilter {
    /// Class of the date values, e.g. `java.lang.Long`
    pub class: String,
    pub start_property: String,
    pub end_property: String,
}

impl QueryConfig {
    /// Reads and parses a config file
    pub fn load(path: &Utf8Path) -> Result<QueryConfig, ConfigError> {
        tracing::debug!("reading config from {}", path);
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    /// The configured extra headers as an HTTP [`HeaderMap`]
    pub fn header_map(&self) -> Result<HeaderMap, ConfigError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let invalid = || ConfigError::InvalidHeader { name: name.clone() };
            let header_name = HeaderName::try_from(name.as_str()).map_err(|_| invalid())?;
            let mut header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            if header_name == http::header::AUTHORIZATION {
                header_value.set_sensitive(true);
            }
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}

impl Settings for QueryConfig {
    fn result_limit(&self) -> usize {
        self.result_limit
    }

    fn operation_option_keys(&self) -> BTreeMap<String, String> {
        self.operation_options.clone()
    }
}
