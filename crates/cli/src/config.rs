//! Configuration loading for the `hxenc` binary.
//!
//! Settings come from two layers: an optional JSON config file and command
//! line flags. Flags win. Anything still unset falls back to the defaults in
//! [`Settings`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use host::{ExtensionName, Headers, HostConfig};
use json_enc::NumberCoercion;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Base URL used when neither the file nor the flags provide one.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:9005/";

/// Errors raised while loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid base URL '{url}': {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Contents of the JSON config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub current_url: Option<String>,
    pub extensions: Option<Vec<ExtensionName>>,
    pub coercion: Option<NumberCoercion>,
    pub headers: Headers,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Reads and parses the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Values supplied on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub extensions: Vec<ExtensionName>,
    pub coercion: Option<NumberCoercion>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: HostConfig,
    pub coercion: NumberCoercion,
    pub timeout: Duration,
}

impl Settings {
    /// Layers `overrides` over `file` and fills in defaults.
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, ConfigError> {
        let base = overrides
            .base_url
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base).map_err(|source| ConfigError::BaseUrl { url: base, source })?;

        let extensions = if !overrides.extensions.is_empty() {
            overrides.extensions
        } else {
            file.extensions
                .unwrap_or_else(|| vec![ExtensionName::from_static(json_enc::EXTENSION_NAME)])
        };

        let mut host = HostConfig::new(base_url);
        host.extensions = extensions;
        host.default_headers = file.headers;
        host.current_url = file.current_url;

        Ok(Self {
            host,
            coercion: overrides.coercion.or(file.coercion).unwrap_or_default(),
            timeout: overrides
                .timeout_secs
                .or(file.timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(transport::DEFAULT_TIMEOUT),
        })
    }
}
