//! Client configuration.
//!
//! Each setting resolves from the first source that yields a value:
//!
//! 1. an explicit argument (`ClientConfig::builder().api_key(..)`)
//! 2. the environment (`PM_API_KEY`, `PM_BASE_URL`)
//! 3. the INI file `~/.promethium.ini`
//!
//! ```ini
//! [Credentials]
//! api_key = ...
//!
//! [Connection]
//! base_url = https://api.promethium.qcware.com
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use tracing::debug;

use crate::error::{ConfigError, PromethiumResult};
use crate::models::StatusVocabulary;

/// Public service endpoint written by [`ensure_config`].
pub const DEFAULT_BASE_URL: &str = "https://api.promethium.qcware.com";

/// Config file name, placed in the home directory.
pub const CONFIG_FILENAME: &str = ".promethium.ini";

pub const API_KEY_ENV: &str = "PM_API_KEY";
pub const BASE_URL_ENV: &str = "PM_BASE_URL";

pub const CREDENTIALS_SECTION: &str = "Credentials";
pub const CONNECTION_SECTION: &str = "Connection";
pub const API_KEY_KEY: &str = "api_key";
pub const BASE_URL_KEY: &str = "base_url";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sections of an INI file, each mapping keys to values.
pub type ConfigValues = BTreeMap<String, BTreeMap<String, String>>;

/// Default config file location, `~/.promethium.ini`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILENAME))
}

fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match path {
        Some(p) => Ok(p.to_path_buf()),
        None => default_config_path().ok_or_else(|| ConfigError::Read {
            path: CONFIG_FILENAME.to_string(),
            message: "home directory could not be determined".into(),
        }),
    }
}

/// Read every section of the config file.
///
/// A missing file reads as empty.
pub fn read_config(path: Option<&Path>) -> Result<ConfigValues, ConfigError> {
    let path = resolve_path(path)?;
    if !path.exists() {
        return Ok(ConfigValues::new());
    }
    let ini = Ini::load_from_file(&path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut values = ConfigValues::new();
    for (section, props) in ini.iter() {
        let Some(section) = section else { continue };
        let entry = values.entry(section.to_string()).or_default();
        for (key, value) in props.iter() {
            entry.insert(key.to_string(), value.to_string());
        }
    }
    Ok(values)
}

/// Set one key, keeping every other section and key in the file.
pub fn write_config_value(
    section: &str,
    key: &str,
    value: &str,
    path: Option<&Path>,
) -> Result<PathBuf, ConfigError> {
    let path = resolve_path(path)?;
    let mut ini = if path.exists() {
        Ini::load_from_file(&path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?
    } else {
        Ini::new()
    };

    ini.with_section(Some(section)).set(key, value);
    ini.write_to_file(&path).map_err(|e| ConfigError::Write {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    debug!("Wrote [{}] {} to {}", section, key, path.display());
    Ok(path)
}

/// Create the config file with the default base URL if it does not exist.
pub fn ensure_config(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = resolve_path(path)?;
    if path.exists() {
        return Ok(path);
    }
    write_config_value(CONNECTION_SECTION, BASE_URL_KEY, DEFAULT_BASE_URL, Some(&path))
}

/// Resolved connection settings.
#[derive(Clone)]
pub struct ClientConfig {
    base_url: String,
    api_key: String,
    request_timeout: Duration,
    connect_timeout: Duration,
    vocabulary: StatusVocabulary,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Configuration with every value given explicitly.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            vocabulary: StatusVocabulary::default(),
        }
    }

    /// Start resolving from explicit values, environment, and config file.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Resolve from the environment and the default config file.
    pub fn from_env() -> PromethiumResult<Self> {
        Ok(Self::builder().resolve()?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Terminal-status vocabulary used by waits that do not override it.
    pub fn vocabulary(&self) -> &StatusVocabulary {
        &self.vocabulary
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_vocabulary(mut self, vocabulary: StatusVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }
}

/// Collects explicit values before falling back to env and file.
#[derive(Debug, Default, Clone)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    config_path: Option<PathBuf>,
    env: Option<BTreeMap<String, String>>,
}

impl ClientConfigBuilder {
    pub fn api_key(mut self, api_key: Option<impl Into<String>>) -> Self {
        self.api_key = api_key.map(Into::into);
        self
    }

    pub fn base_url(mut self, base_url: Option<impl Into<String>>) -> Self {
        self.base_url = base_url.map(Into::into);
        self
    }

    /// Read this INI file instead of `~/.promethium.ini`.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Use these variables instead of the process environment.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    fn env_var(&self, name: &str) -> Option<String> {
        match &self.env {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }

    /// Resolve both settings. The config file is read only when needed.
    pub fn resolve(self) -> Result<ClientConfig, ConfigError> {
        let mut file: Option<ConfigValues> = None;
        let mut from_file = |section: &str, key: &str| -> Result<Option<String>, ConfigError> {
            if file.is_none() {
                file = Some(read_config(self.config_path.as_deref())?);
            }
            Ok(file
                .as_ref()
                .and_then(|values| values.get(section))
                .and_then(|s| s.get(key))
                .cloned())
        };

        let explicit_key =
            non_empty(self.api_key.clone()).or_else(|| non_empty(self.env_var(API_KEY_ENV)));
        let api_key = match explicit_key {
            Some(key) => key,
            None => non_empty(from_file(CREDENTIALS_SECTION, API_KEY_KEY)?)
                .ok_or(ConfigError::MissingApiKey)?,
        };
        let explicit_url =
            non_empty(self.base_url.clone()).or_else(|| non_empty(self.env_var(BASE_URL_ENV)));
        let base_url = match explicit_url {
            Some(url) => url,
            None => non_empty(from_file(CONNECTION_SECTION, BASE_URL_KEY)?)
                .ok_or(ConfigError::MissingBaseUrl)?,
        };

        Ok(ClientConfig::new(base_url, api_key))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env() -> Vec<(String, String)> {
        Vec::new()
    }

    #[test]
    fn test_explicit_beats_env_and_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        write_config_value(CREDENTIALS_SECTION, API_KEY_KEY, "from-file", Some(&path)).unwrap();

        let config = ClientConfig::builder()
            .api_key(Some("explicit"))
            .base_url(Some("http://localhost:8000"))
            .with_env([(API_KEY_ENV, "from-env")])
            .with_config_path(&path)
            .resolve()
            .unwrap();
        assert_eq!(config.api_key(), "explicit");
        assert_eq!(config.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_env_beats_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        write_config_value(CREDENTIALS_SECTION, API_KEY_KEY, "from-file", Some(&path)).unwrap();
        write_config_value(CONNECTION_SECTION, BASE_URL_KEY, "http://file", Some(&path)).unwrap();

        let config = ClientConfig::builder()
            .api_key(None::<String>)
            .with_env([(API_KEY_ENV, "from-env")])
            .with_config_path(&path)
            .resolve()
            .unwrap();
        assert_eq!(config.api_key(), "from-env");
        assert_eq!(config.base_url(), "http://file");
    }

    #[test]
    fn test_missing_values_are_distinguished() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);

        let err = ClientConfig::builder()
            .with_env(no_env())
            .with_config_path(&path)
            .resolve()
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));

        let err = ClientConfig::builder()
            .api_key(Some("k"))
            .with_env(no_env())
            .with_config_path(&path)
            .resolve()
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingBaseUrl));
    }

    #[test]
    fn test_write_preserves_other_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        ensure_config(Some(&path)).unwrap();
        write_config_value(CREDENTIALS_SECTION, API_KEY_KEY, "secret", Some(&path)).unwrap();

        let values = read_config(Some(&path)).unwrap();
        assert_eq!(values[CONNECTION_SECTION][BASE_URL_KEY], DEFAULT_BASE_URL);
        assert_eq!(values[CREDENTIALS_SECTION][API_KEY_KEY], "secret");
    }

    #[test]
    fn test_ensure_config_keeps_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        write_config_value(CONNECTION_SECTION, BASE_URL_KEY, "http://custom", Some(&path)).unwrap();
        ensure_config(Some(&path)).unwrap();
        let values = read_config(Some(&path)).unwrap();
        assert_eq!(values[CONNECTION_SECTION][BASE_URL_KEY], "http://custom");
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let values = read_config(Some(&dir.path().join("absent.ini"))).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ClientConfig::new("http://localhost", "super-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
