use crate::core::kernel::signer::HmacAlgorithm;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::path::PathBuf;

/// Shared key the secondary API verifies checkcodes against.
/// Override with `{PREFIX}_SIGNING_KEY` once confirmed against the live verifier.
pub const DEFAULT_SIGNING_KEY: &str = "portal-checkcode-key";

pub const DEFAULT_OUTPUT_PATH: &str = "users.json";

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub base_url: String,
    pub api_url: String,
    pub username: String,
    pub password: Secret<String>,
    pub signing_key: Secret<String>,
    pub algorithm: HmacAlgorithm,
    pub output_path: PathBuf,
    pub timeout_seconds: u64,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for PortalConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("PortalConfig", 8)?;
        state.serialize_field("base_url", &self.base_url)?;
        state.serialize_field("api_url", &self.api_url)?;
        state.serialize_field("username", &self.username)?;
        state.serialize_field("password", "[REDACTED]")?;
        state.serialize_field("signing_key", "[REDACTED]")?;
        state.serialize_field("algorithm", self.algorithm.as_str())?;
        state.serialize_field("output_path", &self.output_path)?;
        state.serialize_field("timeout_seconds", &self.timeout_seconds)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for PortalConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct PortalConfigHelper {
            base_url: String,
            api_url: String,
            username: String,
            password: String,
            signing_key: Option<String>,
            algorithm: Option<String>,
            output_path: Option<PathBuf>,
            timeout_seconds: Option<u64>,
        }

        let helper = PortalConfigHelper::deserialize(deserializer)?;
        let algorithm = match helper.algorithm {
            Some(name) => name
                .parse::<HmacAlgorithm>()
                .map_err(<D::Error as serde::de::Error>::custom)?,
            None => HmacAlgorithm::default(),
        };

        Ok(Self {
            base_url: normalize_origin(&helper.base_url),
            api_url: normalize_origin(&helper.api_url),
            username: helper.username,
            password: Secret::new(helper.password),
            signing_key: Secret::new(
                helper
                    .signing_key
                    .unwrap_or_else(|| DEFAULT_SIGNING_KEY.to_string()),
            ),
            algorithm,
            output_path: helper
                .output_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH)),
            timeout_seconds: helper.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        })
    }
}

impl PortalConfig {
    /// Create a configuration for the two origins and the login credentials
    #[must_use]
    pub fn new(base_url: &str, api_url: &str, username: String, password: String) -> Self {
        Self {
            base_url: normalize_origin(base_url),
            api_url: normalize_origin(api_url),
            username,
            password: Secret::new(password),
            signing_key: Secret::new(DEFAULT_SIGNING_KEY.to_string()),
            algorithm: HmacAlgorithm::default(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_BASE_URL`, `{PREFIX}_API_URL`
    /// - `{PREFIX}_USERNAME`, `{PREFIX}_PASSWORD`
    /// - `{PREFIX}_SIGNING_KEY` (optional)
    /// - `{PREFIX}_SIGNING_ALGORITHM` (optional, `sha256` or `sha512`)
    /// - `{PREFIX}_OUTPUT` (optional, defaults to `users.json`)
    /// - `{PREFIX}_TIMEOUT_SECONDS` (optional, defaults to 30)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let required = |suffix: &str| {
            let name = format!("{}_{}", prefix, suffix);
            env::var(&name).map_err(|_| ConfigError::MissingEnvironmentVariable(name))
        };
        let optional = |suffix: &str| env::var(format!("{}_{}", prefix, suffix)).ok();

        let base_url = required("BASE_URL")?;
        let api_url = required("API_URL")?;
        let username = required("USERNAME")?;
        let password = required("PASSWORD")?;

        let mut config = Self::new(&base_url, &api_url, username, password);

        if let Some(key) = optional("SIGNING_KEY") {
            config = config.signing_key(key);
        }
        if let Some(algorithm) = optional("SIGNING_ALGORITHM") {
            config.algorithm = algorithm.parse()?;
        }
        if let Some(output) = optional("OUTPUT") {
            config.output_path = PathBuf::from(output);
        }
        if let Some(timeout) = optional("TIMEOUT_SECONDS") {
            config.timeout_seconds = timeout.parse().map_err(|e| {
                ConfigError::InvalidConfiguration(format!(
                    "{}_TIMEOUT_SECONDS must be an integer: {}",
                    prefix, e
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from .env file and environment variables
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // fall back to the process environment
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(prefix)
    }

    /// Check that both origins are usable absolute URLs
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (label, origin) in [("base_url", &self.base_url), ("api_url", &self.api_url)] {
            let parsed = url::Url::parse(origin).map_err(|e| {
                ConfigError::InvalidConfiguration(format!(
                    "{} '{}' is not a URL: {}",
                    label, origin, e
                ))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "{} must use http or https",
                    label
                )));
            }
        }

        if self.username.is_empty() {
            return Err(ConfigError::InvalidConfiguration(
                "username must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Set the HMAC key used for checkcodes
    #[must_use]
    pub fn signing_key(mut self, key: String) -> Self {
        self.signing_key = Secret::new(key);
        self
    }

    #[must_use]
    pub const fn algorithm(mut self, algorithm: HmacAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    #[must_use]
    pub const fn timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Get password (use carefully - exposes secret)
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Get signing key (use carefully - exposes secret)
    pub fn signing_key_str(&self) -> &str {
        self.signing_key.expose_secret()
    }
}

fn normalize_origin(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
