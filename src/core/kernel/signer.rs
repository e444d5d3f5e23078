use crate::core::config::ConfigError;
use crate::core::errors::SessionError;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::{Sha256, Sha512};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Signer trait for request authentication
///
/// Implementations turn a flat parameter set into a checksum the remote
/// verifier recomputes. The same inputs must always produce the same output.
pub trait Signer: Send + Sync {
    /// Sign a flat parameter set and return the rendered signature
    fn sign_params(&self, params: &BTreeMap<String, String>) -> Result<String, SessionError>;
}

/// Digest used inside the HMAC
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HmacAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl HmacAlgorithm {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for HmacAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HmacAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "hmac-sha256" => Ok(Self::Sha256),
            "sha512" | "hmac-sha512" => Ok(Self::Sha512),
            other => Err(ConfigError::InvalidConfiguration(format!(
                "Unsupported signing algorithm: {}",
                other
            ))),
        }
    }
}

/// Build the canonical query string: keys in byte order, values
/// form-urlencoded (space becomes `+`), pairs joined with `&`.
///
/// Keys are emitted verbatim; they are fixed ASCII identifiers.
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, encode_value(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encode a single query value the way `URLSearchParams` does
pub fn encode_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// HMAC signer over the canonical query string, rendered as uppercase hex
pub struct HmacSigner {
    secret_key: Secret<String>,
    algorithm: HmacAlgorithm,
}

impl fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacSigner")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl HmacSigner {
    /// Create a new HMAC signer
    ///
    /// # Arguments
    /// * `secret_key` - Shared key the verifier uses
    /// * `algorithm` - Digest the verifier expects
    pub fn new(secret_key: Secret<String>, algorithm: HmacAlgorithm) -> Self {
        Self {
            secret_key,
            algorithm,
        }
    }

    pub const fn algorithm(&self) -> HmacAlgorithm {
        self.algorithm
    }

    fn digest(&self, message: &[u8]) -> Result<Vec<u8>, SessionError> {
        let key = self.secret_key.expose_secret().as_bytes();
        if key.is_empty() {
            return Err(SessionError::SigningMisconfiguration(
                "Signing key is empty".to_string(),
            ));
        }

        match self.algorithm {
            HmacAlgorithm::Sha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(|e| {
                    SessionError::SigningMisconfiguration(format!("Invalid secret key: {}", e))
                })?;
                mac.update(message);
                Ok(mac.finalize().into_bytes().to_vec())
            }
            HmacAlgorithm::Sha512 => {
                let mut mac = Hmac::<Sha512>::new_from_slice(key).map_err(|e| {
                    SessionError::SigningMisconfiguration(format!("Invalid secret key: {}", e))
                })?;
                mac.update(message);
                Ok(mac.finalize().into_bytes().to_vec())
            }
        }
    }
}

impl Signer for HmacSigner {
    fn sign_params(&self, params: &BTreeMap<String, String>) -> Result<String, SessionError> {
        let canonical = canonical_query(params);
        let digest = self.digest(canonical.as_bytes())?;
        Ok(hex::encode_upper(digest))
    }
}
