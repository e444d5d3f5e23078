use crate::core::config::PortalConfig;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One-time login form token, consumed by the login call
#[derive(Debug, PartialEq, Eq)]
pub struct Nonce(String);

impl Nonce {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Login credentials
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    password: Secret<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: Secret<String>) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl From<&PortalConfig> for Credentials {
    fn from(config: &PortalConfig) -> Self {
        Self::new(config.username.clone(), config.password.clone())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Tokens scraped from the settings page
///
/// All six are required; a partial set is never constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsTokens {
    pub access_token: String,
    pub apiuser: String,
    pub language: String,
    #[serde(rename = "openId")]
    pub open_id: String,
    #[serde(rename = "operateId")]
    pub operate_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

impl SettingsTokens {
    /// Wire names of the six fields
    pub const FIELDS: [&'static str; 6] = [
        "access_token",
        "openId",
        "userId",
        "apiuser",
        "operateId",
        "language",
    ];

    /// Tokens keyed by wire name
    pub fn to_params(&self) -> BTreeMap<String, String> {
        [
            ("access_token", &self.access_token),
            ("apiuser", &self.apiuser),
            ("language", &self.language),
            ("openId", &self.open_id),
            ("operateId", &self.operate_id),
            ("userId", &self.user_id),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
    }
}

/// Tokens plus the timestamp and checkcode computed over them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    pub tokens: SettingsTokens,
    pub timestamp: String,
    pub checkcode: String,
}

impl SignedPayload {
    /// Form fields for the signed call: six tokens, `timestamp`, `checkcode`
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields: Vec<(String, String)> = self.tokens.to_params().into_iter().collect();
        fields.push(("timestamp".to_string(), self.timestamp.clone()));
        fields.push(("checkcode".to_string(), self.checkcode.clone()));
        fields
    }
}

/// A user record from either the bulk listing or the signed endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, email: Option<&str>) -> Self {
        Self {
            id: id.into(),
            first_name: None,
            last_name: None,
            email: email.map(str::to_string),
        }
    }

    /// Same `id`, or same email when both records carry one
    pub fn is_same_identity(&self, other: &Self) -> bool {
        if self.id == other.id {
            return true;
        }
        match (&self.email, &other.email) {
            (Some(a), Some(b)) => !a.is_empty() && a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}

/// Ordered user records, bulk listing order first
pub type UserCollection = Vec<User>;

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
