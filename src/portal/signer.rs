use crate::core::errors::SessionError;
use crate::core::kernel::signer::{HmacAlgorithm, HmacSigner, Signer};
use crate::portal::types::{SettingsTokens, SignedPayload};
use secrecy::Secret;
use std::sync::Arc;

/// Source of the signing timestamp
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch
    fn now_unix(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_unix(&self) -> i64 {
        self.0
    }
}

/// Computes the `checkcode` the secondary API verifies
pub struct ChecksumSigner {
    signer: Arc<dyn Signer>,
    clock: Arc<dyn Clock>,
}

impl ChecksumSigner {
    pub fn new(signer: Arc<dyn Signer>, clock: Arc<dyn Clock>) -> Self {
        Self { signer, clock }
    }

    /// HMAC signer on the system clock
    pub fn hmac(secret_key: Secret<String>, algorithm: HmacAlgorithm) -> Self {
        Self::new(
            Arc::new(HmacSigner::new(secret_key, algorithm)),
            Arc::new(SystemClock),
        )
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Checkcode over the six tokens plus `timestamp`
    pub fn checkcode(
        &self,
        tokens: &SettingsTokens,
        timestamp: &str,
    ) -> Result<String, SessionError> {
        let mut params = tokens.to_params();
        params.insert("timestamp".to_string(), timestamp.to_string());
        self.signer.sign_params(&params)
    }

    /// Sign with an explicit timestamp
    pub fn sign_at(
        &self,
        tokens: &SettingsTokens,
        timestamp: String,
    ) -> Result<SignedPayload, SessionError> {
        let checkcode = self.checkcode(tokens, &timestamp)?;
        Ok(SignedPayload {
            tokens: tokens.clone(),
            timestamp,
            checkcode,
        })
    }

    /// Read the clock once and sign; the same timestamp goes into the body
    pub fn sign(&self, tokens: &SettingsTokens) -> Result<SignedPayload, SessionError> {
        let timestamp = self.clock.now_unix().to_string();
        self.sign_at(tokens, timestamp)
    }
}
