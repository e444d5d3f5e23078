use crate::core::config::PortalConfig;
use crate::core::errors::SessionError;
use crate::core::kernel::{ReqwestTransport, Transport, TransportBuilder, TransportConfig};
use crate::portal::extractor::{RegexExtractor, TokenExtractor};
use crate::portal::session::{PortalSession, Session};
use crate::portal::signer::{ChecksumSigner, Clock, SystemClock};
use std::sync::Arc;

/// Builder for creating portal sessions
///
/// Wires configuration into a transport, an extractor and a checksum signer.
/// The extractor and clock can be swapped, mostly for tests.
pub struct PortalBuilder {
    config: PortalConfig,
    user_agent: Option<String>,
    extractor: Option<Arc<dyn TokenExtractor>>,
    clock: Arc<dyn Clock>,
}

impl PortalBuilder {
    pub fn new(config: PortalConfig) -> Self {
        Self {
            config,
            user_agent: None,
            extractor: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Set the user agent sent on every request
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = Some(user_agent);
        self
    }

    /// Replace the HTML extraction strategy
    pub fn with_extractor(mut self, extractor: Arc<dyn TokenExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Replace the timestamp source used for signing
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub const fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Build a session over the reqwest transport
    pub fn build(self) -> Result<PortalSession<ReqwestTransport>, SessionError> {
        let mut transport_config = TransportConfig::new().with_timeout(self.config.timeout_seconds);
        if let Some(user_agent) = self.user_agent.clone() {
            transport_config = transport_config.with_user_agent(user_agent);
        }

        let transport = TransportBuilder::new(transport_config).build()?;
        self.build_with_transport(transport)
    }

    /// Build a session over a caller-supplied transport
    pub fn build_with_transport<T: Transport>(
        self,
        transport: T,
    ) -> Result<PortalSession<T>, SessionError> {
        self.config.validate()?;

        let extractor: Arc<dyn TokenExtractor> = match self.extractor {
            Some(extractor) => extractor,
            None => Arc::new(RegexExtractor::new()?),
        };

        let signer = ChecksumSigner::hmac(self.config.signing_key.clone(), self.config.algorithm)
            .with_clock(self.clock);

        let session = Session::new(self.config.base_url.clone(), self.config.api_url.clone());

        Ok(PortalSession::new(transport, session, extractor, signer))
    }
}

/// Create a portal session from configuration
pub fn build_session(
    config: PortalConfig,
) -> Result<PortalSession<ReqwestTransport>, SessionError> {
    PortalBuilder::new(config).build()
}
