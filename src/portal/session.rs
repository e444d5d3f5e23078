use crate::core::errors::SessionError;
use crate::core::kernel::{CookieJar, HttpRequest, HttpResponse, Transport};
use crate::portal::aggregator;
use crate::portal::extractor::TokenExtractor;
use crate::portal::signer::ChecksumSigner;
use crate::portal::types::{Credentials, Nonce, SettingsTokens, User, UserCollection};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

pub const LOGIN_PATH: &str = "/login";
pub const USERS_PATH: &str = "/api/users";
pub const SETTINGS_TOKENS_PATH: &str = "/settings/tokens";
pub const SIGNED_SETTINGS_PATH: &str = "/api/settings";

/// Per-run session: both origins and the cookie jar
#[derive(Debug, Clone)]
pub struct Session {
    pub base_url: String,
    pub api_url: String,
    pub cookies: CookieJar,
}

impl Session {
    pub fn new(base_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_url: api_url.into(),
            cookies: CookieJar::new(),
        }
    }

    pub fn base_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn api_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    NonceObtained,
    LoggedIn,
    TokensObtained,
    AuthenticatedUserFetched,
    Complete,
    Failed(String),
}

impl SessionState {
    /// Session cookies from a successful login are in the jar
    pub const fn is_logged_in(&self) -> bool {
        matches!(
            self,
            Self::LoggedIn | Self::TokensObtained | Self::AuthenticatedUserFetched
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => f.write_str("unauthenticated"),
            Self::NonceObtained => f.write_str("nonce obtained"),
            Self::LoggedIn => f.write_str("logged in"),
            Self::TokensObtained => f.write_str("tokens obtained"),
            Self::AuthenticatedUserFetched => f.write_str("authenticated user fetched"),
            Self::Complete => f.write_str("complete"),
            Self::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// Drives login, token harvest, the signed call and the bulk fetch in order
///
/// Every request attaches the current cookie jar and every response feeds
/// it, so cookies from request N are visible to request N+1. Any failure
/// moves the session to `Failed` and every later step is refused.
pub struct PortalSession<T: Transport> {
    transport: T,
    session: Session,
    state: SessionState,
    extractor: Arc<dyn TokenExtractor>,
    signer: ChecksumSigner,
}

impl<T: Transport> fmt::Debug for PortalSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalSession")
            .field("base_url", &self.session.base_url)
            .field("api_url", &self.session.api_url)
            .field("cookies", &self.session.cookies.names())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> PortalSession<T> {
    pub fn new(
        transport: T,
        session: Session,
        extractor: Arc<dyn TokenExtractor>,
        signer: ChecksumSigner,
    ) -> Self {
        Self {
            transport,
            session,
            state: SessionState::Unauthenticated,
            extractor,
            signer,
        }
    }

    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    pub const fn cookies(&self) -> &CookieJar {
        &self.session.cookies
    }

    /// Full run: nonce, login, bulk users, tokens, signed user, merge
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn run(&mut self, credentials: &Credentials) -> Result<UserCollection, SessionError> {
        let nonce = self.fetch_nonce().await?;
        self.login(nonce, credentials).await?;
        let bulk_users = self.fetch_bulk_users().await?;
        let tokens = self.fetch_settings_tokens().await?;
        let authenticated_user = self.fetch_authenticated_user(&tokens).await?;

        let users = aggregator::merge(bulk_users, authenticated_user);
        self.transition(SessionState::Complete);
        info!(users = users.len(), "run complete");
        Ok(users)
    }

    /// GET the login page and scrape its nonce
    #[instrument(skip(self))]
    pub async fn fetch_nonce(&mut self) -> Result<Nonce, SessionError> {
        self.require("fetch nonce", |s| *s == SessionState::Unauthenticated)?;
        let result = self.request_nonce().await;
        let nonce = self.settle(result)?;
        self.transition(SessionState::NonceObtained);
        Ok(nonce)
    }

    /// POST the login form; only a redirect status counts as success
    #[instrument(skip(self, nonce, credentials), fields(username = %credentials.username))]
    pub async fn login(
        &mut self,
        nonce: Nonce,
        credentials: &Credentials,
    ) -> Result<(), SessionError> {
        self.require("log in", |s| *s == SessionState::NonceObtained)?;
        let result = self.submit_login(nonce, credentials).await;
        self.settle(result)?;
        self.transition(SessionState::LoggedIn);
        Ok(())
    }

    /// GET the settings page and scrape all six tokens
    #[instrument(skip(self))]
    pub async fn fetch_settings_tokens(&mut self) -> Result<SettingsTokens, SessionError> {
        self.require("fetch settings tokens", |s| *s == SessionState::LoggedIn)?;
        let result = self.request_settings_tokens().await;
        let tokens = self.settle(result)?;
        self.transition(SessionState::TokensObtained);
        Ok(tokens)
    }

    /// Sign the tokens and POST them to the secondary API origin
    #[instrument(skip(self, tokens))]
    pub async fn fetch_authenticated_user(
        &mut self,
        tokens: &SettingsTokens,
    ) -> Result<User, SessionError> {
        self.require("fetch authenticated user", |s| {
            *s == SessionState::TokensObtained
        })?;
        let result = self.request_authenticated_user(tokens).await;
        let user = self.settle(result)?;
        self.transition(SessionState::AuthenticatedUserFetched);
        Ok(user)
    }

    /// POST the bulk users endpoint; needs only the login cookies
    ///
    /// Does not change the session state.
    #[instrument(skip(self))]
    pub async fn fetch_bulk_users(&mut self) -> Result<Vec<User>, SessionError> {
        self.require("fetch bulk users", SessionState::is_logged_in)?;
        let result = self.request_bulk_users().await;
        self.settle(result)
    }

    async fn request_nonce(&mut self) -> Result<Nonce, SessionError> {
        let url = self.session.base_endpoint(LOGIN_PATH);
        let response = self.send(HttpRequest::get(url)).await?;
        Self::expect_success("login page", &response)?;
        self.extractor.extract_nonce(&response.body)
    }

    async fn submit_login(
        &mut self,
        nonce: Nonce,
        credentials: &Credentials,
    ) -> Result<(), SessionError> {
        let url = self.session.base_endpoint(LOGIN_PATH);
        let form = vec![
            ("nonce".to_string(), nonce.into_inner()),
            ("username".to_string(), credentials.username.clone()),
            ("password".to_string(), credentials.password().to_string()),
        ];

        let response = self.send(HttpRequest::post_form(url, form)).await?;
        if !response.is_redirect() {
            return Err(SessionError::unexpected_status("login", response.status));
        }

        debug!(
            status = response.status,
            location = response.header("location").unwrap_or_default(),
            "login accepted"
        );
        Ok(())
    }

    async fn request_settings_tokens(&mut self) -> Result<SettingsTokens, SessionError> {
        let url = self.session.base_endpoint(SETTINGS_TOKENS_PATH);
        let response = self.send(HttpRequest::get(url)).await?;
        Self::expect_success("settings tokens page", &response)?;
        self.extractor.extract_settings_tokens(&response.body)
    }

    async fn request_authenticated_user(
        &mut self,
        tokens: &SettingsTokens,
    ) -> Result<User, SessionError> {
        let payload = self.signer.sign(tokens)?;
        debug!(timestamp = %payload.timestamp, "payload signed");

        let url = self.session.api_endpoint(SIGNED_SETTINGS_PATH);
        let response = self
            .send(HttpRequest::post_form(url, payload.form_fields()))
            .await?;
        Self::expect_success("signed settings call", &response)?;
        response.json()
    }

    async fn request_bulk_users(&mut self) -> Result<Vec<User>, SessionError> {
        let url = self.session.base_endpoint(USERS_PATH);
        let response = self.send(HttpRequest::post_form(url, Vec::new())).await?;
        Self::expect_success("bulk users", &response)?;
        let users: Vec<User> = response.json()?;
        debug!(count = users.len(), "bulk users fetched");
        Ok(users)
    }

    /// Attach the jar, execute, absorb the response cookies
    async fn send(&mut self, request: HttpRequest) -> Result<HttpResponse, SessionError> {
        let request = if self.session.cookies.is_empty() {
            request
        } else {
            request.with_header("Cookie", self.session.cookies.render())
        };

        let response = self.transport.execute(request).await?;
        let absorbed = self.session.cookies.absorb(&response.headers);
        if absorbed > 0 {
            debug!(
                absorbed,
                cookies = ?self.session.cookies.names(),
                "cookie jar updated"
            );
        }
        Ok(response)
    }

    fn expect_success(context: &str, response: &HttpResponse) -> Result<(), SessionError> {
        if response.is_success() {
            Ok(())
        } else {
            Err(SessionError::unexpected_status(context, response.status))
        }
    }

    fn require(
        &self,
        operation: &str,
        allowed: impl Fn(&SessionState) -> bool,
    ) -> Result<(), SessionError> {
        if allowed(&self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation: operation.to_string(),
                state: self.state.to_string(),
            })
        }
    }

    fn settle<V>(&mut self, result: Result<V, SessionError>) -> Result<V, SessionError> {
        result.map_err(|err| {
            error!(error = %err, from = %self.state, "session failed");
            self.state = SessionState::Failed(err.to_string());
            err
        })
    }

    fn transition(&mut self, next: SessionState) {
        info!(from = %self.state, to = %next, "session transition");
        self.state = next;
    }
}
