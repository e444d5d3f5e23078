/// Transport kernel - session plumbing shared by every portal step
///
/// The kernel knows nothing about the portal's pages or endpoints. It holds
/// only the pieces a cookie-authenticated, checksum-signed HTTP session needs.
///
/// # Components
///
/// ## Transport
/// - `Transport`: one request, one response, no redirects followed
/// - `ReqwestTransport`: reqwest-backed implementation built by `TransportBuilder`
///
/// ## Session state
/// - `CookieJar`: `set-cookie` harvesting and `Cookie` header rendering
///
/// ## Authentication
/// - `Signer`: pluggable checksum interface
/// - `HmacSigner`: HMAC over a sorted, form-encoded parameter string
///
/// # Example
/// ```rust,no_run
/// use portal_harvest::core::kernel::*;
///
/// # async fn example() -> Result<(), portal_harvest::core::errors::SessionError> {
/// let transport = TransportBuilder::new(TransportConfig::new().with_timeout(10)).build()?;
/// let mut jar = CookieJar::new();
///
/// let mut request = HttpRequest::get("https://portal.example.com/login");
/// if !jar.is_empty() {
///     request = request.with_header("Cookie", jar.render());
/// }
/// let response = transport.execute(request).await?;
/// jar.absorb(&response.headers);
/// # Ok(())
/// # }
/// ```
pub mod cookies;
pub mod signer;
pub mod transport;

pub use cookies::CookieJar;
pub use signer::{canonical_query, encode_value, HmacAlgorithm, HmacSigner, Signer};
pub use transport::{
    HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportBuilder, TransportConfig,
};
