pub mod aggregator;
pub mod builder;
pub mod extractor;
pub mod session;
pub mod signer;
pub mod types;

// Re-export main components
pub use aggregator::merge;
pub use builder::{build_session, PortalBuilder};
pub use extractor::{InputKey, RegexExtractor, TokenExtractor};
pub use session::{PortalSession, Session, SessionState};
pub use signer::{ChecksumSigner, Clock, FixedClock, SystemClock};
pub use types::{Credentials, Nonce, SettingsTokens, SignedPayload, User, UserCollection};
