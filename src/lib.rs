pub mod core;
pub mod portal;
pub mod utils;

pub use core::{config::PortalConfig, errors::SessionError};
pub use portal::{build_session, PortalBuilder, PortalSession, User, UserCollection};
