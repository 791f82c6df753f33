//! Provider authentication: token lifecycle, token endpoint, persistence and
//! login redirects.

pub mod authorize;
pub mod error;
pub mod exchange;
pub mod persist;
pub mod store;
pub mod token;

pub use authorize::{AuthorizeRequest, ResponseType};
pub use error::AuthError;
pub use exchange::{Grant, TokenExchange};
pub use persist::{CredentialStore, FileCredentialStore};
pub use store::{TokenSource, TokenStore};
pub use token::{Token, TokenResponse};
