//! OAuth2 JWT-bearer consent flow helpers for e-signature providers.
//!
//! The flow has three remote steps, all driven from [`client::ConsentClient`]:
//!
//! 1. the user visits the consent link built by [`consent::consent_link`],
//! 2. a signed assertion ([`assertion`]) is exchanged for an access token,
//! 3. the access token is used to look up the user's default account and its
//!    base URI.
//!
//! Transport lives behind [`http_client::HttpClient`] so the whole chain can be
//! driven against a mock in tests.

pub mod assertion;
pub mod client;
pub mod config;
pub mod consent;
pub mod environment;
pub mod error;
pub mod http_client;
pub mod request;
pub mod types;

pub use client::ConsentClient;
pub use config::{ClientConfig, ConsentSettings, ResponseType};
pub use environment::{Endpoints, Environment};
pub use error::OAuthError;
pub use request::{RequestError, RequestErrorKind};

/// Grant type sent to the token endpoint.
///
/// https://datatracker.ietf.org/doc/html/rfc7523#section-2.1
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
