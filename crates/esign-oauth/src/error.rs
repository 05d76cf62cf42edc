use std::path::PathBuf;

use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

/// Configuration and signing errors.
///
/// These are all raised before any request leaves the process.
#[derive(Debug, Error, Diagnostic)]
pub enum OAuthError {
    /// Environment tag outside the recognised set
    #[error("unknown environment: {0:?}")]
    #[diagnostic(
        code(esign_oauth::environment),
        help("use `dev`/`development` for the sandbox or `prod`/`production`")
    )]
    UnknownEnvironment(SmolStr),
    /// Operator identity (JWT subject) not configured
    #[error("operator identity is not configured")]
    #[diagnostic(
        code(esign_oauth::operator),
        help("set API_USERNAME to the user id that granted consent")
    )]
    MissingOperator,
    /// Client id (integration key) not configured
    #[error("client id is not configured")]
    #[diagnostic(code(esign_oauth::client_id))]
    MissingClientId,
    /// No scopes requested
    #[error("at least one scope must be requested")]
    #[diagnostic(code(esign_oauth::scope), help("the provider needs at least `signature`"))]
    EmptyScope,
    /// Redirect URI is not an absolute URL
    #[error("invalid redirect uri {uri:?}")]
    #[diagnostic(
        code(esign_oauth::redirect_uri),
        help("the redirect uri must match one registered for the integration key")
    )]
    InvalidRedirectUri {
        uri: SmolStr,
        #[source]
        source: url::ParseError,
    },
    /// Private key could not be read
    #[error("failed to read private key at {}", path.display())]
    #[diagnostic(
        code(esign_oauth::key_read),
        help("check the key path and file permissions")
    )]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Private key is not a usable RSA PEM
    #[error("invalid private key: {0}")]
    #[diagnostic(
        code(esign_oauth::key),
        help("expected an RSA private key in PEM format (PKCS#1 or PKCS#8)")
    )]
    InvalidKey(#[source] jsonwebtoken::errors::Error),
    /// Signing error
    #[error("signing error: {0}")]
    #[diagnostic(code(esign_oauth::signing))]
    Signing(#[source] jsonwebtoken::errors::Error),
}

pub type Result<T> = core::result::Result<T, OAuthError>;
