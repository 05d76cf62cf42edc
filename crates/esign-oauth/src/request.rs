use http::{Method, Request, StatusCode, header};
use serde::de::DeserializeOwned;
use serde_json::Value;
use smol_str::SmolStr;

use crate::environment::Endpoints;
use crate::error::OAuthError;
use crate::http_client::HttpClient;
use crate::types::{AccessToken, TokenRequestParameters, TokenResponse, UserInfo};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// OAuth request error for the token and userinfo calls
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("{kind}")]
pub struct RequestError {
    #[diagnostic_source]
    kind: RequestErrorKind,
    #[source]
    source: Option<BoxError>,
    #[help]
    help: Option<SmolStr>,
    context: Option<SmolStr>,
    url: Option<SmolStr>,
}

/// Error categories for OAuth request operations
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum RequestErrorKind {
    /// The assertion could not be produced
    #[error("assertion error")]
    #[diagnostic(code(esign_oauth::request::assertion))]
    Assertion,

    /// HTTP build error
    #[error("http build error")]
    #[diagnostic(code(esign_oauth::request::http_build))]
    HttpBuild,

    /// Network or TLS failure
    #[error("transport error")]
    #[diagnostic(
        code(esign_oauth::request::transport),
        help("the authorization service could not be reached")
    )]
    Transport,

    /// HTTP status error
    #[error("http status: {0}")]
    #[diagnostic(
        code(esign_oauth::request::http_status),
        help("see server response for details")
    )]
    HttpStatus(StatusCode),

    /// HTTP status with error body
    #[error("http status: {status}, body: {body:?}")]
    #[diagnostic(
        code(esign_oauth::request::http_status_body),
        help("server returned error JSON; inspect fields like `error`, `error_description`")
    )]
    HttpStatusWithBody { status: StatusCode, body: Value },

    /// JSON error
    #[error("json error")]
    #[diagnostic(code(esign_oauth::request::serde_json))]
    SerdeJson,

    /// Token response carried no access token
    #[error("token response has no access_token")]
    #[diagnostic(code(esign_oauth::request::missing_access_token))]
    MissingAccessToken,

    /// Not exactly one account is marked default
    #[error("zero or multiple default accounts ({count} found)")]
    #[diagnostic(
        code(esign_oauth::request::ambiguous_default_account),
        help("exactly one account in the userinfo response must have `is_default: true`")
    )]
    AmbiguousDefaultAccount { count: usize },
}

/// Coarse grouping of request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Local misconfiguration; retrying will not help
    Configuration,
    /// The remote service could not be reached
    Transport,
    /// The remote service answered with an error status
    Upstream,
    /// The remote service answered with an unexpected payload
    DataShape,
}

impl RequestErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Assertion | Self::HttpBuild => ErrorCategory::Configuration,
            Self::Transport => ErrorCategory::Transport,
            Self::HttpStatus(_) | Self::HttpStatusWithBody { .. } => ErrorCategory::Upstream,
            Self::SerdeJson | Self::MissingAccessToken | Self::AmbiguousDefaultAccount { .. } => {
                ErrorCategory::DataShape
            }
        }
    }
}

impl RequestError {
    /// Create a new error with the given kind and optional source
    pub fn new(kind: RequestErrorKind, source: Option<BoxError>) -> Self {
        Self {
            kind,
            source,
            help: None,
            context: None,
            url: None,
        }
    }

    /// Get the error kind
    pub fn kind(&self) -> &RequestErrorKind {
        &self.kind
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Get the source error if present
    pub fn source_err(&self) -> Option<&BoxError> {
        self.source.as_ref()
    }

    /// Get the context string if present
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Get the URL if present
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Upstream HTTP status, if the server answered with an error.
    pub fn status(&self) -> Option<StatusCode> {
        match &self.kind {
            RequestErrorKind::HttpStatus(status)
            | RequestErrorKind::HttpStatusWithBody { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// OAuth `error` code from an upstream error body, e.g. `consent_required`.
    pub fn upstream_error_code(&self) -> Option<&str> {
        match &self.kind {
            RequestErrorKind::HttpStatusWithBody { body, .. } => {
                body.get("error").and_then(Value::as_str)
            }
            _ => None,
        }
    }

    /// Add help text to this error
    pub fn with_help(mut self, help: impl Into<SmolStr>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Add context to this error
    pub fn with_context(mut self, context: impl Into<SmolStr>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add URL to this error
    pub fn with_url(mut self, url: impl Into<SmolStr>) -> Self {
        self.url = Some(url.into());
        self
    }

    // Constructors for each kind

    /// Create an assertion error
    pub fn assertion(source: OAuthError) -> Self {
        Self::new(RequestErrorKind::Assertion, Some(Box::new(source)))
    }

    /// Create an HTTP build error
    pub fn http_build(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::new(RequestErrorKind::HttpBuild, Some(Box::new(source)))
    }

    /// Create a transport error
    pub fn transport(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::new(RequestErrorKind::Transport, Some(Box::new(source)))
    }

    /// Create an HTTP status error
    pub fn http_status(status: StatusCode) -> Self {
        Self::new(RequestErrorKind::HttpStatus(status), None)
    }

    /// Create an HTTP status with body error
    pub fn http_status_with_body(status: StatusCode, body: Value) -> Self {
        Self::new(RequestErrorKind::HttpStatusWithBody { status, body }, None)
    }

    /// Create a missing access token error
    pub fn missing_access_token() -> Self {
        Self::new(RequestErrorKind::MissingAccessToken, None)
    }

    /// Create an ambiguous default account error
    pub fn ambiguous_default_account(count: usize) -> Self {
        Self::new(RequestErrorKind::AmbiguousDefaultAccount { count }, None)
    }
}

impl From<OAuthError> for RequestError {
    fn from(e: OAuthError) -> Self {
        let msg = smol_str::format_smolstr!("{}", e);
        Self::assertion(e)
            .with_context(msg)
            .with_help("check the private key and operator configuration")
    }
}

impl From<http::Error> for RequestError {
    fn from(e: http::Error) -> Self {
        let msg = smol_str::format_smolstr!("{:?}", e);
        Self::http_build(e)
            .with_context(msg)
            .with_help("verify the configured service URLs are valid")
    }
}

impl From<serde_json::Error> for RequestError {
    fn from(e: serde_json::Error) -> Self {
        let msg = smol_str::format_smolstr!("{:?}", e);
        Self::new(RequestErrorKind::SerdeJson, Some(Box::new(e)))
            .with_context(msg)
            .with_help("verify the response body is valid JSON of the expected shape")
    }
}

pub type Result<T> = core::result::Result<T, RequestError>;

/// Exchange a signed assertion for an access token.
///
/// Exactly one request is made; failures are not retried.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(url = %endpoints.token_url())))]
pub async fn exchange_assertion<T>(
    client: &T,
    endpoints: &Endpoints,
    assertion: &str,
) -> Result<AccessToken>
where
    T: HttpClient + Sync,
{
    let url = endpoints.token_url();
    let body = serde_json::to_vec(&TokenRequestParameters::jwt_bearer(assertion))?;
    let req = Request::builder()
        .uri(url.as_str())
        .method(Method::POST)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json")
        .body(body)?;
    let res = client
        .send_http(req)
        .await
        .map_err(|e| RequestError::transport(e).with_url(url.as_str()))?;
    let response: TokenResponse = read_json(res).map_err(|e| e.with_url(url.as_str()))?;
    AccessToken::try_from(response).map_err(|e| e.with_url(url))
}

/// Fetch the operator's profile and accounts.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(url = %endpoints.userinfo_url())))]
pub async fn fetch_user_info<T>(
    client: &T,
    endpoints: &Endpoints,
    token: &AccessToken,
) -> Result<UserInfo>
where
    T: HttpClient + Sync,
{
    let url = endpoints.userinfo_url();
    let req = Request::builder()
        .uri(url.as_str())
        .method(Method::GET)
        .header(header::AUTHORIZATION, token.bearer())
        .header(header::ACCEPT, "application/json")
        .body(Vec::new())?;
    let res = client
        .send_http(req)
        .await
        .map_err(|e| RequestError::transport(e).with_url(url.as_str()))?;
    read_json(res).map_err(|e| e.with_url(url))
}

fn read_json<O>(res: http::Response<Vec<u8>>) -> Result<O>
where
    O: DeserializeOwned,
{
    let status = res.status();
    if status.is_success() {
        Ok(serde_json::from_slice(res.body())?)
    } else {
        match serde_json::from_slice::<Value>(res.body()) {
            Ok(body) => Err(RequestError::http_status_with_body(status, body)),
            Err(_) => Err(RequestError::http_status(status)),
        }
    }
}
