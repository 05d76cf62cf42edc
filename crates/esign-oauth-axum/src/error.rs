//! Error boundary between the consent flow and HTTP callers.
//!
//! Internal error detail (upstream bodies, key paths, transport messages) is
//! logged and never serialized into a response.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use esign_oauth::request::{ErrorCategory, RequestError};
use serde::Serialize;
use smol_str::SmolStr;
use thiserror::Error;

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The provider redirected back with an OAuth error instead of a code
    #[error("consent was not granted: {error}")]
    ConsentDenied {
        error: SmolStr,
        description: Option<String>,
    },

    #[error(transparent)]
    Request(#[from] RequestError),
}

// Written out by hand: `#[diagnostic(transparent)]` would call
// `RequestError::url()` (an inherent method) instead of `Diagnostic::url`.
impl miette::Diagnostic for ApiError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            Self::ConsentDenied { .. } => Some(Box::new("esign_oauth_axum::consent_denied")),
            Self::Request(err) => miette::Diagnostic::code(err),
        }
    }

    fn severity(&self) -> Option<miette::Severity> {
        match self {
            Self::ConsentDenied { .. } => None,
            Self::Request(err) => miette::Diagnostic::severity(err),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            Self::ConsentDenied { .. } => None,
            Self::Request(err) => miette::Diagnostic::help(err),
        }
    }

    fn url<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            Self::ConsentDenied { .. } => None,
            Self::Request(err) => miette::Diagnostic::url(err),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Self::ConsentDenied { .. } => None,
            Self::Request(err) => miette::Diagnostic::source_code(err),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        match self {
            Self::ConsentDenied { .. } => None,
            Self::Request(err) => miette::Diagnostic::labels(err),
        }
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn miette::Diagnostic> + 'a>> {
        match self {
            Self::ConsentDenied { .. } => None,
            Self::Request(err) => miette::Diagnostic::related(err),
        }
    }

    fn diagnostic_source(&self) -> Option<&dyn miette::Diagnostic> {
        match self {
            Self::ConsentDenied { .. } => None,
            Self::Request(err) => miette::Diagnostic::diagnostic_source(err),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream_error: Option<SmolStr>,
}

impl ApiError {
    fn status_and_body(&self) -> (StatusCode, ErrorBody) {
        match self {
            Self::ConsentDenied { error, .. } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "consent_denied",
                    message: "the user did not grant consent",
                    upstream_error: oauth_error_code(error),
                },
            ),
            Self::Request(err) => match err.category() {
                ErrorCategory::Configuration => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "server_misconfigured",
                        message: "the server could not sign its identity assertion",
                        upstream_error: None,
                    },
                ),
                ErrorCategory::Transport => (
                    StatusCode::BAD_GATEWAY,
                    ErrorBody {
                        error: "upstream_unavailable",
                        message: "the authorization service could not be reached",
                        upstream_error: None,
                    },
                ),
                ErrorCategory::Upstream => (
                    StatusCode::BAD_GATEWAY,
                    ErrorBody {
                        error: "upstream_rejected",
                        message: "the authorization service rejected the request",
                        upstream_error: err.upstream_error_code().and_then(oauth_error_code),
                    },
                ),
                ErrorCategory::DataShape => (
                    StatusCode::BAD_GATEWAY,
                    ErrorBody {
                        error: "invalid_upstream_response",
                        message: "the authorization service returned an unexpected response",
                        upstream_error: None,
                    },
                ),
            },
        }
    }
}

/// Pass through only values shaped like an RFC 6749 error code.
fn oauth_error_code(code: &str) -> Option<SmolStr> {
    let valid = !code.is_empty()
        && code.len() <= 64
        && code.bytes().all(|b| b.is_ascii_lowercase() || b == b'_');
    valid.then(|| SmolStr::new(code))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::ConsentDenied { error, description } => {
                tracing::warn!(%error, ?description, "consent callback carried an error");
            }
            Self::Request(err) => {
                tracing::error!(
                    error = %err,
                    category = ?err.category(),
                    url = ?err.url(),
                    context = ?err.context(),
                    source = ?err.source_err(),
                    "consent flow failed"
                );
            }
        }
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}
