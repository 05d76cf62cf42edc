//! Axum front door for the consent flow.
//!
//! # Routes
//!
//! - `GET /`: liveness text
//! - `GET /api/get-consent`: the consent link as plain text; the caller is
//!   responsible for navigating to it
//! - `GET /ds-callback`: redirect target; runs sign, exchange and userinfo
//!   and answers with the default account's base URI
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use miette::IntoDiagnostic;
//! use esign_oauth::{ClientConfig, ConsentClient, ConsentSettings};
//! use esign_oauth_axum::{AppState, router};
//!
//! #[tokio::main]
//! async fn main() -> miette::Result<()> {
//!     let settings = ConsentSettings::builder()
//!         .client(
//!             ClientConfig::builder()
//!                 .client_id("integration-key")
//!                 .scopes(vec!["signature".into()])
//!                 .redirect_uri("http://localhost:3000/ds-callback")
//!                 .build(),
//!         )
//!         .operator("user-id")
//!         .build();
//!     let client = ConsentClient::load(settings, reqwest::Client::new()).await?;
//!     let app = router(AppState::new(Arc::new(client), 3000));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
//!         .await
//!         .into_diagnostic()?;
//!     axum::serve(listener, app).await.into_diagnostic()?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use esign_oauth::{ConsentClient, http_client::HttpClient, types::CallbackParams};

pub mod config;
pub mod error;

pub use error::ApiError;

/// Shared handler state.
pub struct AppState<C> {
    client: Arc<ConsentClient<C>>,
    port: u16,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            port: self.port,
        }
    }
}

impl<C> AppState<C> {
    pub fn new(client: Arc<ConsentClient<C>>, port: u16) -> Self {
        Self { client, port }
    }

    pub fn client(&self) -> &ConsentClient<C> {
        &self.client
    }
}

/// Build the router with request tracing.
pub fn router<C>(state: AppState<C>) -> Router
where
    C: HttpClient + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(status::<C>))
        .route("/api/get-consent", get(get_consent::<C>))
        .route("/ds-callback", get(callback::<C>))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn status<C>(State(state): State<AppState<C>>) -> String {
    format!("Server running at port {}", state.port)
}

async fn get_consent<C>(State(state): State<AppState<C>>) -> String {
    state.client.consent_link()
}

async fn callback<C>(
    State(state): State<AppState<C>>,
    Query(params): Query<CallbackParams>,
) -> Result<String, ApiError>
where
    C: HttpClient + Send + Sync + 'static,
{
    if let Some(error) = params.error {
        return Err(ApiError::ConsentDenied {
            error,
            description: params.error_description,
        });
    }
    // The JWT-bearer grant does not need the authorization code; its presence
    // only confirms the user completed the consent screen.
    tracing::debug!(
        code_present = params.code.is_some(),
        state_present = params.state.is_some(),
        "consent callback"
    );
    let base_uri = state.client.base_uri().await?;
    tracing::info!(%base_uri, "resolved base uri");
    Ok(base_uri.into())
}
