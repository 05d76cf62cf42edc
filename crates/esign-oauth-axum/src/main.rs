use std::sync::Arc;

use clap::Parser;
use esign_oauth::ConsentClient;
use esign_oauth_axum::{AppState, config::Args, router};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Values already present in the environment win over `.env`.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_env_filter(
            EnvFilter::try_from_env("ESIGN_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = args.settings()?;
    let endpoints = settings.endpoints();
    tracing::info!(
        environment = %settings.environment,
        auth_base = endpoints.auth_base(),
        key_path = %settings.key_path.display(),
        "starting consent server"
    );

    let http = reqwest::Client::builder()
        .user_agent(concat!("esign-oauth/", env!("CARGO_PKG_VERSION")))
        .build()
        .into_diagnostic()?;
    let client = Arc::new(ConsentClient::load(settings, http).await?);

    #[cfg(unix)]
    reload_key_on_hangup(Arc::clone(&client))?;

    let app = router(AppState::new(client, args.port));
    let listener = tokio::net::TcpListener::bind(args.addr())
        .await
        .into_diagnostic()?;
    tracing::info!("Server running at port {}", args.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;
    Ok(())
}

/// Re-read the private key whenever the process receives SIGHUP.
#[cfg(unix)]
fn reload_key_on_hangup(client: Arc<ConsentClient<reqwest::Client>>) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup()).into_diagnostic()?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            if let Err(error) = client.signing_key().reload().await {
                tracing::error!(%error, "key reload failed, keeping previous key");
            }
        }
    });
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
