use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use esign_oauth::{
    ClientConfig, ConsentSettings, Environment, OAuthError, config::DEFAULT_KEY_PATH,
};
use smol_str::SmolStr;

/// Server configuration. Every flag can also be set through the environment.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "OAuth2 JWT-bearer consent flow server")]
pub struct Args {
    /// Deployment environment: `dev` (sandbox) or `production`
    #[arg(long, env = "NODE_ENV")]
    pub environment: Option<String>,

    /// User id the assertion is issued for
    #[arg(long, env = "API_USERNAME")]
    pub operator: Option<String>,

    /// Integration key
    #[arg(long, env = "ESIGN_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Requested scopes, in order
    #[arg(
        long = "scope",
        env = "ESIGN_SCOPES",
        value_delimiter = ',',
        default_value = "signature"
    )]
    pub scopes: Vec<String>,

    /// Redirect URI registered for the integration key
    #[arg(
        long,
        env = "ESIGN_REDIRECT_URI",
        default_value = "http://localhost:3000/ds-callback"
    )]
    pub redirect_uri: String,

    /// Anti-forgery state appended to the consent link
    #[arg(long, env = "ESIGN_STATE")]
    pub state: Option<String>,

    /// RSA private key (PEM)
    #[arg(long, env = "ESIGN_PRIVATE_KEY", default_value = DEFAULT_KEY_PATH)]
    pub key_path: PathBuf,

    #[arg(long, env = "ESIGN_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,
}

impl Args {
    /// Build and validate the flow settings.
    pub fn settings(&self) -> Result<ConsentSettings, OAuthError> {
        let environment = Environment::resolve(self.environment.as_deref())?;
        let client = ClientConfig::builder()
            .client_id(self.client_id.as_deref().unwrap_or_default())
            .scopes(
                self.scopes
                    .iter()
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(SmolStr::new)
                    .collect(),
            )
            .redirect_uri(self.redirect_uri.as_str())
            .maybe_state(self.state.as_deref())
            .build();
        let settings = ConsentSettings::builder()
            .client(client)
            .environment(environment)
            .operator(self.operator.as_deref().unwrap_or_default())
            .key_path(self.key_path.clone())
            .build();
        settings.validate()?;
        Ok(settings)
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
