//! Client identity and flow settings.
//!
//! Everything the flow needs is carried here explicitly; nothing below this
//! module reads process environment variables.

use std::path::PathBuf;

use bon::Builder;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::environment::{Endpoints, Environment};
use crate::error::{OAuthError, Result};

/// Default location of the RSA private key, relative to the working directory.
pub const DEFAULT_KEY_PATH: &str = "private.key";

/// OAuth `response_type` requested on the consent link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Code,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
        }
    }
}

/// Application registration data: who we are and what we ask for.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct ClientConfig {
    #[builder(default)]
    pub response_type: ResponseType,
    /// Integration key issued by the provider
    #[builder(into)]
    pub client_id: SmolStr,
    /// Requested permissions, in the order they are sent
    pub scopes: Vec<SmolStr>,
    #[builder(into)]
    pub redirect_uri: SmolStr,
    /// Opaque anti-forgery value echoed back on the callback
    #[builder(into)]
    pub state: Option<SmolStr>,
}

impl ClientConfig {
    /// Scopes joined by single spaces.
    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(OAuthError::MissingClientId);
        }
        if self.scopes.iter().all(|s| s.trim().is_empty()) {
            return Err(OAuthError::EmptyScope);
        }
        url::Url::parse(&self.redirect_uri).map_err(|source| OAuthError::InvalidRedirectUri {
            uri: self.redirect_uri.clone(),
            source,
        })?;
        Ok(())
    }
}

/// Full settings for a [`ConsentClient`](crate::ConsentClient).
#[derive(Debug, Clone, Builder)]
pub struct ConsentSettings {
    pub client: ClientConfig,
    #[builder(default)]
    pub environment: Environment,
    /// User id the assertion is issued for (`sub`)
    #[builder(into)]
    pub operator: SmolStr,
    #[builder(into, default = PathBuf::from(DEFAULT_KEY_PATH))]
    pub key_path: PathBuf,
    /// Overrides the hosts implied by `environment`
    pub endpoints: Option<Endpoints>,
}

impl ConsentSettings {
    pub fn endpoints(&self) -> Endpoints {
        self.endpoints
            .clone()
            .unwrap_or_else(|| self.environment.endpoints())
    }

    /// Check every value the flow depends on, so misconfiguration surfaces at
    /// startup instead of as a malformed assertion later.
    pub fn validate(&self) -> Result<()> {
        self.client.validate()?;
        if self.operator.trim().is_empty() {
            return Err(OAuthError::MissingOperator);
        }
        Ok(())
    }
}
