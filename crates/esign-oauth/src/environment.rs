//! Deployment environment selection.
//!
//! The provider runs two disjoint account services: a sandbox for development
//! and the production service. Every URL the flow touches is derived from the
//! [`Endpoints`] of one of them.

use std::fmt;
use std::str::FromStr;

use smol_str::{SmolStr, ToSmolStr};

use crate::error::{OAuthError, Result};

const SANDBOX_AUTH_BASE: &str = "https://account-d.docusign.com/oauth";
const SANDBOX_IDENTITY_HOST: &str = "account-d.docusign.com";
const PRODUCTION_AUTH_BASE: &str = "https://account.docusign.com/oauth";
const PRODUCTION_IDENTITY_HOST: &str = "account.docusign.com";

/// Which account service to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    /// Developer sandbox (`account-d`)
    #[default]
    Sandbox,
    /// Live accounts
    Production,
}

impl Environment {
    /// Resolve an optional environment tag.
    ///
    /// An absent tag selects the sandbox. Present tags must be one of the
    /// recognised names; anything else is an error rather than a silent
    /// fall-through to production.
    pub fn resolve(tag: Option<&str>) -> Result<Self> {
        match tag {
            None => Ok(Self::Sandbox),
            Some(tag) => tag.parse(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "dev",
            Self::Production => "production",
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        match self {
            Self::Sandbox => Endpoints::custom(SANDBOX_AUTH_BASE, SANDBOX_IDENTITY_HOST),
            Self::Production => Endpoints::custom(PRODUCTION_AUTH_BASE, PRODUCTION_IDENTITY_HOST),
        }
    }
}

impl FromStr for Environment {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Sandbox),
            "prod" | "production" => Ok(Self::Production),
            _ => Err(OAuthError::UnknownEnvironment(s.to_smolstr())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base locations of the authorization and identity services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Authorization service base path, without a trailing slash
    auth_base: SmolStr,
    /// Identity service host, used as the assertion audience
    identity_host: SmolStr,
}

impl Endpoints {
    /// Build endpoints for a non-standard deployment.
    ///
    /// A trailing `/` on `auth_base` is dropped so joined paths stay clean.
    pub fn custom(auth_base: impl AsRef<str>, identity_host: impl Into<SmolStr>) -> Self {
        Self {
            auth_base: auth_base.as_ref().trim_end_matches('/').to_smolstr(),
            identity_host: identity_host.into(),
        }
    }

    pub fn auth_base(&self) -> &str {
        &self.auth_base
    }

    pub fn identity_host(&self) -> &str {
        &self.identity_host
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/auth", self.auth_base)
    }

    pub fn token_url(&self) -> String {
        format!("{}/token", self.auth_base)
    }

    pub fn userinfo_url(&self) -> String {
        format!("{}/userinfo", self.auth_base)
    }
}
