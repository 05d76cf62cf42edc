use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

use crate::JWT_BEARER_GRANT_TYPE;
use crate::request::{RequestError, Result};

/// Payload of the signed assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Client id
    pub iss: SmolStr,
    /// Operator user id
    pub sub: SmolStr,
    /// Identity service host
    pub aud: SmolStr,
    pub iat: i64,
    pub exp: i64,
    pub scope: String,
}

/// Body of the token endpoint request.
#[derive(Debug, Serialize)]
pub struct TokenRequestParameters<'a> {
    pub grant_type: &'a str,
    pub assertion: &'a str,
}

impl<'a> TokenRequestParameters<'a> {
    pub fn jwt_bearer(assertion: &'a str) -> Self {
        Self {
            grant_type: JWT_BEARER_GRANT_TYPE,
            assertion,
        }
    }
}

/// Successful token endpoint response.
///
/// `access_token` is optional here so that its absence can be reported as a
/// typed error instead of a generic JSON failure.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<SmolStr>,
    #[serde(default)]
    pub token_type: Option<SmolStr>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Bearer token returned by the authorization service.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: SmolStr,
    token_type: Option<SmolStr>,
    expires_in: Option<i64>,
}

impl AccessToken {
    pub fn new(token: impl Into<SmolStr>) -> Self {
        Self {
            token: token.into(),
            token_type: None,
            expires_in: None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn token_type(&self) -> Option<&str> {
        self.token_type.as_deref()
    }

    /// Lifetime in seconds as reported by the server.
    pub fn expires_in(&self) -> Option<i64> {
        self.expires_in
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl TryFrom<TokenResponse> for AccessToken {
    type Error = RequestError;

    fn try_from(response: TokenResponse) -> Result<Self> {
        match response.access_token {
            Some(token) if !token.is_empty() => Ok(Self {
                token,
                token_type: response.token_type,
                expires_in: response.expires_in,
            }),
            _ => Err(RequestError::missing_access_token()),
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Userinfo response: the operator and the accounts they can act on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<SmolStr>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(flatten)]
    pub extra_data: BTreeMap<SmolStr, Value>,
}

impl UserInfo {
    /// The single account flagged as default.
    ///
    /// Zero or several default accounts is an error; picking one arbitrarily
    /// would route subsequent API calls to an unpredictable region.
    pub fn default_account(&self) -> Result<&Account> {
        let mut defaults = self.accounts.iter().filter(|a| a.is_default);
        match (defaults.next(), defaults.next()) {
            (Some(account), None) => Ok(account),
            (None, _) => Err(RequestError::ambiguous_default_account(0)),
            (Some(_), Some(_)) => Err(RequestError::ambiguous_default_account(
                self.accounts.iter().filter(|a| a.is_default).count(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<SmolStr>,
    #[serde(default)]
    pub is_default: bool,
    /// Root for subsequent API calls on this account
    pub base_uri: SmolStr,
    #[serde(flatten)]
    pub extra_data: BTreeMap<SmolStr, Value>,
}

/// Query parameters delivered to the redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}
