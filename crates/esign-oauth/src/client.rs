use smol_str::SmolStr;

use crate::{
    assertion::{ASSERTION_LIFETIME_SECS, SigningKey},
    config::ConsentSettings,
    consent::consent_link,
    environment::Endpoints,
    error::Result,
    http_client::HttpClient,
    request::{self, RequestError},
    types::{AccessToken, AssertionClaims, UserInfo},
};

/// Drives the consent, token and userinfo steps for one integration.
///
/// Holds only immutable settings plus the cached signing key, so a single
/// instance can be shared across concurrent requests.
#[derive(Debug)]
pub struct ConsentClient<C> {
    settings: ConsentSettings,
    endpoints: Endpoints,
    signing_key: SigningKey,
    http: C,
}

impl<C> ConsentClient<C> {
    /// Validate `settings` and assemble a client around an already loaded key.
    pub fn new(settings: ConsentSettings, signing_key: SigningKey, http: C) -> Result<Self> {
        settings.validate()?;
        let endpoints = settings.endpoints();
        Ok(Self {
            settings,
            endpoints,
            signing_key,
            http,
        })
    }

    /// Validate `settings` and load the private key from `settings.key_path`.
    pub async fn load(settings: ConsentSettings, http: C) -> Result<Self> {
        settings.validate()?;
        let signing_key = SigningKey::load(&settings.key_path).await?;
        Self::new(settings, signing_key, http)
    }

    pub fn settings(&self) -> &ConsentSettings {
        &self.settings
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// URL the user must visit to grant consent.
    pub fn consent_link(&self) -> String {
        consent_link(&self.settings.client, &self.endpoints)
    }

    /// Claims for an assertion issued at `iat`.
    pub fn assertion_claims(&self, iat: i64) -> AssertionClaims {
        AssertionClaims {
            iss: self.settings.client.client_id.clone(),
            sub: self.settings.operator.clone(),
            aud: SmolStr::new(self.endpoints.identity_host()),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
            scope: self.settings.client.scope(),
        }
    }

    /// Mint a fresh signed assertion, valid for one hour from now.
    pub fn sign_assertion(&self) -> Result<String> {
        let iat = chrono::Utc::now().timestamp();
        self.signing_key.sign(&self.assertion_claims(iat))
    }
}

impl<C> ConsentClient<C>
where
    C: HttpClient + Sync,
{
    /// Sign an assertion and exchange it for an access token.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
    pub async fn access_token(&self) -> request::Result<AccessToken> {
        let assertion = self.sign_assertion().map_err(RequestError::from)?;
        request::exchange_assertion(&self.http, &self.endpoints, &assertion).await
    }

    /// Look up the operator's profile with an existing token.
    pub async fn user_info(&self, token: &AccessToken) -> request::Result<UserInfo> {
        request::fetch_user_info(&self.http, &self.endpoints, token).await
    }

    /// Base URI of the operator's default account.
    ///
    /// Runs the whole chain: sign, exchange, userinfo, select.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
    pub async fn base_uri(&self) -> request::Result<SmolStr> {
        let token = self.access_token().await?;
        let info = self.user_info(&token).await?;
        let account = info.default_account()?;
        #[cfg(feature = "tracing")]
        tracing::debug!(account_id = ?account.account_id, "resolved default account");
        Ok(account.base_uri.clone())
    }
}
