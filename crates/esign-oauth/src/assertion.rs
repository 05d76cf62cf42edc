//! Signed identity assertions for the JWT-bearer grant.
//!
//! # JWT Structure
//!
//! - Header: `alg` = RS256, `typ` = "JWT"
//! - Payload:
//!   - `iss`: integration key (client id)
//!   - `sub`: user id of the operator who granted consent
//!   - `aud`: identity service host (no scheme)
//!   - `iat`: issued at unix timestamp
//!   - `exp`: `iat` + one hour
//!   - `scope`: space separated scopes
//!
//! A fresh assertion is minted for every token exchange. The parsed private key
//! is cached in [`SigningKey`] and only re-read on [`SigningKey::reload`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use jsonwebtoken::{Algorithm, EncodingKey, Header};

use crate::error::{OAuthError, Result};
use crate::types::AssertionClaims;

/// Lifetime of an assertion in seconds.
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// RSA private key used to sign assertions.
pub struct SigningKey {
    /// Source file, if the key came from disk
    path: Option<PathBuf>,
    key: RwLock<Arc<EncodingKey>>,
}

impl SigningKey {
    /// Read and parse a PEM encoded RSA private key.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(path = %path.as_ref().display())))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let key = read_key(&path).await?;
        Ok(Self {
            path: Some(path),
            key: RwLock::new(Arc::new(key)),
        })
    }

    /// Parse a PEM encoded RSA private key held in memory.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(pem).map_err(OAuthError::InvalidKey)?;
        Ok(Self {
            path: None,
            key: RwLock::new(Arc::new(key)),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Re-read the key from its source file.
    ///
    /// On failure the previously loaded key stays in use. Keys built with
    /// [`SigningKey::from_pem`] have no source and are left unchanged.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self)))]
    pub async fn reload(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let key = read_key(path).await?;
        *self.key.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(key);
        #[cfg(feature = "tracing")]
        tracing::info!(path = %path.display(), "signing key reloaded");
        Ok(())
    }

    /// Sign `claims` with RS256.
    pub fn sign(&self, claims: &AssertionClaims) -> Result<String> {
        let key = self.current();
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), claims, &key)
            .map_err(OAuthError::Signing)
    }

    fn current(&self) -> Arc<EncodingKey> {
        self.key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

async fn read_key(path: &Path) -> Result<EncodingKey> {
    let pem = tokio::fs::read(path)
        .await
        .map_err(|source| OAuthError::KeyRead {
            path: path.to_path_buf(),
            source,
        })?;
    EncodingKey::from_rsa_pem(&pem).map_err(OAuthError::InvalidKey)
}
