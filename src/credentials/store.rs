//! Persisted credential and its on-disk store.
//!
//! The credential file is the only shared mutable resource crossing process
//! boundaries. There is exactly one writer by design, so no locking is
//! needed beyond atomic replace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::credentials::TokenRefresher;
use crate::types::Result;

/// OAuth-style token material proving user identity to downstream services.
///
/// Created by the token exchange, persisted after creation and after every
/// successful refresh, and never mutated except by refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,

    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Credential {
    /// Minimal authenticated signal: a non-empty access token.
    pub fn has_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// A credential with no recorded expiry is treated as unexpired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expiry, Some(expiry) if expiry <= now)
    }
}

/// On-disk credential store.
///
/// Reads happen at the start of every authorization check; writes happen only
/// on creation and successful refresh.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted credential.
    ///
    /// A missing file or a file that fails structural validation is `None`
    /// (the caller must re-authenticate), not an error.
    pub fn load(&self) -> Result<Option<Credential>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_str::<Credential>(&contents) {
            Ok(credential) => Ok(Some(credential)),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err,
                    "credential file failed structural validation; treating as absent");
                Ok(None)
            }
        }
    }

    /// Atomically overwrite the persisted credential.
    ///
    /// Writes a sibling temp file and renames it into place so a concurrent
    /// reader never observes a half-written credential.
    pub fn save(&self, credential: &Credential) -> Result<()> {
        let contents = serde_json::to_string_pretty(credential)?;

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), "credential persisted");
        Ok(())
    }

    /// Load and validate the credential, refreshing it if necessary.
    ///
    /// Returns `Some(credential)` only if the token is present and either
    /// unexpired or successfully refreshed (in which case the refreshed
    /// credential has been re-persisted). Any refresh failure degrades to
    /// `None` rather than surfacing an error to the session loop.
    pub async fn ensure_valid(
        &self,
        refresher: &dyn TokenRefresher,
    ) -> Result<Option<Credential>> {
        let Some(credential) = self.load()? else {
            return Ok(None);
        };

        if !credential.has_token() {
            return Ok(None);
        }

        if !credential.is_expired(Utc::now()) {
            return Ok(Some(credential));
        }

        let Some(refresh_token) = credential.refresh_token.clone() else {
            tracing::info!("credential expired with no refresh token");
            return Ok(None);
        };

        tracing::info!("credential expired, attempting refresh");
        match refresher.refresh(&refresh_token).await {
            Ok(mut refreshed) => {
                // Token endpoints may omit the refresh token on renewal.
                if refreshed.refresh_token.is_none() {
                    refreshed.refresh_token = Some(refresh_token);
                }
                if refreshed.scopes.is_empty() {
                    refreshed.scopes = credential.scopes;
                }
                self.save(&refreshed)?;
                tracing::info!("credential refreshed");
                Ok(Some(refreshed))
            }
            Err(err) => {
                tracing::warn!(error = %err, "credential refresh failed");
                Ok(None)
            }
        }
    }
}
