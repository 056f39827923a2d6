//! Identity resolution — credential to verified user identity plus role.
//!
//! Identity is derived, never persisted, and resolved fresh on each
//! authorization check so a stale role can never grant privileges the
//! profile store has since revoked.

use async_trait::async_trait;
use serde::Deserialize;

use crate::credentials::Credential;
use crate::types::{IdentityConfig, Result, UserId};

/// A verified user identity. `role` is empty for role-less identities,
/// which is the lowest-privilege position for the policy engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
    pub role: String,
}

/// Boundary for turning a valid credential into an identity.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// `Ok(None)` means the endpoint answered but the data was incomplete;
    /// the caller treats the user as unauthenticated for this turn.
    async fn resolve(&self, credential: &Credential) -> Result<Option<Identity>>;
}

/// Boundary for looking up the business role for a verified email.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Degrades to the empty string (lowest privilege) on any failure;
    /// a role lookup must never abort the pipeline.
    async fn role_for(&self, email: &str) -> String;
}

/// Userinfo endpoint response. Both fields are required for a resolution.
#[derive(Debug, Deserialize)]
struct UserinfoResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Profile store document; the role field is optional.
#[derive(Debug, Deserialize)]
struct ProfileDocument {
    #[serde(default)]
    role: Option<String>,
}

/// HTTP identity client hitting the userinfo endpoint and profile store.
#[derive(Debug, Clone)]
pub struct HttpIdentityClient {
    client: reqwest::Client,
    config: IdentityConfig,
}

impl HttpIdentityClient {
    pub fn new(config: IdentityConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }
}

#[async_trait]
impl IdentityResolver for HttpIdentityClient {
    async fn resolve(&self, credential: &Credential) -> Result<Option<Identity>> {
        let response = self
            .client
            .get(&self.config.userinfo_url)
            .bearer_auth(&credential.access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "identity endpoint rejected the credential");
            return Ok(None);
        }

        let body: UserinfoResponse = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(error = %err, "identity endpoint body undecodable");
                return Ok(None);
            }
        };

        let (Some(id), Some(email)) = (body.id, body.email) else {
            tracing::warn!("identity endpoint returned incomplete user data");
            return Ok(None);
        };

        let Ok(user_id) = UserId::from_string(id) else {
            tracing::warn!("identity endpoint returned an empty user id");
            return Ok(None);
        };
        if email.is_empty() {
            tracing::warn!("identity endpoint returned an empty email");
            return Ok(None);
        }

        tracing::debug!(email = %email, "identity resolved");
        Ok(Some(Identity {
            user_id,
            email,
            role: String::new(),
        }))
    }
}

#[async_trait]
impl RoleDirectory for HttpIdentityClient {
    async fn role_for(&self, email: &str) -> String {
        let url = format!("{}/{}", self.config.profile_url.trim_end_matches('/'), email);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "profile store unreachable; using empty role");
                return String::new();
            }
        };

        if !response.status().is_success() {
            // Includes 404 for users with no profile document.
            return String::new();
        }

        match response.json::<ProfileDocument>().await {
            Ok(document) => document.role.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "profile document undecodable; using empty role");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::time::Duration;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn credential() -> Credential {
        Credential {
            access_token: "tok".to_string(),
            refresh_token: None,
            expiry: None,
            scopes: vec![],
        }
    }

    fn client(base: &str) -> HttpIdentityClient {
        HttpIdentityClient::new(IdentityConfig {
            userinfo_url: format!("{base}/userinfo"),
            profile_url: format!("{base}/profiles"),
            timeout: Duration::from_secs(2),
        })
    }

    #[tokio::test]
    async fn test_resolve_success() {
        let app = Router::new().route(
            "/userinfo",
            get(|| async {
                Json(serde_json::json!({"id": "109", "email": "ada@example.com"}))
            }),
        );
        let base = serve(app).await;

        let identity = client(&base).resolve(&credential()).await.unwrap().unwrap();
        assert_eq!(identity.user_id.as_str(), "109");
        assert_eq!(identity.email, "ada@example.com");
        assert!(identity.role.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_missing_email_is_failure() {
        let app = Router::new().route(
            "/userinfo",
            get(|| async { Json(serde_json::json!({"id": "109"})) }),
        );
        let base = serve(app).await;

        assert!(client(&base).resolve(&credential()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_rejected_credential_is_failure() {
        let app = Router::new().route(
            "/userinfo",
            get(|| async { axum::http::StatusCode::UNAUTHORIZED }),
        );
        let base = serve(app).await;

        assert!(client(&base).resolve(&credential()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_transport_error_propagates() {
        // Nothing listening on this port.
        let stray = client("http://127.0.0.1:9");
        assert!(stray.resolve(&credential()).await.is_err());
    }

    #[tokio::test]
    async fn test_role_for_present() {
        let app = Router::new().route(
            "/profiles/ada@example.com",
            get(|| async { Json(serde_json::json!({"role": "analyst"})) }),
        );
        let base = serve(app).await;

        assert_eq!(client(&base).role_for("ada@example.com").await, "analyst");
    }

    #[tokio::test]
    async fn test_role_for_missing_profile_is_empty() {
        let app = Router::new();
        let base = serve(app).await;

        assert_eq!(client(&base).role_for("ghost@example.com").await, "");
    }

    #[tokio::test]
    async fn test_role_for_missing_field_is_empty() {
        let app = Router::new().route(
            "/profiles/ada@example.com",
            get(|| async { Json(serde_json::json!({"team": "data"})) }),
        );
        let base = serve(app).await;

        assert_eq!(client(&base).role_for("ada@example.com").await, "");
    }

    #[tokio::test]
    async fn test_role_for_unreachable_store_is_empty() {
        let stray = client("http://127.0.0.1:9");
        assert_eq!(stray.role_for("ada@example.com").await, "");
    }
}
