//! OAuth token endpoint client.
//!
//! Speaks the two grant types this pipeline needs: authorization-code
//! exchange for the initial console flow and refresh-token renewal when a
//! persisted credential has expired.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::credentials::{Credential, TokenRefresher};
use crate::types::{CredentialConfig, Error, Result};

/// Token endpoint response, per RFC 6749 §5.1.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn into_credential(self) -> Result<Credential> {
        if self.access_token.is_empty() {
            return Err(Error::malformed_response(
                "token endpoint returned an empty access_token",
            ));
        }

        let expiry = self
            .expires_in
            .map(|seconds| Utc::now() + Duration::seconds(seconds));
        let scopes = self
            .scope
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        Ok(Credential {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expiry,
            scopes,
        })
    }
}

/// HTTP client for the OAuth token endpoint.
#[derive(Debug, Clone)]
pub struct TokenEndpoint {
    client: reqwest::Client,
    config: CredentialConfig,
}

impl TokenEndpoint {
    pub fn new(config: CredentialConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// The URL the user must visit to authorize the application.
    pub fn authorization_url(&self) -> String {
        let scope = self.config.scopes.join("%20");
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&access_type=offline&prompt=consent",
            self.config.auth_url, self.config.client_id, self.config.redirect_uri, scope
        )
    }

    /// Exchange an authorization code for a credential.
    pub async fn exchange_code(&self, code: &str) -> Result<Credential> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        self.grant(&params).await
    }

    async fn grant(&self, params: &[(&str, &str)]) -> Result<Credential> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::credential_invalid(format!(
                "token endpoint rejected the grant: HTTP {status}"
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|err| Error::malformed_response(format!("token endpoint body: {err}")))?;
        body.into_credential()
    }
}

#[async_trait]
impl TokenRefresher for TokenEndpoint {
    async fn refresh(&self, refresh_token: &str) -> Result<Credential> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        self.grant(&params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Form;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::collections::HashMap;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn config(token_url: String) -> CredentialConfig {
        CredentialConfig {
            token_url,
            client_id: "client-1".to_string(),
            client_secret: "hunter2".to_string(),
            ..CredentialConfig::default()
        }
    }

    #[tokio::test]
    async fn test_refresh_success() {
        let app = Router::new().route(
            "/token",
            post(|Form(params): Form<HashMap<String, String>>| async move {
                assert_eq!(params.get("grant_type").map(String::as_str), Some("refresh_token"));
                assert_eq!(params.get("refresh_token").map(String::as_str), Some("r-token"));
                Json(serde_json::json!({
                    "access_token": "fresh",
                    "expires_in": 3600,
                    "scope": "openid email"
                }))
            }),
        );
        let base = serve(app).await;

        let endpoint = TokenEndpoint::new(config(format!("{base}/token")));
        let credential = endpoint.refresh("r-token").await.unwrap();
        assert_eq!(credential.access_token, "fresh");
        assert!(credential.expiry.is_some());
        assert_eq!(credential.scopes, vec!["openid", "email"]);
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let app = Router::new().route(
            "/token",
            post(|Form(params): Form<HashMap<String, String>>| async move {
                assert_eq!(
                    params.get("grant_type").map(String::as_str),
                    Some("authorization_code")
                );
                assert_eq!(params.get("code").map(String::as_str), Some("abc123"));
                Json(serde_json::json!({
                    "access_token": "first",
                    "refresh_token": "r-token",
                    "expires_in": 3600
                }))
            }),
        );
        let base = serve(app).await;

        let endpoint = TokenEndpoint::new(config(format!("{base}/token")));
        let credential = endpoint.exchange_code("abc123").await.unwrap();
        assert_eq!(credential.access_token, "first");
        assert_eq!(credential.refresh_token.as_deref(), Some("r-token"));
    }

    #[tokio::test]
    async fn test_rejected_grant_is_credential_error() {
        let app = Router::new().route(
            "/token",
            post(|| async {
                (
                    axum::http::StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"error": "invalid_grant"})),
                )
            }),
        );
        let base = serve(app).await;

        let endpoint = TokenEndpoint::new(config(format!("{base}/token")));
        let err = endpoint.refresh("revoked").await.unwrap_err();
        assert!(matches!(err, Error::CredentialInvalid(_)));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_malformed_response() {
        let app = Router::new().route("/token", post(|| async { "not json" }));
        let base = serve(app).await;

        let endpoint = TokenEndpoint::new(config(format!("{base}/token")));
        let err = endpoint.refresh("r").await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_empty_access_token_is_malformed_response() {
        let app = Router::new().route(
            "/token",
            post(|| async { Json(serde_json::json!({"access_token": ""})) }),
        );
        let base = serve(app).await;

        let endpoint = TokenEndpoint::new(config(format!("{base}/token")));
        let err = endpoint.refresh("r").await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn test_authorization_url_contains_flow_params() {
        let endpoint = TokenEndpoint::new(config("http://unused".to_string()));
        let url = endpoint.authorization_url();
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("access_type=offline"));
    }
}
