//! Policy decision client — fail-closed allow/deny for identity + tool.
//!
//! Queries an external policy engine over a bounded synchronous request.
//! There is no "unknown" outcome: transport failures, timeouts, non-2xx
//! statuses, and undecodable bodies all degrade to deny.

use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::types::{Error, PolicyConfig, Result};

/// One authorization question: may this identity invoke this tool?
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub tool_name: String,
    pub identity: Option<Identity>,
    pub is_authenticated: bool,
}

impl AuthorizationRequest {
    pub fn authenticated(tool_name: impl Into<String>, identity: Identity) -> Self {
        Self {
            tool_name: tool_name.into(),
            identity: Some(identity),
            is_authenticated: true,
        }
    }

    /// Request for a turn where identity resolution failed; the policy
    /// engine sees `is_authenticated=false` and an empty role.
    pub fn anonymous(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            identity: None,
            is_authenticated: false,
        }
    }

    fn role(&self) -> &str {
        self.identity.as_ref().map(|i| i.role.as_str()).unwrap_or("")
    }
}

/// The answer. `allowed=false` is the fail-closed default whenever a real
/// decision could not be obtained; `reason` says why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl AuthorizationDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Canonical policy input payload: `{"input": {is_authenticated, role, tool}}`.
#[derive(Debug, Serialize)]
struct PolicyInput<'a> {
    is_authenticated: bool,
    role: &'a str,
    tool: &'a str,
}

#[derive(Debug, Serialize)]
struct PolicyQuery<'a> {
    input: PolicyInput<'a>,
}

#[derive(Debug, Deserialize)]
struct PolicyResponse {
    #[serde(default)]
    result: Option<bool>,
}

/// HTTP client for the policy engine's data API.
#[derive(Debug, Clone)]
pub struct PolicyClient {
    client: reqwest::Client,
    decision_url: String,
}

impl PolicyClient {
    pub fn new(config: &PolicyConfig) -> Self {
        // The timeout stays short so a hung policy engine cannot block the
        // interactive loop.
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        let decision_url = format!(
            "{}/v1/data/{}",
            config.base_url.trim_end_matches('/'),
            config.policy_path.trim_matches('/')
        );
        Self {
            client,
            decision_url,
        }
    }

    /// Ask the policy engine whether this request is allowed.
    ///
    /// Never returns an error and never caches: every call is one fresh
    /// query, and every failure mode is a deny with a reason.
    pub async fn decide(&self, request: &AuthorizationRequest) -> AuthorizationDecision {
        match self.query(request).await {
            Ok(true) => AuthorizationDecision::allow(),
            Ok(false) => AuthorizationDecision::deny("denied by policy"),
            Err(err) => {
                tracing::warn!(tool = %request.tool_name, error = %err,
                    "policy decision unavailable; failing closed");
                AuthorizationDecision::deny(format!("policy decision unavailable: {err}"))
            }
        }
    }

    async fn query(&self, request: &AuthorizationRequest) -> Result<bool> {
        let query = PolicyQuery {
            input: PolicyInput {
                is_authenticated: request.is_authenticated,
                role: request.role(),
                tool: &request.tool_name,
            },
        };

        let response = self
            .client
            .post(&self.decision_url)
            .json(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::malformed_response(format!(
                "policy engine answered HTTP {status}"
            )));
        }

        let body: PolicyResponse = response
            .json()
            .await
            .map_err(|err| Error::malformed_response(format!("policy engine body: {err}")))?;

        body.result
            .ok_or_else(|| Error::malformed_response("policy engine result missing"))
    }
}
