//! Configuration structures.
//!
//! Configuration is loaded from environment variables with serde-friendly
//! defaults, so embedding applications can also deserialize a config file
//! and override individual sections.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Global pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Credential store and OAuth endpoints.
    #[serde(default)]
    pub credentials: CredentialConfig,

    /// Identity resolution endpoints.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Policy engine client.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Collaborator agent endpoint.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Session loop bounds.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Credential store and OAuth token endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Path of the persisted credential file.
    pub token_file: PathBuf,

    /// OAuth client id.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: String,

    /// Authorization URL shown to the user when starting the flow.
    pub auth_url: String,

    /// Token endpoint for code exchange and refresh.
    pub token_url: String,

    /// Out-of-band redirect URI for the console flow.
    pub redirect_uri: String,

    /// Scopes requested during the exchange.
    pub scopes: Vec<String>,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            token_file: PathBuf::from(".token.json"),
            client_id: String::new(),
            client_secret: String::new(),
            auth_url: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            redirect_uri: "urn:ietf:wg:oauth:2.0:oob".to_string(),
            scopes: vec![
                "openid".to_string(),
                "profile".to_string(),
                "email".to_string(),
            ],
        }
    }
}

/// Identity endpoint and profile store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Userinfo endpoint queried with the bearer token.
    pub userinfo_url: String,

    /// Profile store base URL; profiles are looked up by verified email.
    pub profile_url: String,

    /// Request timeout for identity and profile lookups.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
            profile_url: "http://localhost:8200/profiles".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Policy engine client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Policy engine base URL.
    pub base_url: String,

    /// Document path under `/v1/data/` holding the allow rule.
    pub policy_path: String,

    /// Hard request timeout. A hung policy engine must not block the
    /// interactive loop, so this stays short.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8181".to_string(),
            policy_path: "tools/allow".to_string(),
            timeout: Duration::from_secs(3),
        }
    }
}

/// Collaborator agent endpoint configuration (classifier and executor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// OpenAI-style chat completions base URL.
    pub base_url: String,

    /// API key sent as a bearer token.
    pub api_key: String,

    /// Model name passed through to the endpoint.
    pub model: String,

    /// Request timeout for agent calls.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            api_key: String::new(),
            model: "gpt-4o".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Session loop bounds.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    /// Maximum authentication turns before the loop gives up.
    /// `None` keeps the attended-console behavior of retrying until the
    /// user cancels; set a bound for unattended operation.
    pub max_auth_turns: Option<u32>,
}

impl Config {
    /// Build a config from environment variables, falling back to defaults.
    ///
    /// Recognized variables: `TOOLGATE_TOKEN_FILE`, `TOOLGATE_CLIENT_ID`,
    /// `TOOLGATE_CLIENT_SECRET`, `TOOLGATE_TOKEN_URL`, `TOOLGATE_AUTH_URL`,
    /// `TOOLGATE_USERINFO_URL`, `TOOLGATE_PROFILE_URL`, `TOOLGATE_POLICY_URL`,
    /// `TOOLGATE_POLICY_PATH`, `TOOLGATE_AGENT_URL`, `TOOLGATE_AGENT_KEY`,
    /// `TOOLGATE_AGENT_MODEL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("TOOLGATE_TOKEN_FILE") {
            config.credentials.token_file = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("TOOLGATE_CLIENT_ID") {
            config.credentials.client_id = v;
        }
        if let Ok(v) = std::env::var("TOOLGATE_CLIENT_SECRET") {
            config.credentials.client_secret = v;
        }
        if let Ok(v) = std::env::var("TOOLGATE_TOKEN_URL") {
            config.credentials.token_url = v;
        }
        if let Ok(v) = std::env::var("TOOLGATE_AUTH_URL") {
            config.credentials.auth_url = v;
        }
        if let Ok(v) = std::env::var("TOOLGATE_USERINFO_URL") {
            config.identity.userinfo_url = v;
        }
        if let Ok(v) = std::env::var("TOOLGATE_PROFILE_URL") {
            config.identity.profile_url = v;
        }
        if let Ok(v) = std::env::var("TOOLGATE_POLICY_URL") {
            config.policy.base_url = v;
        }
        if let Ok(v) = std::env::var("TOOLGATE_POLICY_PATH") {
            config.policy.policy_path = v;
        }
        if let Ok(v) = std::env::var("TOOLGATE_AGENT_URL") {
            config.agent.base_url = v;
        }
        if let Ok(v) = std::env::var("TOOLGATE_AGENT_KEY") {
            config.agent.api_key = v;
        }
        if let Ok(v) = std::env::var("TOOLGATE_AGENT_MODEL") {
            config.agent.model = v;
        }

        config
    }
}
