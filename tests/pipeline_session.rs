//! End-to-end session tests — real HTTP clients against local fixtures.
//!
//! One axum server plays the token endpoint, userinfo endpoint, profile
//! store, policy engine, and chat-completions agent; the pipeline runs a
//! whole session over a scripted console.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use pretty_assertions::assert_eq;

use toolgate::agents::{AgentClassifier, AgentExecutor, ChatAgent, OAuthAuthenticator};
use toolgate::credentials::{Credential, CredentialStore, TokenEndpoint};
use toolgate::identity::HttpIdentityClient;
use toolgate::pipeline::{Console, Pipeline, SessionOutcome};
use toolgate::policy::PolicyClient;
use toolgate::tools::document_store_registry;
use toolgate::types::{
    AgentConfig, CredentialConfig, IdentityConfig, PolicyConfig, SessionConfig,
};

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Clone)]
struct FixtureState {
    policy_hits: Arc<AtomicUsize>,
}

/// Token endpoint: accepts any code or refresh token.
async fn token(axum::extract::Form(params): axum::extract::Form<std::collections::HashMap<String, String>>) -> Json<serde_json::Value> {
    let grant = params.get("grant_type").cloned().unwrap_or_default();
    Json(serde_json::json!({
        "access_token": format!("tok-{grant}"),
        "refresh_token": "r-token",
        "expires_in": 3600
    }))
}

/// Userinfo endpoint: any bearer token maps to the same user.
async fn userinfo() -> Json<serde_json::Value> {
    Json(serde_json::json!({"id": "109", "email": "ada@example.com"}))
}

/// Profile store: ada is an analyst.
async fn profile() -> Json<serde_json::Value> {
    Json(serde_json::json!({"role": "analyst"}))
}

/// Policy engine: analysts may read, nobody may write.
async fn policy(
    State(state): State<FixtureState>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    state.policy_hits.fetch_add(1, Ordering::SeqCst);
    let authenticated = body["input"]["is_authenticated"].as_bool().unwrap_or(false);
    let role = body["input"]["role"].as_str().unwrap_or("");
    let tool = body["input"]["tool"].as_str().unwrap_or("");

    let read_only = matches!(
        tool,
        "list_databases" | "list_collections" | "find_documents" | "count_documents"
    );
    let allowed = authenticated && role == "analyst" && read_only;
    Json(serde_json::json!({"result": allowed}))
}

/// Chat agent: classification requests get a tool record, execution
/// requests get a completion message.
async fn chat(Json(body): Json<serde_json::Value>) -> Json<serde_json::Value> {
    let system = body["messages"][0]["content"].as_str().unwrap_or("");
    let user = body["messages"][1]["content"].as_str().unwrap_or("");

    let reply = if system.starts_with("You map a user request") {
        if user.contains("databases") {
            r#"{"tool_name": "list_databases", "tool_type": "read_only"}"#.to_string()
        } else if user.contains("delete") {
            r#"{"tool_name": "delete_many_documents", "tool_type": "write"}"#.to_string()
        } else {
            r#"{"tool_name": "", "tool_type": ""}"#.to_string()
        }
    } else {
        format!("Completed request: {user}")
    };

    Json(serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": reply}}]
    }))
}

async fn start_fixture() -> (String, Arc<AtomicUsize>) {
    let policy_hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/token", post(token))
        .route("/userinfo", get(userinfo))
        .route("/profiles/ada@example.com", get(profile))
        .route("/v1/data/tools/allow", post(policy))
        .route("/v1/chat/completions", post(chat))
        .with_state(FixtureState {
            policy_hits: policy_hits.clone(),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}"), policy_hits)
}

// =============================================================================
// Scripted console
// =============================================================================

struct ScriptedConsole {
    inputs: VecDeque<String>,
    reports: Vec<String>,
}

impl ScriptedConsole {
    fn new(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            reports: Vec::new(),
        }
    }

    fn saw(&self, needle: &str) -> bool {
        self.reports.iter().any(|line| line.contains(needle))
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, _prompt: &str) -> std::io::Result<Option<String>> {
        Ok(self.inputs.pop_front())
    }

    fn report(&mut self, message: &str) {
        self.reports.push(message.to_string());
    }
}

// =============================================================================
// Wiring
// =============================================================================

fn build_pipeline(base: &str, store: CredentialStore) -> Pipeline {
    let credential_config = CredentialConfig {
        token_file: store.path().to_path_buf(),
        token_url: format!("{base}/token"),
        client_id: "client-1".to_string(),
        client_secret: "hunter2".to_string(),
        ..CredentialConfig::default()
    };
    let token_endpoint = TokenEndpoint::new(credential_config);

    let identity_client = Arc::new(HttpIdentityClient::new(IdentityConfig {
        userinfo_url: format!("{base}/userinfo"),
        profile_url: format!("{base}/profiles"),
        timeout: Duration::from_secs(2),
    }));

    let chat_agent = ChatAgent::new(AgentConfig {
        base_url: base.to_string(),
        api_key: String::new(),
        model: "gpt-4o".to_string(),
        timeout: Duration::from_secs(2),
    });

    let policy_client = PolicyClient::new(&PolicyConfig {
        base_url: base.to_string(),
        policy_path: "tools/allow".to_string(),
        timeout: Duration::from_millis(500),
    });

    Pipeline::new(
        store.clone(),
        Arc::new(token_endpoint.clone()),
        identity_client.clone(),
        identity_client,
        document_store_registry(),
        Arc::new(AgentClassifier::new(chat_agent.clone())),
        policy_client,
        Arc::new(OAuthAuthenticator::new(token_endpoint, store)),
        Arc::new(AgentExecutor::new(chat_agent)),
        SessionConfig::default(),
    )
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn full_session_from_cold_start() {
    let (base, policy_hits) = start_fixture().await;
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(dir.path().join(".token.json"));
    let mut pipeline = build_pipeline(&base, store.clone());

    let mut console = ScriptedConsole::new(&[
        "authenticate",        // shows the authorization URL
        "4/code-from-browser", // exchanged for a credential
        "show me all databases",
        "delete everything",
        "what is the meaning of life",
        "exit",
    ]);

    let outcome = pipeline.run(&mut console).await.unwrap();
    assert_eq!(outcome, SessionOutcome::Completed);

    // Auth flow ran and persisted a credential.
    assert!(console.saw("AUTHENTICATION REQUIRED"));
    assert!(console.saw("Authentication successful!"));
    assert!(store.load().unwrap().is_some());

    // Allowed read executed with the original prompt.
    assert!(console.saw("Completed request: show me all databases"));

    // Write denied by policy; no-match prompted no policy call.
    assert!(console.saw("Request blocked by policy."));
    assert!(console.saw("No tool detected for this request."));
    assert_eq!(policy_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn valid_credential_skips_auth_ui() {
    let (base, _) = start_fixture().await;
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(dir.path().join(".token.json"));
    store
        .save(&Credential {
            access_token: "tok".to_string(),
            refresh_token: None,
            expiry: Some(Utc::now() + chrono::Duration::hours(1)),
            scopes: vec![],
        })
        .unwrap();

    let mut pipeline = build_pipeline(&base, store);
    let mut console = ScriptedConsole::new(&["exit"]);

    let outcome = pipeline.run(&mut console).await.unwrap();
    assert_eq!(outcome, SessionOutcome::Completed);
    assert!(console.saw("Already authenticated."));
    assert!(!console.saw("AUTHENTICATION REQUIRED"));
}

#[tokio::test]
async fn expired_credential_is_refreshed_on_session_start() {
    let (base, _) = start_fixture().await;
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(dir.path().join(".token.json"));
    store
        .save(&Credential {
            access_token: "stale".to_string(),
            refresh_token: Some("r-token".to_string()),
            expiry: Some(Utc::now() - chrono::Duration::hours(1)),
            scopes: vec![],
        })
        .unwrap();

    let mut pipeline = build_pipeline(&base, store.clone());
    let mut console = ScriptedConsole::new(&["exit"]);

    let outcome = pipeline.run(&mut console).await.unwrap();
    assert_eq!(outcome, SessionOutcome::Completed);
    assert!(console.saw("Already authenticated."));

    // The refreshed credential was re-persisted.
    let persisted = store.load().unwrap().unwrap();
    assert_eq!(persisted.access_token, "tok-refresh_token");
}

#[tokio::test]
async fn cancelled_authentication_reports_failure() {
    let (base, _) = start_fixture().await;
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(dir.path().join(".token.json"));
    let mut pipeline = build_pipeline(&base, store);

    let mut console = ScriptedConsole::new(&["exit"]);
    let outcome = pipeline.run(&mut console).await.unwrap();
    assert_eq!(outcome, SessionOutcome::AuthenticationCancelled);
}
