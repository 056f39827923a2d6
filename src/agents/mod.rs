//! Collaborator adapters.
//!
//! The classifier and executor are LLM agents reached over an OpenAI-style
//! chat-completions endpoint; the authenticator drives the out-of-band OAuth
//! console flow. Everything here sits outside the authorization core and is
//! reachable only through the pipeline's trait boundaries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::classify::{extract_result, ClassificationResult, IntentClassifier};
use crate::credentials::{CredentialStore, TokenEndpoint};
use crate::pipeline::{AuthCollaborator, ToolExecutor};
use crate::tools::ToolRegistry;
use crate::types::{AgentConfig, Error, Result};

// =============================================================================
// Chat agent transport
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Minimal chat-completions client shared by the classifier and executor.
#[derive(Debug, Clone)]
pub struct ChatAgent {
    client: reqwest::Client,
    config: AgentConfig,
    completions_url: String,
}

impl ChatAgent {
    pub fn new(config: AgentConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        let completions_url = format!(
            "{}/v1/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        Self {
            client,
            config,
            completions_url,
        }
    }

    /// One system + user exchange; returns the assistant's text.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.0,
        };

        let mut builder = self.client.post(&self.completions_url).json(&request);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::malformed_response(format!(
                "agent endpoint answered HTTP {status}"
            )));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| Error::malformed_response(format!("agent endpoint body: {err}")))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::malformed_response("agent reply had no content"))
    }
}

// =============================================================================
// Classifier agent
// =============================================================================

/// Classifier collaborator: prompts the agent with the registry's tool list
/// and parses the single JSON record out of whatever comes back.
#[derive(Debug, Clone)]
pub struct AgentClassifier {
    agent: ChatAgent,
}

impl AgentClassifier {
    pub fn new(agent: ChatAgent) -> Self {
        Self { agent }
    }

    fn system_prompt(registry: &ToolRegistry) -> String {
        format!(
            "You map a user request to at most one tool from this list.\n\n{}\n\n\
             Respond with exactly one JSON object of the form \
             {{\"tool_name\": \"<name>\", \"tool_type\": \"<read_only|write>\"}}. \
             If no tool fits, respond with {{\"tool_name\": \"\", \"tool_type\": \"\"}}.",
            registry.prompt_lines()
        )
    }
}

#[async_trait]
impl IntentClassifier for AgentClassifier {
    async fn classify(
        &self,
        prompt: &str,
        registry: &ToolRegistry,
    ) -> Result<ClassificationResult> {
        let reply = self
            .agent
            .complete(&Self::system_prompt(registry), prompt)
            .await?;
        Ok(extract_result(&reply, registry))
    }
}

// =============================================================================
// Executor agent
// =============================================================================

const EXECUTOR_SYSTEM_PROMPT: &str =
    "You are an assistant with access to document-store tools. \
     Carry out the user's request and report the result clearly.";

/// Execution collaborator: forwards the original prompt to the task agent.
#[derive(Debug, Clone)]
pub struct AgentExecutor {
    agent: ChatAgent,
}

impl AgentExecutor {
    pub fn new(agent: ChatAgent) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl ToolExecutor for AgentExecutor {
    async fn execute(&self, prompt: &str, tool_name: &str) -> Result<String> {
        tracing::info!(tool = %tool_name, "handing prompt to execution collaborator");
        self.agent.complete(EXECUTOR_SYSTEM_PROMPT, prompt).await
    }
}

// =============================================================================
// OAuth console authenticator
// =============================================================================

/// Authentication collaborator driving the out-of-band console flow:
/// `authenticate` shows the authorization URL, any other input is treated
/// as an authorization code and exchanged for a credential.
#[derive(Debug, Clone)]
pub struct OAuthAuthenticator {
    endpoint: TokenEndpoint,
    store: CredentialStore,
}

impl OAuthAuthenticator {
    pub fn new(endpoint: TokenEndpoint, store: CredentialStore) -> Self {
        Self { endpoint, store }
    }
}

#[async_trait]
impl AuthCollaborator for OAuthAuthenticator {
    async fn run_turn(&self, input: &str) -> Result<String> {
        if input.eq_ignore_ascii_case("authenticate") {
            return Ok(format!(
                "Please visit this URL to authorize the application:\n{}\n\n\
                 After authorization, paste the authorization code here.",
                self.endpoint.authorization_url()
            ));
        }

        // Anything else is taken as an authorization code. A failed exchange
        // is reported to the user and the loop continues.
        match self.endpoint.exchange_code(input.trim()).await {
            Ok(credential) => {
                self.store.save(&credential)?;
                Ok("Authentication successful! Credentials saved.".to_string())
            }
            Err(err) => {
                tracing::warn!(error = %err, "authorization code exchange failed");
                Ok(format!("Authentication failed: {err}"))
            }
        }
    }
}
