//! Toolgate interactive session - main entry point.
//!
//! Wires the credential store, identity clients, tool registry, policy
//! client, and agent collaborators into one pipeline and runs it over a
//! readline console.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use toolgate::agents::{AgentClassifier, AgentExecutor, ChatAgent, OAuthAuthenticator};
use toolgate::credentials::{CredentialStore, TokenEndpoint};
use toolgate::identity::HttpIdentityClient;
use toolgate::pipeline::{Console, Pipeline, SessionOutcome};
use toolgate::policy::PolicyClient;
use toolgate::tools::document_store_registry;
use toolgate::Config;

#[derive(Parser, Debug)]
#[command(name = "toolgate", about = "Policy-gated access to document-store tools")]
struct Cli {
    /// Credential file path
    #[arg(long)]
    token_file: Option<PathBuf>,

    /// Policy engine base URL
    #[arg(long)]
    policy_url: Option<String>,

    /// Agent endpoint base URL
    #[arg(long)]
    agent_url: Option<String>,

    /// Model name passed to the agent endpoint
    #[arg(long)]
    model: Option<String>,

    /// Maximum authentication turns before giving up (default: unbounded)
    #[arg(long)]
    max_auth_turns: Option<u32>,
}

/// Readline-backed console for the interactive loop.
struct ReadlineConsole {
    editor: DefaultEditor,
}

impl Console for ReadlineConsole {
    fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                let _ = self.editor.add_history_entry(line.as_str());
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(std::io::Error::other(err)),
        }
    }

    fn report(&mut self, message: &str) {
        println!("{message}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(token_file) = cli.token_file {
        config.credentials.token_file = token_file;
    }
    if let Some(policy_url) = cli.policy_url {
        config.policy.base_url = policy_url;
    }
    if let Some(agent_url) = cli.agent_url {
        config.agent.base_url = agent_url;
    }
    if let Some(model) = cli.model {
        config.agent.model = model;
    }
    if cli.max_auth_turns.is_some() {
        config.session.max_auth_turns = cli.max_auth_turns;
    }

    // Initialize observability
    toolgate::observability::init_tracing();
    tracing::info!(
        policy_url = %config.policy.base_url,
        token_file = %config.credentials.token_file.display(),
        "starting toolgate session"
    );

    // Wire the pipeline
    let store = CredentialStore::new(config.credentials.token_file.clone());
    let token_endpoint = TokenEndpoint::new(config.credentials.clone());
    let identity_client = Arc::new(HttpIdentityClient::new(config.identity.clone()));
    let chat_agent = ChatAgent::new(config.agent.clone());

    let mut pipeline = Pipeline::new(
        store.clone(),
        Arc::new(token_endpoint.clone()),
        identity_client.clone(),
        identity_client,
        document_store_registry(),
        Arc::new(AgentClassifier::new(chat_agent.clone())),
        PolicyClient::new(&config.policy),
        Arc::new(OAuthAuthenticator::new(token_endpoint, store)),
        Arc::new(AgentExecutor::new(chat_agent)),
        config.session.clone(),
    );

    let mut console = ReadlineConsole {
        editor: DefaultEditor::new()?,
    };

    match pipeline.run(&mut console).await? {
        SessionOutcome::Completed => Ok(()),
        SessionOutcome::AuthenticationCancelled | SessionOutcome::AuthenticationExhausted => {
            eprintln!("Authentication failed or cancelled. Exiting.");
            std::process::exit(1);
        }
    }
}
