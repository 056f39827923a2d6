//! The session orchestrator.
//!
//! Sequences credential check → authentication loop → per-turn
//! classify / policy-check / execute. Every recoverable failure degrades to
//! the least-privileged outcome (unauthenticated, no-match, deny) and
//! returns control to the turn loop; only explicit cancellation exits.

use std::sync::Arc;

use tracing::Instrument;

use crate::classify::IntentClassifier;
use crate::credentials::{CredentialStore, TokenRefresher};
use crate::identity::{IdentityResolver, RoleDirectory};
use crate::policy::{AuthorizationRequest, PolicyClient};
use crate::pipeline::{
    is_cancellation, AuthCollaborator, Console, SessionOutcome, SessionState, ToolExecutor,
    TurnOutcome, AUTH_PROMPT, TASK_PROMPT,
};
use crate::tools::ToolRegistry;
use crate::types::{Result, SessionConfig, SessionId, TurnId};

/// One user session over the authorization pipeline.
///
/// All collaborators are injected at construction; no ambient globals.
pub struct Pipeline {
    store: CredentialStore,
    refresher: Arc<dyn TokenRefresher>,
    resolver: Arc<dyn IdentityResolver>,
    roles: Arc<dyn RoleDirectory>,
    registry: ToolRegistry,
    classifier: Arc<dyn IntentClassifier>,
    policy: PolicyClient,
    auth: Arc<dyn AuthCollaborator>,
    executor: Arc<dyn ToolExecutor>,
    config: SessionConfig,
    session_id: SessionId,
    state: SessionState,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("session_id", &self.session_id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: CredentialStore,
        refresher: Arc<dyn TokenRefresher>,
        resolver: Arc<dyn IdentityResolver>,
        roles: Arc<dyn RoleDirectory>,
        registry: ToolRegistry,
        classifier: Arc<dyn IntentClassifier>,
        policy: PolicyClient,
        auth: Arc<dyn AuthCollaborator>,
        executor: Arc<dyn ToolExecutor>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            refresher,
            resolver,
            roles,
            registry,
            classifier,
            policy,
            auth,
            executor,
            config,
            session_id: SessionId::new(),
            state: SessionState::Unauthenticated,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn enter(&mut self, next: SessionState) {
        tracing::debug!(session = %self.session_id,
            from = self.state.as_str(), to = next.as_str(), "state transition");
        self.state = next;
    }

    /// Run the session to completion.
    pub async fn run(&mut self, console: &mut dyn Console) -> Result<SessionOutcome> {
        // Already-authenticated sessions skip the auth UI entirely.
        if self.store.ensure_valid(self.refresher.as_ref()).await?.is_some() {
            console.report("Already authenticated.");
            self.enter(SessionState::Idle);
        } else {
            match self.authenticate(console).await? {
                None => {}
                Some(outcome) => {
                    self.enter(SessionState::Exit);
                    return Ok(outcome);
                }
            }
        }

        self.task_loop(console).await
    }

    /// Authentication loop: forward turns to the auth collaborator until the
    /// credential store holds a valid credential.
    ///
    /// Returns `Some(outcome)` if the session ends here, `None` on success.
    async fn authenticate(
        &mut self,
        console: &mut dyn Console,
    ) -> Result<Option<SessionOutcome>> {
        self.enter(SessionState::Authenticating);
        console.report("=== AUTHENTICATION REQUIRED ===");
        console.report("Type 'authenticate' to start the authentication process.");

        let mut turns = 0u32;
        loop {
            let Some(input) = console.read_line(AUTH_PROMPT)? else {
                console.report("Authentication cancelled.");
                return Ok(Some(SessionOutcome::AuthenticationCancelled));
            };
            let input = input.trim().to_string();
            if input.is_empty() {
                continue;
            }
            if is_cancellation(&input) {
                console.report("Authentication cancelled.");
                return Ok(Some(SessionOutcome::AuthenticationCancelled));
            }

            turns += 1;
            match self.auth.run_turn(&input).await {
                Ok(reply) => console.report(&reply),
                Err(err) => {
                    tracing::warn!(error = %err, "authentication turn failed");
                    console.report(&format!("Authentication step failed: {err}"));
                }
            }

            if self.store.ensure_valid(self.refresher.as_ref()).await?.is_some() {
                console.report("Authentication successful!");
                self.enter(SessionState::Idle);
                return Ok(None);
            }
            console.report("Authentication not yet complete. Please continue...");

            if let Some(max) = self.config.max_auth_turns {
                if turns >= max {
                    console.report("Authentication attempts exhausted.");
                    return Ok(Some(SessionOutcome::AuthenticationExhausted));
                }
            }
        }
    }

    /// The main task loop: one prompt per turn, fully processed before the
    /// next line is read.
    async fn task_loop(&mut self, console: &mut dyn Console) -> Result<SessionOutcome> {
        console.report(&self.registry.prompt_lines());
        console.report("Type 'exit' to quit.");

        loop {
            let Some(input) = console.read_line(TASK_PROMPT)? else {
                break;
            };
            let input = input.trim().to_string();
            if input.is_empty() {
                continue;
            }
            if is_cancellation(&input) {
                break;
            }

            let turn_id = TurnId::new();
            let span = tracing::info_span!("turn", session = %self.session_id, turn = %turn_id);
            let outcome = self.handle_turn(&input, console).instrument(span).await;
            tracing::info!(turn = %turn_id, outcome = ?outcome, "turn finished");
            self.enter(SessionState::Idle);
        }

        console.report("Agent stopped.");
        self.enter(SessionState::Exit);
        Ok(SessionOutcome::Completed)
    }

    /// One task turn: classify, authorize, and (only on explicit allow)
    /// execute. The policy decision is made fresh within this turn and is
    /// never cached or reused.
    async fn handle_turn(&mut self, prompt: &str, console: &mut dyn Console) -> TurnOutcome {
        self.enter(SessionState::Classifying);
        let classification = match self.classifier.classify(prompt, &self.registry).await {
            Ok(classification) => classification,
            Err(err) => {
                tracing::warn!(error = %err, "classifier unavailable; treating as no match");
                crate::classify::ClassificationResult::no_match()
            }
        };

        // Classification failure is not policy failure: no policy call is
        // made for a no-match, the user is simply told nothing was detected.
        if classification.is_no_match() || !self.registry.contains(&classification.tool_name) {
            console.report("No tool detected for this request.");
            return TurnOutcome::NoToolDetected;
        }
        let tool_name = classification.tool_name;
        tracing::info!(tool = %tool_name, category = ?classification.category, "tool classified");

        self.enter(SessionState::PolicyCheck);
        let request = self.authorization_request(&tool_name).await;
        let decision = self.policy.decide(&request).await;
        if !decision.allowed {
            tracing::info!(tool = %tool_name, reason = ?decision.reason, "blocked by policy");
            console.report("Request blocked by policy.");
            return TurnOutcome::Denied {
                reason: decision.reason,
            };
        }

        self.enter(SessionState::Executing);
        match self.executor.execute(prompt, &tool_name).await {
            Ok(output) => {
                console.report(&output);
                TurnOutcome::Executed
            }
            Err(err) => {
                // Execution failures are the collaborator's concern; the
                // pipeline just returns to idle.
                tracing::warn!(tool = %tool_name, error = %err, "execution collaborator failed");
                console.report(&format!("Tool execution failed: {err}"));
                TurnOutcome::ExecutionFailed
            }
        }
    }

    /// Resolve identity fresh for this turn and build the policy request.
    ///
    /// Any credential or resolution failure degrades to an anonymous
    /// request (`is_authenticated=false`, empty role), never an error.
    async fn authorization_request(&self, tool_name: &str) -> AuthorizationRequest {
        let credential = match self.store.ensure_valid(self.refresher.as_ref()).await {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                tracing::info!("no valid credential for this turn");
                return AuthorizationRequest::anonymous(tool_name);
            }
            Err(err) => {
                tracing::warn!(error = %err, "credential check failed");
                return AuthorizationRequest::anonymous(tool_name);
            }
        };

        match self.resolver.resolve(&credential).await {
            Ok(Some(mut identity)) => {
                identity.role = self.roles.role_for(&identity.email).await;
                AuthorizationRequest::authenticated(tool_name, identity)
            }
            Ok(None) => {
                tracing::info!("identity resolution incomplete; proceeding unauthenticated");
                AuthorizationRequest::anonymous(tool_name)
            }
            Err(err) => {
                tracing::warn!(error = %err, "identity endpoint unreachable");
                AuthorizationRequest::anonymous(tool_name)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
