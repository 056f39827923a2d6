//! Pipeline orchestration — the end-to-end authorization state machine.
//!
//! One session is a synchronous cooperative loop: each user turn runs
//! classify → policy-check → execute to completion before the next line of
//! input is read. Cancellation is checked only at turn boundaries.

mod orchestrator;

use async_trait::async_trait;

use crate::types::Result;

pub use orchestrator::Pipeline;

/// Prompt shown while authenticating.
pub const AUTH_PROMPT: &str = "Auth> ";
/// Prompt shown during normal operation.
pub const TASK_PROMPT: &str = "Task> ";

/// Reserved inputs that cancel the current loop, case-insensitive.
const CANCEL_WORDS: [&str; 2] = ["exit", "quit"];

pub(crate) fn is_cancellation(input: &str) -> bool {
    CANCEL_WORDS
        .iter()
        .any(|word| input.eq_ignore_ascii_case(word))
}

/// Session states. `Exit` is reachable from any state on explicit user
/// cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Idle,
    Classifying,
    PolicyCheck,
    Executing,
    Exit,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Authenticating => "authenticating",
            SessionState::Idle => "idle",
            SessionState::Classifying => "classifying",
            SessionState::PolicyCheck => "policy_check",
            SessionState::Executing => "executing",
            SessionState::Exit => "exit",
        }
    }
}

/// How one task turn ended. Execution failures belong to the collaborator;
/// the pipeline only records that the turn is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    NoToolDetected,
    Denied { reason: Option<String> },
    Executed,
    ExecutionFailed,
}

/// How the whole session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// User exited from the task loop.
    Completed,
    /// User cancelled during authentication.
    AuthenticationCancelled,
    /// The configured authentication turn bound was exhausted.
    AuthenticationExhausted,
}

/// External agent that drives the OAuth exchange, one conversation turn at
/// a time. The pipeline re-checks credential validity after every turn.
#[async_trait]
pub trait AuthCollaborator: Send + Sync {
    async fn run_turn(&self, input: &str) -> Result<String>;
}

/// External collaborator that executes an authorized request. Receives the
/// original prompt, not just the tool name; its internal failures are its
/// own concern.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, prompt: &str, tool_name: &str) -> Result<String>;
}

/// Thin interactive front-end. Reads happen at turn boundaries only.
pub trait Console: Send {
    /// Read one line of input. `Ok(None)` means end of input and is treated
    /// as cancellation.
    fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>>;

    /// Show a message to the user.
    fn report(&mut self, message: &str);
}
