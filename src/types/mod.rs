//! Core types for the toolgate pipeline.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (SessionId, TurnId, UserId)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for credentials, identity, policy, and agents

mod config;
mod errors;
mod ids;

pub use config::{
    AgentConfig, Config, CredentialConfig, IdentityConfig, PolicyConfig, SessionConfig,
};
pub use errors::{Error, Result};
pub use ids::{SessionId, TurnId, UserId};
