//! Credential lifecycle: persisted token material, validity checks, refresh.

mod oauth;
mod store;

use async_trait::async_trait;

use crate::types::Result;

pub use oauth::TokenEndpoint;
pub use store::{Credential, CredentialStore};

/// Boundary for renewing an expired credential.
///
/// The production implementation is [`TokenEndpoint`]; tests substitute
/// fakes so refresh behavior can be exercised without a network.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<Credential>;
}
