//! Authentication handshake run before a session starts syncing.

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
    Authenticated,
    NotAuthenticated,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Ensures the remote store will accept this client's requests.
    async fn ensure_authenticated(&self) -> bool;
}

/// For stores that need no handshake.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysAuthenticated;

#[async_trait]
impl Authenticator for AlwaysAuthenticated {
    async fn ensure_authenticated(&self) -> bool {
        true
    }
}

/// Runs the handshake, resolving to `NotAuthenticated` if it fails or hangs
/// past `timeout`.
pub async fn authenticate_with_timeout(auth: &dyn Authenticator, timeout: Duration) -> AuthState {
    match tokio::time::timeout(timeout, auth.ensure_authenticated()).await {
        Ok(true) => AuthState::Authenticated,
        Ok(false) => AuthState::NotAuthenticated,
        Err(_) => {
            warn!("authentication timed out after {timeout:?}");
            AuthState::NotAuthenticated
        }
    }
}
