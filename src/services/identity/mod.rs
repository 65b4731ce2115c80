pub mod remote;

use async_trait::async_trait;

/// The identity collaborator. Credentials, sessions and social login all live
/// with the hosted provider; the core only ever asks it to turn an opaque
/// bearer token into a principal id.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` means the token was rejected; `Err` means the provider
    /// itself could not be reached.
    async fn resolve_token(&self, token: &str) -> anyhow::Result<Option<String>>;
}
