//! Identity collaborator. Real authentication lives outside the core; the
//! core only consumes `verify(token) -> playerId`.

use async_trait::async_trait;
use thiserror::Error;

use crate::table::PlayerId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid auth token")]
    InvalidToken,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, auth_token: &str) -> Result<PlayerId, AuthError>;
}

/// Development verifier: accepts `dev:<playerId>` tokens. Not for production.
pub struct DevIdentityVerifier;

#[async_trait]
impl IdentityVerifier for DevIdentityVerifier {
    async fn verify(&self, auth_token: &str) -> Result<PlayerId, AuthError> {
        let player_id = auth_token
            .strip_prefix("dev:")
            .filter(|id| !id.is_empty() && id.len() <= 64)
            .ok_or(AuthError::InvalidToken)?;
        Ok(player_id.to_string())
    }
}
