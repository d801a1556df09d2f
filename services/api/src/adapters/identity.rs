//! services/api/src/adapters/identity.rs
//!
//! Implements the `IdentityService` port for deployments where an upstream
//! auth proxy has already verified the caller and forwards the user id in a
//! trusted header. The API must not be reachable except through that proxy.

use async_trait::async_trait;
use debugmate_core::{
    domain::UserIdentity,
    ports::{IdentityService, PortError, PortResult},
};

const MAX_USER_ID_LEN: usize = 255;

#[derive(Clone, Default)]
pub struct TrustedHeaderIdentity;

impl TrustedHeaderIdentity {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IdentityService for TrustedHeaderIdentity {
    async fn verify(&self, credential: &str) -> PortResult<UserIdentity> {
        let user_id = credential.trim();
        if user_id.is_empty()
            || user_id.len() > MAX_USER_ID_LEN
            || user_id.chars().any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(PortError::Unauthorized);
        }
        Ok(UserIdentity {
            user_id: user_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_provider_ids() {
        let identity = TrustedHeaderIdentity::new()
            .verify(" user_2abcDEF ")
            .await
            .unwrap();
        assert_eq!(identity.user_id, "user_2abcDEF");
    }

    #[tokio::test]
    async fn rejects_blank_or_garbled_ids() {
        let verifier = TrustedHeaderIdentity::new();
        assert!(verifier.verify("").await.is_err());
        assert!(verifier.verify("two words").await.is_err());
        assert!(verifier.verify(&"x".repeat(256)).await.is_err());
    }
}
