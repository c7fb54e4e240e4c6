use async_trait::async_trait;

use quadrant_common::Identity;

use super::{Credentials, IdentityProvider};
use crate::errors::AuthError;

/// Signs in as a fixed identity taken from configuration. No network.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    uid: String,
    display_name: Option<String>,
}

impl LocalProvider {
    pub fn new(uid: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name,
        }
    }
}

#[async_trait]
impl IdentityProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn sign_in(&self) -> Result<Credentials, AuthError> {
        if self.uid.trim().is_empty() {
            return Err(AuthError::NotConfigured(
                "local provider needs a user; set auth.local_user or QUADRANT_USER".to_string(),
            ));
        }
        Ok(Credentials {
            identity: Identity {
                uid: self.uid.trim().to_string(),
                display_name: self.display_name.clone(),
                provider: self.name().to_string(),
            },
            access_token: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_sign_in_uses_configured_identity() {
        let creds = LocalProvider::new("ada", None).sign_in().await.unwrap();
        assert_eq!(creds.identity.uid, "ada");
        assert_eq!(creds.identity.provider, "local");
        assert!(creds.access_token.is_none());
    }

    #[tokio::test]
    async fn test_local_sign_in_requires_user() {
        let err = LocalProvider::new("  ", None).sign_in().await.unwrap_err();
        assert!(matches!(err, AuthError::NotConfigured(_)));
    }
}
