//! API key authorization for job submission.
//!
//! Both keys are hashed with SHA-256 before comparison so the comparison
//! time does not depend on how many leading characters match.

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

/// Header that may carry the API key instead of the request body.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("Unauthorized: Invalid API key")]
    InvalidKey,

    #[error("Unauthorized: API key not configured")]
    NotConfigured,
}

/// Check a provided API key against the configured one.
///
/// With no key configured every request is refused.
pub fn verify_api_key(expected: Option<&str>, provided: Option<&str>) -> Result<(), AuthorizationError> {
    let Some(expected) = expected else {
        warn!("api_key_not_configured");
        return Err(AuthorizationError::NotConfigured);
    };

    let provided = provided.unwrap_or("");
    if Sha256::digest(expected.as_bytes()) == Sha256::digest(provided.as_bytes()) {
        Ok(())
    } else {
        warn!(has_key = !provided.is_empty(), "api_key_invalid");
        Err(AuthorizationError::InvalidKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_matching_key() {
        assert_eq!(verify_api_key(Some("k3y"), Some("k3y")), Ok(()));
    }

    #[test]
    fn test_verify_wrong_or_missing_key() {
        assert_eq!(
            verify_api_key(Some("k3y"), Some("nope")),
            Err(AuthorizationError::InvalidKey)
        );
        assert_eq!(verify_api_key(Some("k3y"), None), Err(AuthorizationError::InvalidKey));
    }

    #[test]
    fn test_verify_without_configured_key() {
        assert_eq!(
            verify_api_key(None, Some("anything")),
            Err(AuthorizationError::NotConfigured)
        );
    }
}
