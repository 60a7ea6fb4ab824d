use std::time::Duration;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use super::model::{AccessClaims, AuthenticatedUser};
use crate::core::config::AuthConfig;
use crate::core::error::AppError;

/// Validates HS256 access tokens issued by the store platform
pub struct JwtValidator {
    decoding_key: DecodingKey,
    issuer: Option<String>,
    leeway: u64,
}

impl JwtValidator {
    pub fn new(secret: &str, issuer: Option<String>, leeway: Duration) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            leeway: leeway.as_secs(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.issuer.clone(), config.jwt_leeway)
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway;
        validation.validate_aud = false;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
            validation.set_required_spec_claims(&["exp", "iss"]);
        }

        let token_data = decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid access token: {}", e)))?;

        let claims = token_data.claims;

        let user_id = claims
            .sub
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| AppError::Unauthorized("Invalid subject in access token".to_string()))?;

        Ok(AuthenticatedUser {
            user_id,
            capabilities: claims.caps,
            editable_orders: claims.orders,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{issue_token, issue_token_from_issuer, TEST_JWT_SECRET};

    fn validator() -> JwtValidator {
        JwtValidator::new(TEST_JWT_SECRET, None, Duration::from_secs(0))
    }

    #[test]
    fn test_valid_token_maps_claims() {
        let token = issue_token(7, &["edit_orders"], &[42]);
        let user = validator().validate_token(&token).unwrap();

        assert_eq!(user.user_id, 7);
        assert!(user.is_order_editor());
        assert!(!user.is_store_manager());
        assert!(user.can_edit_order(42));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = issue_token(7, &[], &[]);
        let other = JwtValidator::new("another-secret", None, Duration::from_secs(0));

        assert!(matches!(
            other.validate_token(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_non_numeric_subject_is_rejected() {
        let token = crate::shared::test_helpers::issue_token_for_subject("customer-7");
        assert!(matches!(
            validator().validate_token(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_issuer_is_enforced_when_configured() {
        let token = issue_token(7, &[], &[]);
        let strict = JwtValidator::new(
            TEST_JWT_SECRET,
            Some("https://shop.example".to_string()),
            Duration::from_secs(0),
        );

        assert!(matches!(
            strict.validate_token(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_configured_issuer_accepts_matching_and_rejects_other() {
        let strict = JwtValidator::new(
            TEST_JWT_SECRET,
            Some("https://shop.example".to_string()),
            Duration::from_secs(0),
        );

        let ours = issue_token_from_issuer(7, "https://shop.example");
        assert_eq!(strict.validate_token(&ours).unwrap().user_id, 7);

        let theirs = issue_token_from_issuer(7, "https://elsewhere.example");
        assert!(matches!(
            strict.validate_token(&theirs),
            Err(AppError::Unauthorized(_))
        ));
    }
}
