use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::{
    config::TokenSettings,
    dto::auth::Claims,
    error::{AppError, AuthError},
    models::Scope,
};

/// Issues and verifies signed, time-limited access tokens.
///
/// Tokens are stateless: there is no session table and no revocation list, so a
/// token stays valid until `exp` even if its owner is deactivated meanwhile.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl TokenService {
    pub fn new(settings: &TokenSettings) -> Self {
        Self {
            encoding: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding: DecodingKey::from_secret(settings.secret.as_bytes()),
            algorithm: settings.algorithm,
            ttl: settings.ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token with the configured lifetime.
    pub fn issue(&self, subject: &str, user_id: i32, scopes: Vec<Scope>) -> Result<String, AppError> {
        self.issue_with_ttl(subject, user_id, scopes, self.ttl)
    }

    pub fn issue_with_ttl(
        &self,
        subject: &str,
        user_id: i32,
        scopes: Vec<Scope>,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let expiration = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

        let claims = Claims {
            sub: subject.to_string(),
            user_id,
            scopes,
            exp: expiration.timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
    }

    /// Check the signature and expiry of `token` and return its claims as encoded.
    ///
    /// A token is expired from the second named by `exp` onwards, so a token
    /// issued with a zero lifetime never verifies.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is checked below with an inclusive boundary and no leeway.
        validation.validate_exp = false;
        validation.leeway = 0;

        let decoded = decode::<Claims>(token, &self.decoding, &validation).map_err(|err| {
            tracing::debug!(error = %err, "token rejected");
            AuthError::InvalidToken
        })?;

        if Utc::now().timestamp() >= decoded.claims.exp {
            return Err(AuthError::Expired);
        }

        Ok(decoded.claims)
    }
}
