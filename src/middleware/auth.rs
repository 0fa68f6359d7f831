use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::header};

use crate::{
    error::{AppError, AuthError},
    models::Scope,
    services::auth_service,
    state::AppState,
};

/// Identity resolved from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub scopes: Vec<Scope>,
}

impl AuthUser {
    pub fn has_scope(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }
}

/// The set of scopes a route accepts.
pub trait AcceptedScopes: Send + Sync + 'static {
    const SCOPES: &'static [Scope];
}

pub struct AnyRole;
pub struct AdminOnly;
pub struct AdminOrSupplier;
pub struct CustomerOnly;

impl AcceptedScopes for AnyRole {
    const SCOPES: &'static [Scope] = &[Scope::Admin, Scope::Supplier, Scope::Customer];
}

impl AcceptedScopes for AdminOnly {
    const SCOPES: &'static [Scope] = &[Scope::Admin];
}

impl AcceptedScopes for AdminOrSupplier {
    const SCOPES: &'static [Scope] = &[Scope::Admin, Scope::Supplier];
}

impl AcceptedScopes for CustomerOnly {
    const SCOPES: &'static [Scope] = &[Scope::Customer];
}

/// Extractor that admits a request only when its bearer token carries scopes
/// drawn from `S::SCOPES`.
pub struct Authorized<S: AcceptedScopes> {
    pub user: AuthUser,
    _scopes: PhantomData<S>,
}

pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl<S: AcceptedScopes> FromRequestParts<AppState> for Authorized<S> {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AuthError::MissingToken.challenge(S::SCOPES))?;

        let token = auth_header
            .to_str()
            .ok()
            .and_then(bearer_token)
            .ok_or_else(|| AuthError::InvalidToken.challenge(S::SCOPES))?;

        let user = auth_service::authorize(&state.orm, &state.tokens, token, S::SCOPES).await?;

        Ok(Authorized {
            user,
            _scopes: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::bearer_token;

    #[test]
    fn parses_bearer_scheme() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer   abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }
}
