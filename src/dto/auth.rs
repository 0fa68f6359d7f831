use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Scope;

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub scopes: Vec<Scope>,
}

/// Payload of an access token.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    /// Username of the token owner.
    pub sub: String,
    pub user_id: i32,
    pub scopes: Vec<Scope>,
    /// Expiry as a unix timestamp in seconds.
    pub exp: i64,
}
