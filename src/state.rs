use std::sync::Arc;

use crate::{
    db::{DbPool, OrmConn},
    services::token_service::TokenService,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub tokens: Arc<TokenService>,
}
