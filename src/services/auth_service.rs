use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QuerySelect, Set, SqlErr, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;

use crate::{
    audit,
    dto::auth::{LoginRequest, LoginResponse, RegisterRequest},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    error::{AppError, AppResult, AuthError},
    middleware::auth::AuthUser,
    models::{Role, Scope, UserProfile},
    response::{ApiResponse, Meta},
    services::token_service::TokenService,
    state::AppState,
};

/// Every scope in `granted` must appear in `accepted`: a route lists the scopes
/// it is willing to serve and a token may carry nothing outside that list.
pub fn check_scopes(granted: &[Scope], accepted: &[Scope]) -> Result<(), AuthError> {
    if granted.iter().all(|scope| accepted.contains(scope)) {
        Ok(())
    } else {
        Err(AuthError::InsufficientScope)
    }
}

/// The scopes a freshly authenticated user is granted: exactly one, from the
/// user's effective role.
pub fn scopes_for(user: &UserModel) -> Result<Vec<Scope>, AuthError> {
    Role::from_flags(user.is_admin, user.is_supplier, user.is_customer)
        .map(|role| vec![role.scope()])
        .ok_or(AuthError::NoAssignedRole)
}

/// Verify `token`, confirm its subject still exists and check its scopes
/// against the route's `accepted` set.
pub async fn authorize<C: ConnectionTrait>(
    db: &C,
    tokens: &TokenService,
    token: &str,
    accepted: &[Scope],
) -> AppResult<AuthUser> {
    let claims = tokens.verify(token).map_err(|err| err.challenge(accepted))?;

    // Only existence is checked: tokens of deactivated users stay usable until they expire.
    let user = Users::find()
        .filter(UserCol::Username.eq(claims.sub.as_str()))
        .one(db)
        .await?;
    let user = match user {
        Some(u) if u.id == claims.user_id => u,
        _ => return Err(AuthError::CredentialsInvalid.challenge(accepted)),
    };

    check_scopes(&claims.scopes, accepted).map_err(|err| err.challenge(accepted))?;

    Ok(AuthUser {
        user_id: user.id,
        username: user.username,
        scopes: claims.scopes,
    })
}

/// Look up an active user by username and check the presented secret.
pub async fn authenticate<C: ConnectionTrait>(
    db: &C,
    username: &str,
    password: &str,
) -> AppResult<UserModel> {
    let user = Users::find()
        .filter(
            Condition::all()
                .add(UserCol::Username.eq(username))
                .add(UserCol::IsActive.eq(true)),
        )
        .one(db)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AuthError::UserNotFound.into()),
    };

    let hash = user.hashed_password.clone();
    let password = password.to_owned();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))??;

    if !matches {
        return Err(AuthError::BadCredentials.into());
    }
    Ok(user)
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<UserProfile>> {
    let RegisterRequest {
        first_name,
        last_name,
        username,
        email,
        password,
    } = payload;
    validate_registration(&username, &email, &password)?;

    let txn = state.orm.begin().await?;
    let taken = Users::find()
        .filter(
            Condition::any()
                .add(UserCol::Username.eq(username.as_str()))
                .add(UserCol::Email.eq(email.as_str())),
        )
        .one(&txn)
        .await?;
    if taken.is_some() {
        return Err(AppError::Conflict("Username or email is already taken".into()));
    }

    let password_hash = hash_password(&password)?;
    let user = UserActive {
        id: NotSet,
        first_name: Set(first_name),
        last_name: Set(last_name),
        username: Set(username),
        email: Set(email),
        hashed_password: Set(password_hash),
        is_active: Set(true),
        is_admin: Set(false),
        is_supplier: Set(false),
        is_customer: Set(false),
        created_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Username or email is already taken".into())
        }
        _ => err.into(),
    })?;
    txn.commit().await?;

    tracing::info!(user_id = user.id, "user registered");
    audit::record(
        &state.pool,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success("User created", user_profile(user), None))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { username, password } = payload;
    let user = authenticate(&state.orm, &username, &password).await?;
    let scopes = scopes_for(&user)?;

    let access_token = state.tokens.issue(&user.username, user.id, scopes.clone())?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            access_token,
            token_type: "bearer".into(),
            scopes,
        },
        Some(Meta::empty()),
    ))
}

pub async fn current_user(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserProfile>> {
    let found = Users::find_by_id(user.user_id).one(&state.orm).await?;
    match found {
        Some(u) => Ok(ApiResponse::success("Current user", user_profile(u), None)),
        None => Err(AppError::NotFound("User not found".into())),
    }
}

pub async fn grant_supplier(
    state: &AppState,
    admin: &AuthUser,
    user_id: i32,
) -> AppResult<ApiResponse<UserProfile>> {
    let txn = state.orm.begin().await?;
    let user = find_active_for_update(&txn, user_id).await?;
    if user.is_supplier {
        return Err(AppError::Conflict("User is already a supplier".into()));
    }

    let mut active: UserActive = user.into();
    active.is_supplier = Set(true);
    active.is_customer = Set(false);
    let user = active.update(&txn).await?;
    txn.commit().await?;

    role_changed(state, admin, &user, "supplier_grant").await;
    Ok(ApiResponse::success(
        "User is now supplier",
        user_profile(user),
        Some(Meta::empty()),
    ))
}

pub async fn revoke_supplier(
    state: &AppState,
    admin: &AuthUser,
    user_id: i32,
) -> AppResult<ApiResponse<UserProfile>> {
    let txn = state.orm.begin().await?;
    let user = find_active_for_update(&txn, user_id).await?;
    if !user.is_supplier {
        return Err(AppError::Conflict("User is not a supplier".into()));
    }

    // A former supplier falls back to the customer role.
    let mut active: UserActive = user.into();
    active.is_supplier = Set(false);
    active.is_customer = Set(true);
    let user = active.update(&txn).await?;
    txn.commit().await?;

    role_changed(state, admin, &user, "supplier_revoke").await;
    Ok(ApiResponse::success(
        "User is no longer supplier",
        user_profile(user),
        Some(Meta::empty()),
    ))
}

pub async fn grant_customer(
    state: &AppState,
    admin: &AuthUser,
    user_id: i32,
) -> AppResult<ApiResponse<UserProfile>> {
    let txn = state.orm.begin().await?;
    let user = find_active_for_update(&txn, user_id).await?;
    if Role::from_flags(user.is_admin, user.is_supplier, user.is_customer).is_some() {
        return Err(AppError::Conflict("User already has a role".into()));
    }

    let mut active: UserActive = user.into();
    active.is_customer = Set(true);
    let user = active.update(&txn).await?;
    txn.commit().await?;

    role_changed(state, admin, &user, "customer_grant").await;
    Ok(ApiResponse::success(
        "User is now customer",
        user_profile(user),
        Some(Meta::empty()),
    ))
}

/// Soft-delete a user. Tokens already issued to them remain valid until expiry.
pub async fn deactivate_user(
    state: &AppState,
    admin: &AuthUser,
    user_id: i32,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let txn = state.orm.begin().await?;
    let user = find_active_for_update(&txn, user_id).await?;

    let mut active: UserActive = user.into();
    active.is_active = Set(false);
    let user = active.update(&txn).await?;
    txn.commit().await?;

    role_changed(state, admin, &user, "user_deactivate").await;
    Ok(ApiResponse::done("User is deleted"))
}

async fn find_active_for_update<C: ConnectionTrait>(db: &C, user_id: i32) -> AppResult<UserModel> {
    let user = Users::find_by_id(user_id)
        .filter(UserCol::IsActive.eq(true))
        .lock(LockType::Update)
        .one(db)
        .await?;
    user.ok_or_else(|| AppError::NotFound("No active user found by id".into()))
}

async fn role_changed(state: &AppState, admin: &AuthUser, user: &UserModel, action: &str) {
    tracing::info!(admin_id = admin.user_id, user_id = user.id, action, "user updated");
    audit::record(
        &state.pool,
        Some(admin.user_id),
        action,
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;
}

fn validate_registration(username: &str, email: &str, password: &str) -> AppResult<()> {
    if username.trim().is_empty() {
        return Err(AppError::BadRequest("username must not be empty".into()));
    }
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email {
        return Err(AppError::BadRequest("email is not valid".into()));
    }
    if password.is_empty() {
        return Err(AppError::BadRequest("password must not be empty".into()));
    }
    Ok(())
}

pub fn user_profile(model: UserModel) -> UserProfile {
    UserProfile {
        role: Role::from_flags(model.is_admin, model.is_supplier, model.is_customer),
        id: model.id,
        first_name: model.first_name,
        last_name: model.last_name,
        username: model.username,
        email: model.email,
        is_active: model.is_active,
    }
}
