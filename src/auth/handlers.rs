use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthResponse, PublicUser, RefreshRequest},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
        repo::{User, UserWriteError},
    },
    state::AppState,
    validation::{LoginForm, ProfileForm},
};

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).put(update_me))
}

fn internal(context: &str, e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "{context} failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
}

fn respond(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let tokens = JwtKeys::from_ref(state)
        .issue_pair(user.id)
        .map_err(|e| internal("jwt sign", e))?;
    Ok(Json(AuthResponse {
        tokens,
        user: user.into(),
    }))
}

/// A concurrent registration can still take the name between the check and the write.
fn write_failed(e: UserWriteError) -> (StatusCode, String) {
    match e {
        UserWriteError::UsernameTaken => {
            warn!("username taken during write");
            (StatusCode::CONFLICT, "Username already registered".into())
        }
        UserWriteError::Db(e) => internal("user write", e.into()),
    }
}

/// 409 when `username` belongs to someone other than `current`.
async fn ensure_username_free(
    state: &AppState,
    username: &str,
    current: Option<Uuid>,
) -> Result<(), (StatusCode, String)> {
    match User::find_by_username(&state.db, username).await {
        Ok(Some(existing)) if Some(existing.id) != current => {
            warn!(%username, "username already registered");
            Err((StatusCode::CONFLICT, "Username already registered".into()))
        }
        Ok(_) => Ok(()),
        Err(e) => Err(internal("find_by_username", e)),
    }
}

#[instrument(skip(state, form))]
pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<ProfileForm>,
) -> ApiResult<AuthResponse> {
    let valid = form.validate().map_err(|e| {
        warn!(field = e.field, "invalid registration");
        e
    })?;
    ensure_username_free(&state, &valid.username, None).await?;

    let hash = hash_password(valid.password.clone())
        .await
        .map_err(|e| internal("hash_password", e))?;
    let user = User::create(&state.db, &valid, &hash)
        .await
        .map_err(write_failed)?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    respond(&state, user)
}

#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    Json(form): Json<LoginForm>,
) -> ApiResult<AuthResponse> {
    let form = form.validate()?;

    let user = match User::find_by_username(&state.db, &form.username).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(username = %form.username, "login unknown username");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => return Err(internal("find_by_username", e)),
    };

    let ok = verify_password(form.password, user.password_hash.clone())
        .await
        .map_err(|e| internal("verify_password", e))?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    info!(user_id = %user.id, "user logged in");
    respond(&state, user)
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<AuthResponse> {
    let claims = JwtKeys::from_ref(&state)
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(|e| internal("find_by_id", e))?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;
    respond(&state, user)
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<PublicUser> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(|e| internal("find_by_id", e))?
        .ok_or_else(|| {
            error!(%user_id, "user not found");
            (StatusCode::UNAUTHORIZED, "User not found".to_string())
        })?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, form))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(form): Json<ProfileForm>,
) -> ApiResult<PublicUser> {
    let valid = form.validate()?;
    ensure_username_free(&state, &valid.username, Some(user_id)).await?;

    let hash = hash_password(valid.password.clone())
        .await
        .map_err(|e| internal("hash_password", e))?;
    let user = User::update(&state.db, user_id, &valid, &hash)
        .await
        .map_err(write_failed)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    info!(%user_id, "profile updated");
    Ok(Json(user.into()))
}
