//! Account registration and session login.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use techmart_core::{Email, UserId, UserRole};

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, auth_rate_limiter, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::models::user::User;
use crate::services::AuthService;
use crate::services::auth::Registration;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route_layer(auth_rate_limiter())
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub phone: Option<String>,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: UserId,
    pub full_name: String,
    pub email: Email,
    pub role: UserRole,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: UserId,
    pub full_name: String,
    pub role: UserRole,
}

fn session_error(err: tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {err}"))
}

#[instrument(skip_all)]
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let user = AuthService::new(state.pool())
        .register(Registration {
            full_name: &body.full_name,
            email: &body.email,
            phone: body.phone.as_deref(),
            password: &body.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            full_name: user.full_name,
            email: user.email,
            role: user.role,
            message: "Registration successful",
        }),
    ))
}

#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await?;

    set_current_user(&session, &CurrentUser::from(&user))
        .await
        .map_err(session_error)?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        user_id: user.id,
        full_name: user.full_name,
        role: user.role,
    }))
}

async fn logout(session: Session) -> Result<Json<serde_json::Value>> {
    clear_current_user(&session).await.map_err(session_error)?;
    clear_sentry_user();
    Ok(Json(serde_json::json!({ "message": "Logged out" })))
}

/// Fresh profile of the logged-in user.
async fn me(State(state): State<AppState>, RequireAuth(current): RequireAuth) -> Result<Json<User>> {
    let user = AuthService::new(state.pool()).get_user(current.id).await?;
    Ok(Json(user))
}
