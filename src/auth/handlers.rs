use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, AuthStatusResponse, LoginRequest, MessageResponse, RegisterRequest},
        extractors::{MaybeToken, SESSION_TOKEN_KEY},
        services,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/status", get(status))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(v)| v).map_err(|e| {
        warn!(error = %e, "rejected request body");
        AppError::validation("Invalid JSON body")
    })
}

/// Bind a freshly issued token to the caller's session.
async fn remember_token(session: &Session, token: &str) -> Result<(), AppError> {
    session.cycle_id().await.context("cycle session id")?;
    session
        .insert(SESSION_TOKEN_KEY, token)
        .await
        .context("store session token")?;
    Ok(())
}

#[instrument(skip(state, session, payload))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let (user, token) =
        services::register(state.users.as_ref(), &state.keys, body(payload)?).await?;
    remember_token(&session, &token).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            user: user.into(),
            token,
        }),
    ))
}

#[instrument(skip(state, session, payload))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let (user, token) =
        services::login(state.users.as_ref(), &state.keys, body(payload)?).await?;
    remember_token(&session, &token).await?;

    Ok(Json(AuthResponse {
        message: "Login successful",
        user: user.into(),
        token,
    }))
}

#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Json<MessageResponse>, AppError> {
    session.flush().await.context("flush session")?;
    info!("session destroyed");
    Ok(Json(MessageResponse {
        message: "Logged out successfully",
    }))
}

#[instrument(skip(state, token))]
pub async fn status(
    State(state): State<AppState>,
    MaybeToken(token): MaybeToken,
) -> Json<AuthStatusResponse> {
    Json(services::auth_status(&state.keys, token.as_deref()))
}
