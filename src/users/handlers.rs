use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{auth::AuthUser, error::AppError, state::AppState};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/api/users/profile", get(get_profile))
}

#[derive(Debug, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: Profile,
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = state.users.find_by_id(auth.user_id).await?.ok_or_else(|| {
        warn!(user_id = %auth.user_id, email = %auth.email, "profile for unknown user");
        AppError::not_found("User not found")
    })?;

    Ok(Json(ProfileResponse {
        user: Profile {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        },
    }))
}
