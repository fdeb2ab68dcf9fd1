use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{dto::PublicUser, jwt::AuthUser, repo::User},
    error::ApiError,
    products::repo::Product,
    response::Envelope,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/stats", get(stats))
}

#[derive(Debug, Serialize)]
pub struct UsersPayload {
    pub users: Vec<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct StatsPayload {
    pub stats: Stats,
}

#[derive(Debug, Serialize)]
pub struct Stats {
    pub users: i64,
    pub products: i64,
}

/// The caller's stored role decides access; the token alone does not.
async fn require_admin(state: &AppState, user_id: Uuid) -> Result<(), ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(|e| ApiError::internal("Server error", e))?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    if user.role != "admin" {
        warn!(user_id = %user_id, role = %user.role, "admin route denied");
        return Err(ApiError::Forbidden("Admin access required".into()));
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Envelope<UsersPayload>>, ApiError> {
    require_admin(&state, user_id).await?;

    let users = User::list(&state.db)
        .await
        .map_err(|e| ApiError::internal("Server error", e))?;
    Ok(Json(Envelope::ok(UsersPayload {
        users: users.into_iter().map(PublicUser::from).collect(),
    })))
}

#[instrument(skip(state))]
pub async fn stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Envelope<StatsPayload>>, ApiError> {
    require_admin(&state, user_id).await?;

    let users = User::count(&state.db)
        .await
        .map_err(|e| ApiError::internal("Server error", e))?;
    let products = Product::count(&state.db)
        .await
        .map_err(|e| ApiError::internal("Server error", e))?;
    Ok(Json(Envelope::ok(StatsPayload {
        stats: Stats { users, products },
    })))
}
