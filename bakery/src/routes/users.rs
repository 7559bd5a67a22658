use axum::{
    Router,
    extract::State,
    routing::post,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, IntoActiveModel};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::ApiError;
use crate::auth::CurrentUser;
use crate::core::{CRUDResource, crud_router};
use crate::entities::user::{self, User, UserOperations, generate_api_token};
use crate::extract::{Json, Path};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    crud_router::<UserOperations>().route("/{id}/token", post(rotate_token))
}

/// A freshly issued token. It is shown once; the previous one stops working.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct IssuedToken {
    pub user_id: Uuid,
    pub api_token: String,
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/token",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "New token issued", body = IssuedToken),
        (status = 404, description = "Unknown user")
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn rotate_token(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<IssuedToken>, ApiError> {
    let existing = user::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(ApiError::database)?
        .ok_or_else(|| ApiError::not_found(User::RESOURCE_LABEL, Some(id.to_string())))?;

    let token = generate_api_token();
    let mut active = existing.into_active_model();
    active.api_token = Set(token.clone());
    active.updated_at = Set(Utc::now());
    active.update(&state.db).await.map_err(ApiError::from)?;

    tracing::info!(user = %id, by = %caller.id, "API token rotated");
    Ok(Json(IssuedToken {
        user_id: id,
        api_token: token,
    }))
}
