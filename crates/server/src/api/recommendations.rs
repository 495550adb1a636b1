use axum::{
  Json,
  extract::{Path, State},
};
use corate_core::{Recommendations, SimilarUsers};
use corate_shared::AppError;

use crate::utils::{AppState, recommend_error};

/// Recommend products the user has not rated yet
#[utoipa::path(
  get,
  path = "/api/v0/users/{user_id}/recommendations",
  params(("user_id" = String, Path, description = "User to recommend for")),
  responses(
    (status = 200, description = "Products by predicted score, highest first", body = Recommendations),
    (status = 400, description = "Malformed user id"),
    (status = 503, description = "Rating store unavailable")
  )
)]
#[axum::debug_handler]
pub async fn get_recommendations(
  State(state): State<AppState>,
  Path(user_id): Path<String>,
) -> Result<Json<Recommendations>, AppError> {
  let scope = state.scope();
  let recommendations = state
    .service
    .get_recommendations(&user_id, scope.token())
    .await
    .map_err(recommend_error)?;

  Ok(Json(recommendations))
}

/// List other users by similarity to this one
#[utoipa::path(
  get,
  path = "/api/v0/users/{user_id}/similar",
  params(("user_id" = String, Path, description = "Target user")),
  responses(
    (status = 200, description = "Users by similarity, highest first", body = SimilarUsers),
    (status = 400, description = "Malformed user id"),
    (status = 503, description = "Rating store unavailable")
  )
)]
#[axum::debug_handler]
pub async fn get_similar_users(
  State(state): State<AppState>,
  Path(user_id): Path<String>,
) -> Result<Json<SimilarUsers>, AppError> {
  let scope = state.scope();
  let similar = state
    .service
    .get_similar_users(&user_id, scope.token())
    .await
    .map_err(recommend_error)?;

  Ok(Json(similar))
}
