use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use corate_core::ProductRating;
use corate_shared::AppError;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::utils::{AppState, recommend_error};

/// Ratings to merge, keyed by product id. Products not listed keep their
/// current rating.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct RatingUpdate(pub BTreeMap<String, f64>);

/// Merge ratings into a user's existing ratings
#[utoipa::path(
  put,
  path = "/api/v0/users/{user_id}/ratings",
  params(("user_id" = String, Path, description = "User whose ratings change")),
  request_body = RatingUpdate,
  responses(
    (status = 204, description = "Ratings merged"),
    (status = 400, description = "Malformed id or rating outside the allowed range; nothing applied"),
    (status = 500, description = "Write may have been partially applied")
  )
)]
#[axum::debug_handler]
pub async fn update_user_ratings(
  State(state): State<AppState>,
  Path(user_id): Path<String>,
  Json(RatingUpdate(ratings)): Json<RatingUpdate>,
) -> Result<StatusCode, AppError> {
  let scope = state.scope();
  state
    .service
    .update_user_ratings(&user_id, ratings, scope.token())
    .await
    .map_err(recommend_error)?;

  Ok(StatusCode::NO_CONTENT)
}

/// Delete every rating of a user
#[utoipa::path(
  delete,
  path = "/api/v0/users/{user_id}/ratings",
  params(("user_id" = String, Path, description = "User whose ratings are removed")),
  responses(
    (status = 204, description = "Ratings deleted, or there were none"),
    (status = 400, description = "Malformed user id")
  )
)]
#[axum::debug_handler]
pub async fn delete_user_ratings(
  State(state): State<AppState>,
  Path(user_id): Path<String>,
) -> Result<StatusCode, AppError> {
  let scope = state.scope();
  state
    .service
    .delete_user_ratings(&user_id, scope.token())
    .await
    .map_err(recommend_error)?;

  Ok(StatusCode::NO_CONTENT)
}

/// List every rating given to a product
#[utoipa::path(
  get,
  path = "/api/v0/products/{product_id}/ratings",
  params(("product_id" = String, Path, description = "Rated product")),
  responses(
    (status = 200, description = "Ratings by user id", body = Vec<ProductRating>),
    (status = 400, description = "Malformed product id")
  )
)]
#[axum::debug_handler]
pub async fn get_product_ratings(
  State(state): State<AppState>,
  Path(product_id): Path<String>,
) -> Result<Json<Vec<ProductRating>>, AppError> {
  let scope = state.scope();
  let ratings = state
    .service
    .get_product_ratings(&product_id, scope.token())
    .await
    .map_err(recommend_error)?;

  Ok(Json(ratings))
}

/// Set this product's rating for each listed user
#[utoipa::path(
  put,
  path = "/api/v0/products/{product_id}/ratings",
  params(("product_id" = String, Path, description = "Rated product")),
  request_body = Vec<ProductRating>,
  responses(
    (status = 204, description = "Ratings set; other products untouched"),
    (status = 400, description = "Malformed id or rating outside the allowed range; nothing applied"),
    (status = 500, description = "Write may have been partially applied")
  )
)]
#[axum::debug_handler]
pub async fn update_product_ratings(
  State(state): State<AppState>,
  Path(product_id): Path<String>,
  Json(ratings): Json<Vec<ProductRating>>,
) -> Result<StatusCode, AppError> {
  let scope = state.scope();
  state
    .service
    .update_product_ratings(
      &product_id,
      ratings.into_iter().map(|r| (r.user_id, r.rating)),
      scope.token(),
    )
    .await
    .map_err(recommend_error)?;

  Ok(StatusCode::NO_CONTENT)
}

/// Delete every rating of a product, keeping the product
#[utoipa::path(
  delete,
  path = "/api/v0/products/{product_id}/ratings",
  params(("product_id" = String, Path, description = "Product whose ratings are removed")),
  responses(
    (status = 204, description = "Ratings deleted, or there were none"),
    (status = 400, description = "Malformed product id")
  )
)]
#[axum::debug_handler]
pub async fn delete_product_ratings(
  State(state): State<AppState>,
  Path(product_id): Path<String>,
) -> Result<StatusCode, AppError> {
  let scope = state.scope();
  state
    .service
    .delete_product_ratings(&product_id, scope.token())
    .await
    .map_err(recommend_error)?;

  Ok(StatusCode::NO_CONTENT)
}
