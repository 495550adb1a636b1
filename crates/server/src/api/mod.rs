use axum::{
  Json, Router,
  routing::{get, patch, put},
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::utils::AppState;

mod products;
mod ratings;
mod recommendations;

pub use ratings::RatingUpdate;

#[derive(OpenApi)]
#[openapi(
  info(
    title = "Corate API",
    version = "0.0.1",
    description = "Neighbor-based product recommendations from sparse user ratings"
  ),
  paths(
    recommendations::get_recommendations,
    recommendations::get_similar_users,
    ratings::update_user_ratings,
    ratings::delete_user_ratings,
    ratings::get_product_ratings,
    ratings::update_product_ratings,
    ratings::delete_product_ratings,
    products::create_product,
    products::list_products,
    products::update_product,
    products::delete_product,
  ),
  components(schemas(
    RatingUpdate,
    corate_core::Product,
    corate_core::ProductRating,
    corate_core::Recommendations,
    corate_core::RecommendationEntry,
    corate_core::SimilarUsers,
    corate_core::SimilarityScore,
    corate_core::store::NewProduct,
    corate_core::store::ProductPatch,
  ))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
  Json(ApiDoc::openapi())
}

pub fn app() -> Router<AppState> {
  Router::new()
    .route(
      "/api/v0/users/{user_id}/recommendations",
      get(recommendations::get_recommendations),
    )
    .route(
      "/api/v0/users/{user_id}/similar",
      get(recommendations::get_similar_users),
    )
    .route(
      "/api/v0/users/{user_id}/ratings",
      put(ratings::update_user_ratings).delete(ratings::delete_user_ratings),
    )
    .route(
      "/api/v0/products/{product_id}/ratings",
      get(ratings::get_product_ratings)
        .put(ratings::update_product_ratings)
        .delete(ratings::delete_product_ratings),
    )
    .route(
      "/api/v0/products",
      get(products::list_products).post(products::create_product),
    )
    .route(
      "/api/v0/products/{product_id}",
      patch(products::update_product).delete(products::delete_product),
    )
    .route("/openapi.json", get(openapi_json))
    .merge(Scalar::with_url("/openapi/", ApiDoc::openapi()))
}
