use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use corate_core::{
  Product, ProductCatalog,
  store::{NewProduct, ProductPatch},
  validate_id,
};
use corate_shared::AppError;

use crate::utils::{AppState, recommend_error};

fn store_error(err: corate_core::StoreError) -> AppError {
  recommend_error(err.into())
}

fn not_found(product_id: &str) -> AppError {
  AppError::with_status(
    StatusCode::NOT_FOUND,
    anyhow::anyhow!("product {product_id:?} not found"),
  )
}

/// Add a product to the catalog
#[utoipa::path(
  post,
  path = "/api/v0/products",
  request_body = NewProduct,
  responses(
    (status = 201, description = "Product created", body = Product),
    (status = 400, description = "Malformed id or empty title"),
    (status = 408, description = "Request deadline passed")
  )
)]
#[axum::debug_handler]
pub async fn create_product(
  State(state): State<AppState>,
  Json(payload): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), AppError> {
  if payload.title.trim().is_empty() {
    return Err(AppError::bad_request("Product title cannot be empty"));
  }
  if let Some(id) = &payload.id {
    validate_id("product", id).map_err(recommend_error)?;
  }

  let scope = state.scope();
  let product = scope
    .run(state.store.create_product(payload))
    .await?
    .map_err(store_error)?;
  tracing::info!(product_id = %product.id, "created product");

  Ok((StatusCode::CREATED, Json(product)))
}

/// List the catalog
#[utoipa::path(
  get,
  path = "/api/v0/products",
  responses(
    (status = 200, description = "All products by id", body = Vec<Product>)
  )
)]
#[axum::debug_handler]
pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
  let scope = state.scope();
  let products = scope
    .run(state.store.list_products())
    .await?
    .map_err(store_error)?;
  Ok(Json(products))
}

/// Change a product's title or description
#[utoipa::path(
  patch,
  path = "/api/v0/products/{product_id}",
  params(("product_id" = String, Path, description = "Product to change")),
  request_body = ProductPatch,
  responses(
    (status = 200, description = "Updated product", body = Product),
    (status = 400, description = "Malformed id or empty title"),
    (status = 404, description = "No such product")
  )
)]
#[axum::debug_handler]
pub async fn update_product(
  State(state): State<AppState>,
  Path(product_id): Path<String>,
  Json(patch): Json<ProductPatch>,
) -> Result<Json<Product>, AppError> {
  validate_id("product", &product_id).map_err(recommend_error)?;
  if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
    return Err(AppError::bad_request("Product title cannot be empty"));
  }

  let scope = state.scope();
  scope
    .run(state.store.update_product(&product_id, patch))
    .await?
    .map_err(store_error)?
    .map(Json)
    .ok_or_else(|| not_found(&product_id))
}

/// Remove a product and all of its ratings
#[utoipa::path(
  delete,
  path = "/api/v0/products/{product_id}",
  params(("product_id" = String, Path, description = "Product to remove")),
  responses(
    (status = 204, description = "Product removed"),
    (status = 404, description = "No such product")
  )
)]
#[axum::debug_handler]
pub async fn delete_product(
  State(state): State<AppState>,
  Path(product_id): Path<String>,
) -> Result<StatusCode, AppError> {
  validate_id("product", &product_id).map_err(recommend_error)?;

  let scope = state.scope();
  if scope
    .run(state.store.delete_product(&product_id))
    .await?
    .map_err(store_error)?
  {
    tracing::info!(product_id = %product_id, "deleted product");
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(not_found(&product_id))
  }
}
