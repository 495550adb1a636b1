use chrono::Utc;
use corate_entities::{product, rating};
use sea_orm::{
  ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
  QueryOrder, Set, TransactionTrait, sea_query::OnConflict,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{ProductCatalog, RatingStore, group_rows, user_vector};
use crate::{BulkFetch, Product, ProductRating, RatingBound, RatingVector, StoreError, UserRatings};

/// Postgres caps a statement at 65535 bind parameters.
const MAX_BIND_PARAMS: usize = 65_535;
/// Columns bound per upserted `rating` row.
const RATING_COLUMNS: usize = 4;
/// Rows per `INSERT ... ON CONFLICT` statement.
const UPSERT_BATCH: usize = 4096;

const _: () = assert!(UPSERT_BATCH * RATING_COLUMNS <= MAX_BIND_PARAMS);

/// `(user_id, product_id, rating)` rows cut into statement-sized batches.
fn upsert_batches(rows: &[(String, String, f64)]) -> std::slice::Chunks<'_, (String, String, f64)> {
  rows.chunks(UPSERT_BATCH)
}

/// Postgres-backed ratings and catalog, one `rating` row per (user, product).
#[derive(Clone, Debug)]
pub struct PgStore {
  db: DatabaseConnection,
  bound: RatingBound,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewProduct {
  /// Generated (uuid v7) when omitted
  pub id: Option<String>,
  pub title: String,
  #[serde(default)]
  pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProductPatch {
  pub title: Option<String>,
  pub description: Option<String>,
}

impl PgStore {
  #[must_use]
  pub const fn new(db: DatabaseConnection, bound: RatingBound) -> Self {
    Self { db, bound }
  }

  pub async fn create_product(&self, new: NewProduct) -> Result<Product, StoreError> {
    let now = Utc::now().fixed_offset();
    let model = product::ActiveModel {
      id: Set(new.id.unwrap_or_else(|| Uuid::now_v7().to_string())),
      title: Set(new.title),
      description: Set(new.description),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(&self.db)
    .await?;

    Ok(model.into())
  }

  /// Returns `None` when the product does not exist.
  pub async fn update_product(
    &self,
    product_id: &str,
    patch: ProductPatch,
  ) -> Result<Option<Product>, StoreError> {
    let Some(model) = product::Entity::find_by_id(product_id.to_owned())
      .one(&self.db)
      .await?
    else {
      return Ok(None);
    };

    let mut active = model.into_active_model();
    if let Some(title) = patch.title {
      active.title = Set(title);
    }
    if let Some(description) = patch.description {
      active.description = Set(description);
    }
    active.updated_at = Set(Utc::now().fixed_offset());

    Ok(Some(active.update(&self.db).await?.into()))
  }

  /// Delete a product together with its ratings. Returns whether it existed.
  pub async fn delete_product(&self, product_id: &str) -> Result<bool, StoreError> {
    let txn = self.db.begin().await?;

    rating::Entity::delete_many()
      .filter(rating::Column::ProductId.eq(product_id))
      .exec(&txn)
      .await?;
    let deleted = product::Entity::delete_by_id(product_id.to_owned())
      .exec(&txn)
      .await?;

    txn.commit().await?;
    Ok(deleted.rows_affected > 0)
  }
}

impl PgStore {
  /// Upsert rating rows in one transaction, so either every row lands or none
  /// does, however many statements it takes.
  async fn upsert_ratings(&self, rows: &[(String, String, f64)]) -> Result<(), StoreError> {
    if rows.is_empty() {
      return Ok(());
    }

    let now = Utc::now().fixed_offset();
    let txn = self.db.begin().await?;
    for batch in upsert_batches(rows) {
      let models = batch
        .iter()
        .map(|(user_id, product_id, value)| rating::ActiveModel {
          user_id: Set(user_id.clone()),
          product_id: Set(product_id.clone()),
          rating: Set(*value),
          updated_at: Set(now),
        });

      rating::Entity::insert_many(models)
        .on_conflict(
          OnConflict::columns([rating::Column::UserId, rating::Column::ProductId])
            .update_columns([rating::Column::Rating, rating::Column::UpdatedAt])
            .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;
    }
    txn.commit().await?;

    tracing::debug!(rows = rows.len(), "upserted ratings");
    Ok(())
  }
}

impl RatingStore for PgStore {
  async fn get_user_ratings(&self, user_id: &str) -> Result<RatingVector, StoreError> {
    let rows = rating::Entity::find()
      .filter(rating::Column::UserId.eq(user_id))
      .all(&self.db)
      .await?;

    user_vector(
      user_id,
      rows.into_iter().map(|row| (row.product_id, row.rating)),
      &self.bound,
    )
  }

  async fn list_all_ratings(&self) -> Result<BulkFetch<UserRatings>, StoreError> {
    let rows = rating::Entity::find()
      .order_by_asc(rating::Column::UserId)
      .order_by_asc(rating::Column::ProductId)
      .all(&self.db)
      .await?;

    Ok(group_rows(
      rows
        .into_iter()
        .map(|row| (row.user_id, row.product_id, row.rating)),
      &self.bound,
    ))
  }

  async fn update_user_ratings(&self, user_id: &str, partial: &RatingVector) -> Result<(), StoreError> {
    let rows: Vec<_> = partial
      .iter()
      .map(|(product_id, value)| (user_id.to_owned(), product_id.to_owned(), value))
      .collect();
    self.upsert_ratings(&rows).await
  }

  async fn delete_user_ratings(&self, user_id: &str) -> Result<(), StoreError> {
    rating::Entity::delete_many()
      .filter(rating::Column::UserId.eq(user_id))
      .exec(&self.db)
      .await?;
    Ok(())
  }

  async fn update_product_ratings(
    &self,
    product_id: &str,
    ratings: &[ProductRating],
  ) -> Result<(), StoreError> {
    let rows: Vec<_> = ratings
      .iter()
      .map(|r| (r.user_id.clone(), product_id.to_owned(), r.rating))
      .collect();
    self.upsert_ratings(&rows).await
  }

  async fn delete_product_ratings(&self, product_id: &str) -> Result<(), StoreError> {
    let deleted = rating::Entity::delete_many()
      .filter(rating::Column::ProductId.eq(product_id))
      .exec(&self.db)
      .await?;
    tracing::debug!(product_id, rows = deleted.rows_affected, "deleted product ratings");
    Ok(())
  }
}

impl ProductCatalog for PgStore {
  async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
    let models = product::Entity::find()
      .order_by_asc(product::Column::Id)
      .all(&self.db)
      .await?;
    Ok(models.into_iter().map(Product::from).collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn large_updates_are_split_under_the_bind_limit() {
    let rows: Vec<_> = (0..20_000)
      .map(|i| ("u1".to_owned(), format!("p{i}"), 1.0))
      .collect();

    let batches: Vec<_> = upsert_batches(&rows).collect();
    assert_eq!(batches.len(), 5);
    assert!(
      batches
        .iter()
        .all(|b| !b.is_empty() && b.len() * RATING_COLUMNS <= MAX_BIND_PARAMS)
    );
    assert_eq!(batches.iter().map(|b| b.len()).sum::<usize>(), rows.len());
  }
}
