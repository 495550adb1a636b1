//! Storage seams consumed by the engine.
//!
//! Adapters convert and validate at this boundary: everything handed to the
//! engine is a well-formed `RatingVector` or `Product`. Unknown ids read as
//! empty data.

use std::{collections::BTreeMap, future::Future};

use crate::{
  BulkFetch, Product, ProductRating, RatingBound, RatingVector, RecommendError, StoreError,
  UserRatings, validate_id,
};

mod memory;
pub use memory::MemoryStore;

mod postgres;
pub use postgres::{NewProduct, PgStore, ProductPatch};

pub trait RatingStore: Send + Sync {
  /// Ratings of one user; an unknown user yields an empty vector. A stored
  /// value outside the bound fails the read with `StoreError::Corrupt`.
  fn get_user_ratings(
    &self,
    user_id: &str,
  ) -> impl Future<Output = Result<RatingVector, StoreError>> + Send;

  /// Every user's ratings, ordered by user id. Users whose records fail to
  /// load are listed in `skipped` instead of failing the call.
  fn list_all_ratings(
    &self,
  ) -> impl Future<Output = Result<BulkFetch<UserRatings>, StoreError>> + Send;

  /// Merge `partial` into the user's ratings, leaving unmentioned keys alone.
  fn update_user_ratings(
    &self,
    user_id: &str,
    partial: &RatingVector,
  ) -> impl Future<Output = Result<(), StoreError>> + Send;

  /// Remove every rating of the user. Unknown users are a no-op.
  fn delete_user_ratings(&self, user_id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

  /// Set each listed user's rating of one product, leaving their other
  /// ratings alone.
  fn update_product_ratings(
    &self,
    product_id: &str,
    ratings: &[ProductRating],
  ) -> impl Future<Output = Result<(), StoreError>> + Send;

  /// Remove every rating of the product. The catalog entry is untouched.
  fn delete_product_ratings(
    &self,
    product_id: &str,
  ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

pub trait ProductCatalog: Send + Sync {
  fn list_products(&self) -> impl Future<Output = Result<Vec<Product>, StoreError>> + Send;
}

/// Build one user's vector from stored `(product_id, rating)` rows, refusing
/// it whole when any row is malformed.
pub(crate) fn user_vector<I>(
  user_id: &str,
  rows: I,
  bound: &RatingBound,
) -> Result<RatingVector, StoreError>
where
  I: IntoIterator<Item = (String, f64)>,
{
  RatingVector::try_new(rows, bound).map_err(|err| StoreError::Corrupt {
    user_id: user_id.to_owned(),
    reason: match err {
      RecommendError::Validation(msg) => msg,
      other => other.to_string(),
    },
  })
}

/// Group `(user_id, product_id, rating)` rows into vectors ordered by user
/// id. A user with a malformed id, or any row the bound rejects, is skipped
/// whole.
pub(crate) fn group_rows<I>(rows: I, bound: &RatingBound) -> BulkFetch<UserRatings>
where
  I: IntoIterator<Item = (String, String, f64)>,
{
  let mut by_user: BTreeMap<String, Vec<(String, f64)>> = BTreeMap::new();
  for (user_id, product_id, rating) in rows {
    by_user.entry(user_id).or_default().push((product_id, rating));
  }

  let mut fetch = BulkFetch::default();
  for (user_id, entries) in by_user {
    let converted = validate_id("user", &user_id).and_then(|()| RatingVector::try_new(entries, bound));
    match converted {
      Ok(ratings) => fetch.records.push(UserRatings { user_id, ratings }),
      Err(_) => fetch.skipped.push(user_id),
    }
  }
  fetch
}
