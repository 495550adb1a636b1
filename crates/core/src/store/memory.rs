use std::{collections::BTreeMap, sync::Arc};

use tokio::sync::RwLock;

use super::{ProductCatalog, RatingStore, group_rows, user_vector};
use crate::{BulkFetch, Product, ProductRating, RatingBound, RatingVector, StoreError, UserRatings};

#[derive(Debug, Default)]
struct Inner {
  /// Raw values as written, so corrupt records can be modelled.
  ratings: BTreeMap<String, BTreeMap<String, f64>>,
  products: BTreeMap<String, Product>,
  unavailable: bool,
  fail_writes_after: Option<usize>,
}

/// In-process store backed by ordered maps.
///
/// Also carries a few switches for driving the failure paths of callers.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
  inner: Arc<RwLock<Inner>>,
  bound: RatingBound,
}

impl MemoryStore {
  #[must_use]
  pub fn new(bound: RatingBound) -> Self {
    Self {
      inner: Arc::default(),
      bound,
    }
  }

  pub async fn put_product(&self, product: Product) {
    self
      .inner
      .write()
      .await
      .products
      .insert(product.id.clone(), product);
  }

  /// Store a value with no validation, the way a corrupted record would look.
  pub async fn put_raw_rating(&self, user_id: &str, product_id: &str, value: f64) {
    self
      .inner
      .write()
      .await
      .ratings
      .entry(user_id.to_owned())
      .or_default()
      .insert(product_id.to_owned(), value);
  }

  pub async fn set_unavailable(&self, unavailable: bool) {
    self.inner.write().await.unavailable = unavailable;
  }

  /// The next rating write applies `applied` keys and then fails.
  pub async fn fail_next_write_after(&self, applied: usize) {
    self.inner.write().await.fail_writes_after = Some(applied);
  }
}

fn unavailable() -> StoreError {
  StoreError::unavailable("memory store is marked unavailable")
}

fn interrupted(id: &str, applied: usize) -> StoreError {
  StoreError::PartialWrite {
    id: id.to_owned(),
    source: format!("write interrupted after {applied} keys").into(),
  }
}

impl RatingStore for MemoryStore {
  async fn get_user_ratings(&self, user_id: &str) -> Result<RatingVector, StoreError> {
    let inner = self.inner.read().await;
    if inner.unavailable {
      return Err(unavailable());
    }

    let rows = inner
      .ratings
      .get(user_id)
      .into_iter()
      .flatten()
      .map(|(product_id, value)| (product_id.clone(), *value));
    user_vector(user_id, rows, &self.bound)
  }

  async fn list_all_ratings(&self) -> Result<BulkFetch<UserRatings>, StoreError> {
    let inner = self.inner.read().await;
    if inner.unavailable {
      return Err(unavailable());
    }

    let rows = inner.ratings.iter().flat_map(|(user_id, ratings)| {
      ratings
        .iter()
        .map(move |(product_id, value)| (user_id.clone(), product_id.clone(), *value))
    });
    Ok(group_rows(rows, &self.bound))
  }

  async fn update_user_ratings(&self, user_id: &str, partial: &RatingVector) -> Result<(), StoreError> {
    let mut inner = self.inner.write().await;
    if inner.unavailable {
      return Err(unavailable());
    }

    let fail_after = inner.fail_writes_after.take();
    let stored = inner.ratings.entry(user_id.to_owned()).or_default();
    for (applied, (product_id, value)) in partial.iter().enumerate() {
      if fail_after == Some(applied) {
        return Err(interrupted(user_id, applied));
      }
      stored.insert(product_id.to_owned(), value);
    }
    Ok(())
  }

  async fn delete_user_ratings(&self, user_id: &str) -> Result<(), StoreError> {
    let mut inner = self.inner.write().await;
    if inner.unavailable {
      return Err(unavailable());
    }
    inner.ratings.remove(user_id);
    Ok(())
  }

  async fn update_product_ratings(
    &self,
    product_id: &str,
    ratings: &[ProductRating],
  ) -> Result<(), StoreError> {
    let mut inner = self.inner.write().await;
    if inner.unavailable {
      return Err(unavailable());
    }

    let fail_after = inner.fail_writes_after.take();
    for (applied, rating) in ratings.iter().enumerate() {
      if fail_after == Some(applied) {
        return Err(interrupted(product_id, applied));
      }
      inner
        .ratings
        .entry(rating.user_id.clone())
        .or_default()
        .insert(product_id.to_owned(), rating.rating);
    }
    Ok(())
  }

  async fn delete_product_ratings(&self, product_id: &str) -> Result<(), StoreError> {
    let mut inner = self.inner.write().await;
    if inner.unavailable {
      return Err(unavailable());
    }
    for ratings in inner.ratings.values_mut() {
      ratings.remove(product_id);
    }
    inner.ratings.retain(|_, ratings| !ratings.is_empty());
    Ok(())
  }
}

impl ProductCatalog for MemoryStore {
  async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
    let inner = self.inner.read().await;
    if inner.unavailable {
      return Err(unavailable());
    }
    Ok(inner.products.values().cloned().collect())
  }
}
