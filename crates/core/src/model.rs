use std::collections::{BTreeMap, btree_map};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::RecommendError;

/// Longest id the backing document store accepts.
const MAX_ID_LEN: usize = 36;

/// Check that an opaque id is well formed: 1-36 chars of `[A-Za-z0-9._-]`,
/// not starting with a special char.
pub fn validate_id(kind: &str, id: &str) -> Result<(), RecommendError> {
  let Some(first) = id.chars().next() else {
    return Err(RecommendError::validation(format!("{kind} id is empty")));
  };
  if id.len() > MAX_ID_LEN {
    return Err(RecommendError::validation(format!(
      "{kind} id {id:?} is longer than {MAX_ID_LEN} chars"
    )));
  }
  if !first.is_ascii_alphanumeric() {
    return Err(RecommendError::validation(format!(
      "{kind} id {id:?} must start with a letter or digit"
    )));
  }
  if !id
    .chars()
    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
  {
    return Err(RecommendError::validation(format!(
      "{kind} id {id:?} contains invalid characters"
    )));
  }
  Ok(())
}

// ──────────────────────────────────────────────────
// Ratings
// ──────────────────────────────────────────────────

/// Inclusive numeric range a rating must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RatingBound {
  pub min: f64,
  pub max: f64,
}

impl Default for RatingBound {
  fn default() -> Self {
    Self { min: 0.0, max: 5.0 }
  }
}

impl RatingBound {
  pub fn new(min: f64, max: f64) -> Result<Self, RecommendError> {
    if !min.is_finite() || !max.is_finite() || min > max {
      return Err(RecommendError::validation(format!(
        "rating bound [{min}, {max}] is not a finite, ordered range"
      )));
    }
    Ok(Self { min, max })
  }

  #[must_use]
  pub fn contains(&self, value: f64) -> bool {
    // NaN fails both comparisons
    value >= self.min && value <= self.max
  }

  pub fn check(&self, product_id: &str, value: f64) -> Result<f64, RecommendError> {
    if self.contains(value) {
      Ok(value)
    } else {
      Err(RecommendError::validation(format!(
        "rating {value} for product {product_id:?} is outside [{}, {}]",
        self.min, self.max
      )))
    }
  }
}

/// A user's ratings keyed by product id.
///
/// Every value is inside the `RatingBound` it was built against; there is no
/// unchecked constructor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(transparent)]
pub struct RatingVector(BTreeMap<String, f64>);

impl RatingVector {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Build from raw entries, rejecting the whole input on the first bad id or
  /// out-of-bound value.
  pub fn try_new<I, K>(entries: I, bound: &RatingBound) -> Result<Self, RecommendError>
  where
    I: IntoIterator<Item = (K, f64)>,
    K: Into<String>,
  {
    let mut vector = Self::new();
    for (product_id, value) in entries {
      vector.insert(product_id, value, bound)?;
    }
    Ok(vector)
  }

  /// Insert or replace one rating.
  pub fn insert(
    &mut self,
    product_id: impl Into<String>,
    value: f64,
    bound: &RatingBound,
  ) -> Result<Option<f64>, RecommendError> {
    let product_id = product_id.into();
    validate_id("product", &product_id)?;
    let value = bound.check(&product_id, value)?;
    Ok(self.0.insert(product_id, value))
  }

  /// Overwrite the keys present in `other`, keeping every other key.
  pub fn merge(&mut self, other: &Self) {
    for (product_id, value) in &other.0 {
      self.0.insert(product_id.clone(), *value);
    }
  }

  #[must_use]
  pub fn get(&self, product_id: &str) -> Option<f64> {
    self.0.get(product_id).copied()
  }

  #[must_use]
  pub fn contains(&self, product_id: &str) -> bool {
    self.0.contains_key(product_id)
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.0.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
    self.0.iter().map(|(k, v)| (k.as_str(), *v))
  }
}

impl IntoIterator for RatingVector {
  type Item = (String, f64);
  type IntoIter = btree_map::IntoIter<String, f64>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.into_iter()
  }
}

/// One user's rating vector as returned by a bulk fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRatings {
  pub user_id: String,
  pub ratings: RatingVector,
}

/// Result of a bulk read that skips records it could not load.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkFetch<T> {
  pub records: Vec<T>,
  /// Ids of records that failed to load or convert, in ascending order.
  pub skipped: Vec<String>,
}

impl<T> Default for BulkFetch<T> {
  fn default() -> Self {
    Self {
      records: Vec::new(),
      skipped: Vec::new(),
    }
  }
}

// ──────────────────────────────────────────────────
// Catalog
// ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Product {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub description: String,
}

impl From<corate_entities::product::Model> for Product {
  fn from(model: corate_entities::product::Model) -> Self {
    Self {
      id: model.id,
      title: model.title,
      description: model.description,
    }
  }
}

// ──────────────────────────────────────────────────
// Results
// ──────────────────────────────────────────────────

/// Similarity of one other user to the target user, in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SimilarityScore {
  pub user_id: String,
  pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RecommendationEntry {
  pub product_id: String,
  pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductRating {
  pub user_id: String,
  pub rating: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct Recommendations {
  /// Score descending, product id ascending on ties.
  pub entries: Vec<RecommendationEntry>,
  /// Users whose ratings could not be loaded and were left out.
  pub skipped_users: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct SimilarUsers {
  /// Score descending, user id ascending on ties.
  pub neighbors: Vec<SimilarityScore>,
  pub skipped_users: Vec<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ids_follow_document_store_rules() {
    assert!(validate_id("user", "user-42").is_ok());
    assert!(validate_id("user", "A.b_c-1").is_ok());
    assert!(validate_id("user", "").is_err());
    assert!(validate_id("user", "_hidden").is_err());
    assert!(validate_id("user", "has space").is_err());
    assert!(validate_id("user", &"x".repeat(37)).is_err());
    assert!(validate_id("user", &"x".repeat(36)).is_ok());
  }

  #[test]
  fn bound_rejects_nan_and_out_of_range() {
    let bound = RatingBound::default();
    assert!(bound.contains(0.0));
    assert!(bound.contains(5.0));
    assert!(!bound.contains(5.01));
    assert!(!bound.contains(-0.1));
    assert!(!bound.contains(f64::NAN));
    assert!(RatingBound::new(3.0, 1.0).is_err());
    assert!(RatingBound::new(0.0, f64::INFINITY).is_err());
  }

  #[test]
  fn try_new_rejects_whole_input_on_bad_value() {
    let bound = RatingBound::default();
    let err = RatingVector::try_new([("p1", 4.0), ("p2", 6.0)], &bound).unwrap_err();
    assert!(matches!(err, RecommendError::Validation(_)));
    assert!(err.to_string().contains("p2"));
  }

  #[test]
  fn merge_replaces_only_supplied_keys() {
    let bound = RatingBound::default();
    let mut base = RatingVector::try_new([("p1", 1.0), ("p2", 2.0)], &bound).unwrap();
    let patch = RatingVector::try_new([("p2", 5.0), ("p3", 3.0)], &bound).unwrap();
    base.merge(&patch);

    assert_eq!(base.get("p1"), Some(1.0));
    assert_eq!(base.get("p2"), Some(5.0));
    assert_eq!(base.get("p3"), Some(3.0));
    assert_eq!(base.len(), 3);
  }

  #[test]
  fn rating_vector_serializes_as_plain_map() {
    let bound = RatingBound::default();
    let v = RatingVector::try_new([("p1", 4.5)], &bound).unwrap();
    assert_eq!(serde_json::to_string(&v).unwrap(), r#"{"p1":4.5}"#);
  }
}
