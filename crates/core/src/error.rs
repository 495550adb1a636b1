use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a `RatingStore` or `ProductCatalog` adapter.
///
/// Unknown users and products are not errors at this level; adapters answer
/// with empty data instead.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("store unavailable: {0}")]
  Unavailable(#[source] BoxError),

  /// A multi-key write failed after some keys may already have been applied.
  /// `id` is the user or product the write was for.
  #[error("write for {id} may have been partially applied: {source}")]
  PartialWrite {
    id: String,
    #[source]
    source: BoxError,
  },

  /// A stored record holds values the rating bound rejects.
  #[error("stored ratings of user {user_id} are corrupt: {reason}")]
  Corrupt { user_id: String, reason: String },
}

impl StoreError {
  pub fn unavailable<E: Into<BoxError>>(err: E) -> Self {
    Self::Unavailable(err.into())
  }
}

impl From<sea_orm::DbErr> for StoreError {
  fn from(err: sea_orm::DbErr) -> Self {
    Self::Unavailable(Box::new(err))
  }
}

#[derive(Debug, Error)]
pub enum RecommendError {
  /// Rejected before any store call; nothing was applied.
  #[error("invalid input: {0}")]
  Validation(String),

  #[error(transparent)]
  StoreUnavailable(StoreError),

  #[error(transparent)]
  PartialWrite(StoreError),

  /// The requested user's own stored record could not be read back.
  #[error(transparent)]
  CorruptRecord(StoreError),

  #[error("request cancelled")]
  Cancelled,

  #[error("similarity worker failed: {0}")]
  Worker(#[from] tokio::task::JoinError),
}

impl RecommendError {
  pub fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }
}

impl From<StoreError> for RecommendError {
  fn from(err: StoreError) -> Self {
    match err {
      StoreError::Unavailable(_) => Self::StoreUnavailable(err),
      StoreError::PartialWrite { .. } => Self::PartialWrite(err),
      StoreError::Corrupt { .. } => Self::CorruptRecord(err),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn store_errors_map_onto_service_taxonomy() {
    let err: RecommendError = StoreError::unavailable("connection refused").into();
    assert!(matches!(err, RecommendError::StoreUnavailable(_)));
    assert_eq!(err.to_string(), "store unavailable: connection refused");

    let err: RecommendError = StoreError::PartialWrite {
      id: "u1".to_owned(),
      source: "timeout".into(),
    }
    .into();
    assert!(matches!(err, RecommendError::PartialWrite(_)));

    let err: RecommendError = StoreError::Corrupt {
      user_id: "u1".to_owned(),
      reason: "rating 9 is outside [0, 5]".to_owned(),
    }
    .into();
    assert!(matches!(err, RecommendError::CorruptRecord(_)));
  }
}
