use std::{future::Future, time::Duration};

use axum::http::StatusCode;
use corate_core::RecommendError;
use corate_shared::AppError;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Cancels its token when the request finishes, is dropped by the client, or
/// runs past its deadline.
pub struct RequestScope {
  token: CancellationToken,
  _guard: DropGuard,
}

impl RequestScope {
  #[must_use]
  pub fn new(timeout: Duration) -> Self {
    let token = CancellationToken::new();

    let deadline = token.clone();
    tokio::spawn(async move {
      tokio::select! {
        () = deadline.cancelled() => {}
        () = tokio::time::sleep(timeout) => {
          tracing::warn!(?timeout, "request deadline exceeded");
          deadline.cancel();
        }
      }
    });

    Self {
      _guard: token.clone().drop_guard(),
      token,
    }
  }

  #[must_use]
  pub const fn token(&self) -> &CancellationToken {
    &self.token
  }

  /// Drive `fut` unless the scope is cancelled first.
  pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, AppError> {
    tokio::select! {
      biased;
      () = self.token.cancelled() => Err(recommend_error(RecommendError::Cancelled)),
      out = fut => Ok(out),
    }
  }
}

pub fn recommend_error(err: RecommendError) -> AppError {
  let status = match &err {
    RecommendError::Validation(_) => StatusCode::BAD_REQUEST,
    RecommendError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    RecommendError::Cancelled => StatusCode::REQUEST_TIMEOUT,
    RecommendError::PartialWrite(_)
    | RecommendError::CorruptRecord(_)
    | RecommendError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
  };
  AppError::with_status(status, err)
}

#[cfg(test)]
mod tests {
  use corate_core::StoreError;

  use super::*;

  #[test]
  fn errors_map_to_statuses() {
    let cases = [
      (RecommendError::validation("bad id"), StatusCode::BAD_REQUEST),
      (
        StoreError::unavailable("down").into(),
        StatusCode::SERVICE_UNAVAILABLE,
      ),
      (RecommendError::Cancelled, StatusCode::REQUEST_TIMEOUT),
      (
        StoreError::PartialWrite {
          id: "u1".to_owned(),
          source: "reset".into(),
        }
        .into(),
        StatusCode::INTERNAL_SERVER_ERROR,
      ),
      (
        StoreError::Corrupt {
          user_id: "u1".to_owned(),
          reason: "rating 9 is outside [0, 5]".to_owned(),
        }
        .into(),
        StatusCode::INTERNAL_SERVER_ERROR,
      ),
    ];
    for (err, status) in cases {
      assert_eq!(recommend_error(err).status_code(), status);
    }
  }

  #[tokio::test]
  async fn scope_cancels_on_drop() {
    let scope = RequestScope::new(Duration::from_secs(60));
    let token = scope.token().clone();
    assert!(!token.is_cancelled());
    drop(scope);
    assert!(token.is_cancelled());
  }

  #[tokio::test]
  async fn run_completes_inside_the_deadline() {
    let scope = RequestScope::new(Duration::from_secs(60));
    assert_eq!(scope.run(async { 7 }).await.unwrap(), 7);
  }

  #[tokio::test]
  async fn run_gives_up_when_the_deadline_passes() {
    let scope = RequestScope::new(Duration::from_millis(10));
    let err = scope
      .run(std::future::pending::<()>())
      .await
      .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::REQUEST_TIMEOUT);
  }

  #[tokio::test]
  async fn scope_cancels_after_deadline() {
    let scope = RequestScope::new(Duration::from_millis(10));
    tokio::time::timeout(Duration::from_secs(5), scope.token().cancelled())
      .await
      .unwrap();
  }
}
