use std::{sync::Arc, time::Duration};

use corate_core::{PgStore, RecommendationService};

pub type Service = RecommendationService<PgStore, PgStore>;

#[derive(Clone)]
pub struct AppState {
  pub service: Arc<Service>,
  /// Catalog administration goes straight to the store.
  pub store: PgStore,
  pub request_timeout: Duration,
}

impl AppState {
  #[must_use]
  pub fn new(service: Service, store: PgStore, request_timeout: Duration) -> Self {
    Self {
      service: Arc::new(service),
      store,
      request_timeout,
    }
  }

  /// Cancellation scope for one request, bounded by the configured deadline.
  #[must_use]
  pub fn scope(&self) -> super::RequestScope {
    super::RequestScope::new(self.request_timeout)
  }
}
