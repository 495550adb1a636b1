use std::{
  collections::{BTreeMap, HashMap},
  future::Future,
  sync::Arc,
};

use tokio_util::sync::CancellationToken;

use crate::{
  BulkFetch, EngineConfig, ProductCatalog, ProductRating, RatingStore, RatingVector,
  RecommendError, Recommendations, SimilarUsers, SimilarityScore, UserRatings,
  engine::{NeighborhoodBuilder, ScoringEngine},
  validate_id,
};

/// Run a store call unless `cancel` fires first.
async fn cancellable<F: Future>(
  cancel: &CancellationToken,
  fut: F,
) -> Result<F::Output, RecommendError> {
  tokio::select! {
    biased;
    () = cancel.cancelled() => Err(RecommendError::Cancelled),
    out = fut => Ok(out),
  }
}

/// Log users whose ratings could not be loaded.
fn report_skipped(operation: &str, id: &str, skipped: &[String]) {
  if !skipped.is_empty() {
    tracing::warn!(
      operation,
      id,
      skipped = skipped.len(),
      skipped_users = ?skipped,
      "skipped unreadable rating records"
    );
  }
}

/// The target is never one of its own neighbors, so it is not reported as a
/// skipped one either.
fn without_target(mut skipped: Vec<String>, user_id: &str) -> Vec<String> {
  skipped.retain(|id| id != user_id);
  skipped
}

/// Request-scoped recommendations over a `RatingStore` and a `ProductCatalog`.
///
/// Holds no per-request state; one instance serves concurrent requests.
#[derive(Debug, Clone)]
pub struct RecommendationService<S, C> {
  ratings: S,
  catalog: C,
  config: EngineConfig,
}

impl<S, C> RecommendationService<S, C>
where
  S: RatingStore,
  C: ProductCatalog,
{
  pub fn new(ratings: S, catalog: C, config: &EngineConfig) -> Self {
    Self {
      ratings,
      catalog,
      config: config.clone(),
    }
  }

  /// Ranked predictions for products `user_id` has not rated.
  ///
  /// An unknown user, or one without ratings, gets an empty list. A target
  /// whose own stored ratings are corrupt fails with `CorruptRecord`.
  pub async fn get_recommendations(
    &self,
    user_id: &str,
    cancel: &CancellationToken,
  ) -> Result<Recommendations, RecommendError> {
    validate_id("user", user_id)?;

    let target = cancellable(cancel, self.ratings.get_user_ratings(user_id)).await??;
    if target.is_empty() {
      tracing::debug!(user_id, "no ratings, nothing to recommend");
      return Ok(Recommendations::default());
    }

    let (population, catalog) = tokio::try_join!(
      async { Ok::<_, RecommendError>(cancellable(cancel, self.ratings.list_all_ratings()).await??) },
      async { Ok::<_, RecommendError>(cancellable(cancel, self.catalog.list_products()).await??) },
    )?;
    let BulkFetch { records, skipped } = population;
    let skipped = without_target(skipped, user_id);
    report_skipped("recommendations", user_id, &skipped);

    let records: Arc<[UserRatings]> = Arc::from(records);
    let target = Arc::new(target);
    let neighborhood = self
      .neighborhood(user_id, Arc::clone(&target), Arc::clone(&records), cancel)
      .await?;

    let lookup: HashMap<&str, &RatingVector> = records
      .iter()
      .map(|u| (u.user_id.as_str(), &u.ratings))
      .collect();
    let entries = ScoringEngine::from_config(&self.config).score_products(
      user_id,
      &target,
      &neighborhood,
      |id| lookup.get(id).copied(),
      &catalog,
    );

    if cancel.is_cancelled() {
      return Err(RecommendError::Cancelled);
    }

    tracing::debug!(
      user_id,
      neighbors = neighborhood.len(),
      products = catalog.len(),
      entries = entries.len(),
      "scored recommendations"
    );

    Ok(Recommendations {
      entries,
      skipped_users: skipped,
    })
  }

  /// Other users ranked by similarity to `user_id`.
  pub async fn get_similar_users(
    &self,
    user_id: &str,
    cancel: &CancellationToken,
  ) -> Result<SimilarUsers, RecommendError> {
    validate_id("user", user_id)?;

    let (target, population) = tokio::try_join!(
      async { Ok::<_, RecommendError>(cancellable(cancel, self.ratings.get_user_ratings(user_id)).await??) },
      async { Ok::<_, RecommendError>(cancellable(cancel, self.ratings.list_all_ratings()).await??) },
    )?;
    let BulkFetch { records, skipped } = population;
    let skipped = without_target(skipped, user_id);
    report_skipped("similar_users", user_id, &skipped);

    let neighbors = self
      .neighborhood(user_id, Arc::new(target), Arc::from(records), cancel)
      .await?;

    Ok(SimilarUsers {
      neighbors,
      skipped_users: skipped,
    })
  }

  /// Merge `ratings` into the user's stored ratings.
  ///
  /// Every id and value is checked before the store is touched, so a rejected
  /// update leaves prior ratings as they were.
  pub async fn update_user_ratings<I, K>(
    &self,
    user_id: &str,
    ratings: I,
    cancel: &CancellationToken,
  ) -> Result<(), RecommendError>
  where
    I: IntoIterator<Item = (K, f64)>,
    K: Into<String>,
  {
    validate_id("user", user_id)?;
    let partial = RatingVector::try_new(ratings, &self.config.bound)?;
    if partial.is_empty() {
      return Ok(());
    }

    cancellable(cancel, self.ratings.update_user_ratings(user_id, &partial)).await??;
    tracing::info!(user_id, keys = partial.len(), "updated ratings");
    Ok(())
  }

  pub async fn delete_user_ratings(
    &self,
    user_id: &str,
    cancel: &CancellationToken,
  ) -> Result<(), RecommendError> {
    validate_id("user", user_id)?;
    cancellable(cancel, self.ratings.delete_user_ratings(user_id)).await??;
    tracing::info!(user_id, "deleted ratings");
    Ok(())
  }

  /// Every stored rating of one product, by user id.
  pub async fn get_product_ratings(
    &self,
    product_id: &str,
    cancel: &CancellationToken,
  ) -> Result<Vec<ProductRating>, RecommendError> {
    validate_id("product", product_id)?;

    let population = cancellable(cancel, self.ratings.list_all_ratings()).await??;
    report_skipped("product_ratings", product_id, &population.skipped);

    Ok(
      population
        .records
        .into_iter()
        .filter_map(|u| {
          u.ratings.get(product_id).map(|rating| ProductRating {
            user_id: u.user_id,
            rating,
          })
        })
        .collect(),
    )
  }

  /// Set one product's rating for each listed user. A user listed twice
  /// keeps the last value.
  ///
  /// Every id and value is checked before the store is touched.
  pub async fn update_product_ratings<I, K>(
    &self,
    product_id: &str,
    ratings: I,
    cancel: &CancellationToken,
  ) -> Result<(), RecommendError>
  where
    I: IntoIterator<Item = (K, f64)>,
    K: Into<String>,
  {
    validate_id("product", product_id)?;

    let mut by_user = BTreeMap::new();
    for (user_id, rating) in ratings {
      let user_id = user_id.into();
      validate_id("user", &user_id)?;
      by_user.insert(user_id, self.config.bound.check(product_id, rating)?);
    }
    if by_user.is_empty() {
      return Ok(());
    }

    let ratings: Vec<_> = by_user
      .into_iter()
      .map(|(user_id, rating)| ProductRating { user_id, rating })
      .collect();
    cancellable(cancel, self.ratings.update_product_ratings(product_id, &ratings)).await??;
    tracing::info!(product_id, users = ratings.len(), "updated product ratings");
    Ok(())
  }

  /// Remove every rating of a product, keeping it in the catalog.
  pub async fn delete_product_ratings(
    &self,
    product_id: &str,
    cancel: &CancellationToken,
  ) -> Result<(), RecommendError> {
    validate_id("product", product_id)?;
    cancellable(cancel, self.ratings.delete_product_ratings(product_id)).await??;
    tracing::info!(product_id, "deleted product ratings");
    Ok(())
  }

  async fn neighborhood(
    &self,
    user_id: &str,
    target: Arc<RatingVector>,
    population: Arc<[UserRatings]>,
    cancel: &CancellationToken,
  ) -> Result<Vec<SimilarityScore>, RecommendError> {
    let builder = NeighborhoodBuilder::from_config(&self.config);

    if population.len() > self.config.parallel_threshold {
      builder
        .build_concurrent(
          Arc::from(user_id),
          target,
          population,
          self.config.similarity_workers,
          cancel,
        )
        .await
    } else {
      Ok(builder.build(user_id, &target, &population))
    }
  }
}
