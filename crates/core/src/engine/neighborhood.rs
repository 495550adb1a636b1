use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::similarity_with;
use crate::{EngineConfig, RatingVector, RecommendError, SimilarityKind, SimilarityScore, UserRatings};

/// Users scored between cancellation checks on a worker.
const CANCEL_CHECK_INTERVAL: usize = 256;

/// Chunks handed out per worker, so one slow chunk does not idle the rest.
const CHUNKS_PER_WORKER: usize = 4;

/// Order by score descending, then user id ascending.
#[must_use]
pub fn rank_neighbors(mut scores: Vec<SimilarityScore>) -> Vec<SimilarityScore> {
  scores.sort_by(|a, b| {
    b.score
      .total_cmp(&a.score)
      .then_with(|| a.user_id.cmp(&b.user_id))
  });
  scores
}

/// Ranks every other user in a population by similarity to one target user.
///
/// Never truncates; how many neighbors to use is the scorer's call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborhoodBuilder {
  kind: SimilarityKind,
  min_similarity: f64,
}

impl Default for NeighborhoodBuilder {
  fn default() -> Self {
    Self::new(SimilarityKind::Jaccard, 0.0)
  }
}

impl NeighborhoodBuilder {
  #[must_use]
  pub const fn new(kind: SimilarityKind, min_similarity: f64) -> Self {
    Self {
      kind,
      min_similarity,
    }
  }

  #[must_use]
  pub const fn from_config(config: &EngineConfig) -> Self {
    Self::new(config.similarity, config.min_similarity)
  }

  #[must_use]
  pub fn build(
    &self,
    target_user_id: &str,
    target: &RatingVector,
    population: &[UserRatings],
  ) -> Vec<SimilarityScore> {
    rank_neighbors(self.score_slice(target_user_id, target, population, None))
  }

  /// Same result as [`build`](Self::build), with similarity computed in chunks
  /// on the blocking pool, at most `workers` chunks at a time.
  pub async fn build_concurrent(
    &self,
    target_user_id: Arc<str>,
    target: Arc<RatingVector>,
    population: Arc<[UserRatings]>,
    workers: usize,
    cancel: &CancellationToken,
  ) -> Result<Vec<SimilarityScore>, RecommendError> {
    let workers = workers.max(1);
    let chunk_len = population
      .len()
      .div_ceil(workers * CHUNKS_PER_WORKER)
      .max(1);

    let mut tasks = JoinSet::new();
    let mut scores = Vec::with_capacity(population.len());

    for start in (0..population.len()).step_by(chunk_len) {
      if tasks.len() >= workers
        && let Some(joined) = tasks.join_next().await
      {
        scores.extend(joined?);
      }
      if cancel.is_cancelled() {
        return Err(RecommendError::Cancelled);
      }

      let end = (start + chunk_len).min(population.len());
      let builder = *self;
      let target_user_id = Arc::clone(&target_user_id);
      let target = Arc::clone(&target);
      let population = Arc::clone(&population);
      let cancel = cancel.clone();
      tasks.spawn_blocking(move || {
        builder.score_slice(&target_user_id, &target, &population[start..end], Some(&cancel))
      });
    }

    while let Some(joined) = tasks.join_next().await {
      scores.extend(joined?);
    }

    // chunks bail out early on cancellation, so their output may be incomplete
    if cancel.is_cancelled() {
      return Err(RecommendError::Cancelled);
    }

    Ok(rank_neighbors(scores))
  }

  fn score_slice(
    &self,
    target_user_id: &str,
    target: &RatingVector,
    population: &[UserRatings],
    cancel: Option<&CancellationToken>,
  ) -> Vec<SimilarityScore> {
    let mut scores = Vec::with_capacity(population.len());

    for (i, other) in population.iter().enumerate() {
      if i % CANCEL_CHECK_INTERVAL == 0 && cancel.is_some_and(CancellationToken::is_cancelled) {
        break;
      }
      if other.user_id == target_user_id {
        continue;
      }

      let score = similarity_with(self.kind, target, &other.ratings);
      if score < self.min_similarity {
        continue;
      }
      scores.push(SimilarityScore {
        user_id: other.user_id.clone(),
        score,
      });
    }

    scores
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::RatingBound;

  fn user(id: &str, pairs: &[(&str, f64)]) -> UserRatings {
    UserRatings {
      user_id: id.to_owned(),
      ratings: RatingVector::try_new(pairs.iter().copied(), &RatingBound::default()).unwrap(),
    }
  }

  fn population() -> Vec<UserRatings> {
    vec![
      user("target", &[("p1", 5.0), ("p2", 3.0)]),
      user("u3", &[("p4", 2.0)]),
      user("u2", &[("p1", 4.0), ("p3", 5.0)]),
      user("u1", &[("p1", 1.0), ("p2", 1.0)]),
      user("u0", &[("p9", 1.0)]),
    ]
  }

  #[test]
  fn excludes_target_and_orders_by_score_then_id() {
    let pop = population();
    let target = &pop[0].ratings;
    let neighbors = NeighborhoodBuilder::default().build("target", target, &pop);

    let ids: Vec<_> = neighbors.iter().map(|n| n.user_id.as_str()).collect();
    assert_eq!(ids, ["u1", "u2", "u0", "u3"]);
    assert_eq!(neighbors[0].score, 1.0);
    assert!((neighbors[1].score - 1.0 / 3.0).abs() < 1e-12);
    assert_eq!(neighbors[2].score, 0.0);
  }

  #[test]
  fn threshold_drops_weak_neighbors() {
    let pop = population();
    let neighbors =
      NeighborhoodBuilder::new(SimilarityKind::Jaccard, f64::MIN_POSITIVE).build("target", &pop[0].ratings, &pop);
    let ids: Vec<_> = neighbors.iter().map(|n| n.user_id.as_str()).collect();
    assert_eq!(ids, ["u1", "u2"]);
  }

  #[tokio::test]
  async fn concurrent_build_matches_sequential() {
    let mut pop = Vec::new();
    for i in 0..500 {
      let pairs: Vec<(String, f64)> = (0..(i % 7))
        .map(|k| (format!("p{}", (i * 3 + k) % 40), f64::from(k as u8) / 2.0))
        .collect();
      pop.push(UserRatings {
        user_id: format!("u{i:03}"),
        ratings: RatingVector::try_new(pairs, &RatingBound::default()).unwrap(),
      });
    }
    let target = pop[9].ratings.clone();
    let builder = NeighborhoodBuilder::default();

    let sequential = builder.build("u009", &target, &pop);
    let concurrent = builder
      .build_concurrent(
        Arc::from("u009"),
        Arc::new(target),
        Arc::from(pop),
        3,
        &CancellationToken::new(),
      )
      .await
      .unwrap();

    assert_eq!(sequential, concurrent);
    assert_eq!(concurrent.len(), 499);
  }

  #[tokio::test]
  async fn cancelled_build_returns_no_result() {
    let pop = population();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = NeighborhoodBuilder::default()
      .build_concurrent(
        Arc::from("target"),
        Arc::new(pop[0].ratings.clone()),
        Arc::from(pop),
        2,
        &cancel,
      )
      .await;
    assert!(matches!(result, Err(RecommendError::Cancelled)));
  }
}
