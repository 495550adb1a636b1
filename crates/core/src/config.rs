use corate_shared::{AppEnv, AppError};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::RatingBound;

/// How two rating vectors are compared.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SimilarityKind {
  /// |co-rated| / |union of rated|. Symmetric.
  #[default]
  Jaccard,
  /// |co-rated| / |target rated|. Asymmetric; kept for parity with data
  /// scored by the legacy engine.
  TargetOverlap,
}

/// How neighbor ratings are folded into a predicted score.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
  /// Σ similarity × rating, unnormalized.
  #[default]
  WeightedSum,
  /// Σ similarity × rating / Σ similarity, over neighbors that rated the product.
  NormalizedMean,
}

/// Engine tuning, built once at startup and handed to `RecommendationService::new`.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
  pub bound: RatingBound,
  pub similarity: SimilarityKind,
  /// Neighbors scoring below this are dropped. `0.0` keeps everyone.
  pub min_similarity: f64,
  /// Use only the top-N neighbors when scoring. `None` uses all of them.
  pub max_neighbors: Option<usize>,
  /// Drop products nobody in the neighborhood rated instead of listing them at 0.
  pub exclude_zero_score: bool,
  pub scoring_mode: ScoringMode,
  /// Upper bound on concurrent similarity chunks.
  pub similarity_workers: usize,
  /// Populations larger than this are scored on the blocking pool.
  pub parallel_threshold: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      bound: RatingBound::default(),
      similarity: SimilarityKind::default(),
      min_similarity: 0.0,
      max_neighbors: None,
      exclude_zero_score: false,
      scoring_mode: ScoringMode::default(),
      similarity_workers: 4,
      parallel_threshold: 2048,
    }
  }
}

impl EngineConfig {
  pub fn from_env(env: &AppEnv) -> Result<Self, AppError> {
    let bound = RatingBound::new(env.rating_min, env.rating_max)?;
    if !(0.0..=1.0).contains(&env.min_similarity) {
      return Err(AppError::new(anyhow::anyhow!(
        "MIN_SIMILARITY must be within [0, 1], got {}",
        env.min_similarity
      )));
    }

    Ok(Self {
      bound,
      similarity: env.similarity.parse().map_err(|_| {
        anyhow::anyhow!("SIMILARITY must be `jaccard` or `target_overlap`, got {:?}", env.similarity)
      })?,
      min_similarity: env.min_similarity,
      max_neighbors: env.max_neighbors,
      exclude_zero_score: env.exclude_zero_score,
      scoring_mode: env.scoring_mode.parse().map_err(|_| {
        anyhow::anyhow!(
          "SCORING_MODE must be `weighted_sum` or `normalized_mean`, got {:?}",
          env.scoring_mode
        )
      })?,
      similarity_workers: env.similarity_workers.max(1),
      parallel_threshold: env.parallel_threshold,
    })
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  fn env_with(pairs: &[(&str, &str)]) -> AppEnv {
    let mut map: HashMap<&str, &str> = pairs.iter().copied().collect();
    map.entry("DATABASE_URL").or_insert("postgres://localhost/corate");
    AppEnv::from_lookup(|key| map.get(key).map(|v| (*v).to_owned())).unwrap()
  }

  #[test]
  fn modes_parse_from_snake_case() {
    let config = EngineConfig::from_env(&env_with(&[
      ("SCORING_MODE", "normalized_mean"),
      ("SIMILARITY", "target_overlap"),
      ("MAX_NEIGHBORS", "25"),
    ]))
    .unwrap();
    assert_eq!(config.scoring_mode, ScoringMode::NormalizedMean);
    assert_eq!(config.similarity, SimilarityKind::TargetOverlap);
    assert_eq!(config.max_neighbors, Some(25));
  }

  #[test]
  fn defaults_match_engine_defaults() {
    let config = EngineConfig::from_env(&env_with(&[])).unwrap();
    let defaults = EngineConfig::default();
    assert_eq!(config.bound, defaults.bound);
    assert_eq!(config.scoring_mode, defaults.scoring_mode);
    assert_eq!(config.similarity, defaults.similarity);
    assert!(!config.exclude_zero_score);
  }

  #[test]
  fn rejects_unknown_mode_and_inverted_bound() {
    assert!(EngineConfig::from_env(&env_with(&[("SCORING_MODE", "median")])).is_err());
    assert!(EngineConfig::from_env(&env_with(&[("RATING_MIN", "5"), ("RATING_MAX", "1")])).is_err());
    assert!(EngineConfig::from_env(&env_with(&[("MIN_SIMILARITY", "1.5")])).is_err());
  }
}
