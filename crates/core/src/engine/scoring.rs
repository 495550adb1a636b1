use std::collections::{HashMap, HashSet};

use crate::{EngineConfig, Product, RatingVector, RecommendationEntry, ScoringMode, SimilarityScore};

/// Order by score descending, then product id ascending.
#[must_use]
pub fn rank_entries(mut entries: Vec<RecommendationEntry>) -> Vec<RecommendationEntry> {
  entries.sort_by(|a, b| {
    b.score
      .total_cmp(&a.score)
      .then_with(|| a.product_id.cmp(&b.product_id))
  });
  entries
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
  weighted: f64,
  weight: f64,
}

/// Predicts a score for every catalog product the target has not rated yet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoringEngine {
  mode: ScoringMode,
  max_neighbors: Option<usize>,
  exclude_zero_score: bool,
}

impl ScoringEngine {
  #[must_use]
  pub const fn new(mode: ScoringMode, max_neighbors: Option<usize>, exclude_zero_score: bool) -> Self {
    Self {
      mode,
      max_neighbors,
      exclude_zero_score,
    }
  }

  #[must_use]
  pub const fn from_config(config: &EngineConfig) -> Self {
    Self::new(config.scoring_mode, config.max_neighbors, config.exclude_zero_score)
  }

  /// Score `catalog` for `target_user_id` from a ranked neighborhood.
  ///
  /// With [`ScoringMode::WeightedSum`] a product's score is
  /// Σ similarity × rating over the neighbors that rated it. Products nobody
  /// in the neighborhood rated score 0 and are kept unless
  /// `exclude_zero_score` is set. Products already in `target` never appear.
  pub fn score_products<'a, F>(
    &self,
    target_user_id: &str,
    target: &RatingVector,
    neighborhood: &[SimilarityScore],
    neighbor_ratings: F,
    catalog: &[Product],
  ) -> Vec<RecommendationEntry>
  where
    F: Fn(&str) -> Option<&'a RatingVector>,
  {
    let limit = self.max_neighbors.unwrap_or(neighborhood.len());
    let mut totals: HashMap<&str, Accumulator> = HashMap::new();

    for neighbor in neighborhood.iter().take(limit) {
      if neighbor.user_id == target_user_id {
        continue;
      }
      let Some(ratings) = neighbor_ratings(&neighbor.user_id) else {
        continue;
      };
      for (product_id, rating) in ratings.iter() {
        if target.contains(product_id) {
          continue;
        }
        let acc = totals.entry(product_id).or_default();
        acc.weighted = neighbor.score.mul_add(rating, acc.weighted);
        acc.weight += neighbor.score;
      }
    }

    let mut seen = HashSet::with_capacity(catalog.len());
    let mut entries = Vec::with_capacity(catalog.len());

    for product in catalog {
      if target.contains(&product.id) || !seen.insert(product.id.as_str()) {
        continue;
      }

      let acc = totals.get(product.id.as_str()).copied().unwrap_or_default();
      let score = match self.mode {
        ScoringMode::WeightedSum => acc.weighted,
        ScoringMode::NormalizedMean if acc.weight > 0.0 => acc.weighted / acc.weight,
        ScoringMode::NormalizedMean => 0.0,
      };

      if self.exclude_zero_score && score == 0.0 {
        continue;
      }
      entries.push(RecommendationEntry {
        product_id: product.id.clone(),
        score,
      });
    }

    rank_entries(entries)
  }
}
