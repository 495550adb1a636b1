use crate::{RatingVector, SimilarityKind};

/// Number of products rated in both vectors.
#[must_use]
pub fn co_rated_count(a: &RatingVector, b: &RatingVector) -> usize {
  let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
  small.keys().filter(|id| large.contains(id)).count()
}

/// Jaccard overlap of the two vectors' rated products, in [0, 1].
///
/// Two empty vectors have nothing to compare and score 0.
#[must_use]
pub fn similarity(a: &RatingVector, b: &RatingVector) -> f64 {
  similarity_with(SimilarityKind::Jaccard, a, b)
}

/// Similarity of `other` to `target` under the given measure.
#[must_use]
pub fn similarity_with(kind: SimilarityKind, target: &RatingVector, other: &RatingVector) -> f64 {
  let co_rated = co_rated_count(target, other);
  let denom = match kind {
    SimilarityKind::Jaccard => target.len() + other.len() - co_rated,
    SimilarityKind::TargetOverlap => target.len(),
  };
  if denom == 0 {
    return 0.0;
  }
  co_rated as f64 / denom as f64
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;
  use crate::RatingBound;

  fn vector(pairs: &[(&str, f64)]) -> RatingVector {
    RatingVector::try_new(pairs.iter().copied(), &RatingBound::default()).unwrap()
  }

  #[test]
  fn empty_vectors_score_zero() {
    let empty = RatingVector::new();
    assert_eq!(similarity(&empty, &empty), 0.0);
    assert_eq!(similarity(&empty, &vector(&[("p1", 3.0)])), 0.0);
  }

  #[test]
  fn overlap_is_normalized_by_union() {
    let target = vector(&[("p1", 5.0), ("p2", 3.0)]);
    let other = vector(&[("p1", 4.0), ("p3", 5.0)]);
    assert!((similarity(&target, &other) - 1.0 / 3.0).abs() < 1e-12);
  }

  #[test]
  fn rating_values_do_not_affect_overlap() {
    let a = vector(&[("p1", 0.0), ("p2", 5.0)]);
    let b = vector(&[("p1", 5.0), ("p2", 0.0)]);
    assert_eq!(similarity(&a, &b), 1.0);
  }

  #[test]
  fn target_overlap_divides_by_target_only() {
    let target = vector(&[("p1", 5.0), ("p2", 3.0)]);
    let other = vector(&[("p1", 4.0), ("p3", 5.0), ("p4", 1.0)]);
    assert_eq!(similarity_with(SimilarityKind::TargetOverlap, &target, &other), 0.5);
    assert!(
      (similarity_with(SimilarityKind::TargetOverlap, &other, &target) - 1.0 / 3.0).abs() < 1e-12
    );
  }

  fn rating_vector() -> impl Strategy<Value = RatingVector> {
    prop::collection::btree_map("p[0-9]{1,2}", 0.0f64..=5.0, 0..24).prop_map(|entries| {
      RatingVector::try_new(entries, &RatingBound::default()).unwrap()
    })
  }

  proptest! {
    #[test]
    fn self_similarity_is_one(a in rating_vector()) {
      prop_assume!(!a.is_empty());
      prop_assert_eq!(similarity(&a, &a), 1.0);
    }

    #[test]
    fn similarity_is_symmetric(a in rating_vector(), b in rating_vector()) {
      prop_assert_eq!(similarity(&a, &b), similarity(&b, &a));
    }

    #[test]
    fn similarity_stays_in_unit_interval(a in rating_vector(), b in rating_vector()) {
      let s = similarity(&a, &b);
      prop_assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn disjoint_vectors_score_zero(a in rating_vector(), b in rating_vector()) {
      let b = RatingVector::try_new(
        b.into_iter()
          .filter(|(id, _)| !a.contains(id))
          .map(|(id, v)| (format!("q{id}"), v)),
        &RatingBound::default(),
      )
      .unwrap();
      prop_assert_eq!(similarity(&a, &b), 0.0);
    }
  }
}
