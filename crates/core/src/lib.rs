mod config;
pub use config::{EngineConfig, ScoringMode, SimilarityKind};

mod error;
pub use error::{BoxError, RecommendError, StoreError};

mod model;
pub use model::{
  BulkFetch, Product, ProductRating, RatingBound, RatingVector, RecommendationEntry,
  Recommendations, SimilarUsers, SimilarityScore, UserRatings, validate_id,
};

pub mod engine;

pub mod store;
pub use store::{MemoryStore, PgStore, ProductCatalog, RatingStore};

mod service;
pub use service::RecommendationService;
