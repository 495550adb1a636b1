use std::{env, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, anyhow};

use crate::AppError;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_PARALLEL_THRESHOLD: usize = 2048;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Process configuration, read once at startup and handed to constructors.
#[derive(Debug, Clone)]
pub struct AppEnv {
  pub database_url: String,
  pub bind_addr: SocketAddr,
  pub rating_min: f64,
  pub rating_max: f64,
  pub min_similarity: f64,
  /// `None` scores against every neighbor.
  pub max_neighbors: Option<usize>,
  pub exclude_zero_score: bool,
  /// `jaccard` or `target_overlap`.
  pub similarity: String,
  /// `weighted_sum` or `normalized_mean`.
  pub scoring_mode: String,
  pub similarity_workers: usize,
  pub parallel_threshold: usize,
  /// Deadline after which an in-flight request is cancelled.
  pub request_timeout: Duration,
}

impl AppEnv {
  pub fn from_env() -> Result<Self, AppError> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  /// Build from an arbitrary key lookup. Blank values count as unset.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let database_url = get("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;

    let default_workers = std::thread::available_parallelism().map_or(1, usize::from);

    Ok(Self {
      database_url,
      bind_addr: parse_or(get("BIND_ADDR"), "BIND_ADDR", DEFAULT_BIND_ADDR.parse()?)?,
      rating_min: parse_or(get("RATING_MIN"), "RATING_MIN", 0.0)?,
      rating_max: parse_or(get("RATING_MAX"), "RATING_MAX", 5.0)?,
      min_similarity: parse_or(get("MIN_SIMILARITY"), "MIN_SIMILARITY", 0.0)?,
      max_neighbors: get("MAX_NEIGHBORS")
        .map(|v| parse_value(&v, "MAX_NEIGHBORS"))
        .transpose()?,
      exclude_zero_score: parse_or(get("EXCLUDE_ZERO_SCORE"), "EXCLUDE_ZERO_SCORE", false)?,
      similarity: get("SIMILARITY").unwrap_or_else(|| "jaccard".to_owned()),
      scoring_mode: get("SCORING_MODE").unwrap_or_else(|| "weighted_sum".to_owned()),
      similarity_workers: parse_or(get("SIMILARITY_WORKERS"), "SIMILARITY_WORKERS", default_workers)?
        .max(1),
      parallel_threshold: parse_or(
        get("PARALLEL_THRESHOLD"),
        "PARALLEL_THRESHOLD",
        DEFAULT_PARALLEL_THRESHOLD,
      )?,
      request_timeout: Duration::from_secs(parse_or(
        get("REQUEST_TIMEOUT_SECS"),
        "REQUEST_TIMEOUT_SECS",
        DEFAULT_REQUEST_TIMEOUT_SECS,
      )?),
    })
  }
}

fn parse_value<T>(raw: &str, key: &str) -> Result<T, AppError>
where
  T: FromStr,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  Ok(
    raw
      .trim()
      .parse::<T>()
      .with_context(|| format!("{key} has an invalid value: {raw:?}"))?,
  )
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T, AppError>
where
  T: FromStr,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  raw.map_or(Ok(default), |v| parse_value(&v, key))
}
