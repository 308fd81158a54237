//! Error types for `dramaturgy-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// No valid principal accompanied the request.
  #[error("unauthorized")]
  Unauthorized,

  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// The persistence collaborator failed. `operation` names the aggregator
  /// call that was in flight.
  #[error("storage failure during {operation}: {source}")]
  Storage {
    operation: &'static str,
    #[source]
    source:    Box<dyn std::error::Error + Send + Sync>,
  },
}

impl Error {
  /// Adapter for `map_err` on store results.
  pub fn storage<E>(operation: &'static str) -> impl FnOnce(E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    move |e| Error::Storage { operation, source: Box::new(e) }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
