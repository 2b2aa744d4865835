use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors from clustering input validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  /// The caller handed in no data points at all.
  #[error("cannot cluster an empty data set")]
  EmptyInput,

  /// The requested cluster count cannot be satisfied by the data.
  #[error("invalid cluster count: requested {requested} clusters for {points} points")]
  InvalidClusterCount { requested: usize, points: usize },

  /// A data point's dimension disagrees with the rest of the set.
  #[error("dimension mismatch: expected {expected}, found {found}")]
  DimensionMismatch { expected: usize, found: usize },
}
