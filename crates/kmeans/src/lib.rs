//! K-means++ clustering primitives.
//!
//! Partitions N-dimensional vectors into k clusters with Lloyd's
//! algorithm, seeded by k-means++ selection so the initial centroids
//! spread across the data instead of piling into one region. The
//! iteration stops as soon as no point changes cluster, or when the
//! caller's iteration cap is exceeded.
//!
//! Results are not deterministic across runs unless the caller seeds
//! the random source, see [`KmeansConfig::with_seed`].

pub mod error;
pub mod lloyd;
pub mod rank;
pub mod seed;
pub mod vector;

pub use error::{Error, Result};
pub use lloyd::{ClusteredVector, KmeansConfig};
pub use rank::rank_clusters;
pub use vector::Vector;
