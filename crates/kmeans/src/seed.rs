//! K-means++ centroid seeding.
//!
//! Random seeding tends to drop several centroids into the same dense
//! region and starve the rest of the space. K-means++ picks the first
//! centroid uniformly, then samples each subsequent centroid with
//! probability proportional to its squared distance from the nearest
//! already-chosen centroid, spreading the seeds apart.

use rand::Rng;

use crate::error::{Error, Result};
use crate::vector::{squared_distance, Vector};

/// Select `k` seed centroids from `data` via k-means++ sampling.
///
/// Seeds are chosen from distinct data indices; their values may still
/// coincide when the input contains duplicate points.
pub fn seed_centroids(data: &[Vector], k: usize, rng: &mut impl Rng) -> Result<Vec<Vector>> {
  if data.is_empty() {
    return Err(Error::EmptyInput);
  }
  if k == 0 || k > data.len() {
    return Err(Error::InvalidClusterCount { requested: k, points: data.len() });
  }

  let mut centroids: Vec<Vector> = Vec::with_capacity(k);
  centroids.push(data[rng.random_range(0..data.len())].clone());

  let mut dist_sq = vec![0.0f64; data.len()];
  while centroids.len() < k {
    let mut total = 0.0;
    for (idx, point) in data.iter().enumerate() {
      let nearest = centroids
        .iter()
        .map(|c| squared_distance(point, c))
        .fold(f64::INFINITY, f64::min);
      dist_sq[idx] = nearest;
      total += nearest;
    }

    // All remaining points sit on an existing centroid; weighted
    // sampling degenerates, so fall back to a uniform pick.
    if total == 0.0 {
      centroids.push(data[rng.random_range(0..data.len())].clone());
      continue;
    }

    let threshold = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    let mut chosen = data.len() - 1;
    for (idx, &d) in dist_sq.iter().enumerate() {
      cumulative += d;
      if cumulative >= threshold {
        chosen = idx;
        break;
      }
    }
    centroids.push(data[chosen].clone());
  }

  Ok(centroids)
}
