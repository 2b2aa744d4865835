//! Lloyd's iteration over k-means++ seeds.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::seed::seed_centroids;
use crate::vector::{add, distance, scale, Vector};

/// A data point with its current cluster assignment.
#[derive(Debug, Clone)]
pub struct ClusteredVector {
  pub vector: Vector,
  /// Index of the assigned cluster, in `0..k`.
  pub cluster: usize,
  /// Euclidean distance to the assigned centroid.
  pub distance: f64,
}

/// Clustering parameters.
///
/// `max_iterations` caps the Lloyd loop; the loop also stops early the
/// moment an iteration moves no point between clusters. Without
/// [`with_seed`](Self::with_seed) the run is randomized, so tests
/// should either fix the seed or assert on structural properties
/// rather than concrete cluster indices.
#[derive(Debug, Clone)]
pub struct KmeansConfig {
  k: usize,
  max_iterations: usize,
  seed: Option<u64>,
}

impl KmeansConfig {
  pub fn new(k: usize, max_iterations: usize) -> Self {
    Self { k, max_iterations, seed: None }
  }

  /// Fix the random source for reproducible runs.
  pub fn with_seed(mut self, seed: u64) -> Self {
    self.seed = Some(seed);
    self
  }

  /// Cluster `data` into `k` groups.
  ///
  /// Every input vector must share one dimension; the first vector
  /// sets the expectation and any disagreeing point is rejected.
  pub fn run(&self, data: &[Vector]) -> Result<Vec<ClusteredVector>> {
    if data.is_empty() {
      return Err(Error::EmptyInput);
    }
    let dimension = data[0].len();
    for point in data {
      if point.len() != dimension {
        return Err(Error::DimensionMismatch { expected: dimension, found: point.len() });
      }
    }

    let mut rng = match self.seed {
      Some(s) => StdRng::seed_from_u64(s),
      None => StdRng::from_os_rng(),
    };

    let mut centroids = seed_centroids(data, self.k, &mut rng)?;
    let mut clustered: Vec<ClusteredVector> = data
      .iter()
      .map(|v| {
        let (cluster, dist) = nearest(v, &centroids);
        ClusteredVector { vector: v.clone(), cluster, distance: dist }
      })
      .collect();

    let mut iteration = 0;
    loop {
      update_centroids(&mut centroids, &clustered, dimension, data, &mut rng);

      let mut changes = 0;
      for item in clustered.iter_mut() {
        let (cluster, dist) = nearest(&item.vector, &centroids);
        if cluster != item.cluster {
          changes += 1;
        }
        item.cluster = cluster;
        item.distance = dist;
      }

      iteration += 1;
      if changes == 0 || iteration > self.max_iterations {
        return Ok(clustered);
      }
    }
  }
}

/// Index and distance of the centroid closest to `point`.
fn nearest(point: &[f64], centroids: &[Vector]) -> (usize, f64) {
  let mut best = 0;
  let mut best_dist = f64::INFINITY;
  for (idx, centroid) in centroids.iter().enumerate() {
    let dist = distance(point, centroid);
    if dist < best_dist {
      best_dist = dist;
      best = idx;
    }
  }
  (best, best_dist)
}

/// Recompute each centroid as the mean of its members.
///
/// A cluster that lost all members is re-seeded from a uniformly
/// random data point rather than left to divide by zero.
fn update_centroids(
  centroids: &mut [Vector],
  clustered: &[ClusteredVector],
  dimension: usize,
  data: &[Vector],
  rng: &mut impl Rng,
) {
  let mut sizes = vec![0usize; centroids.len()];
  for centroid in centroids.iter_mut() {
    *centroid = vec![0.0; dimension];
  }
  for item in clustered {
    add(&mut centroids[item.cluster], &item.vector);
    sizes[item.cluster] += 1;
  }
  for (centroid, &size) in centroids.iter_mut().zip(sizes.iter()) {
    if size > 0 {
      scale(centroid, 1.0 / size as f64);
    } else {
      *centroid = data[rng.random_range(0..data.len())].clone();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn two_groups() -> Vec<Vector> {
    vec![
      vec![0.0, 0.0],
      vec![0.2, 0.1],
      vec![0.1, 0.3],
      vec![100.0, 100.0],
      vec![100.2, 100.1],
      vec![100.1, 99.8],
    ]
  }

  #[test]
  fn separates_two_well_separated_groups() {
    let clustered = KmeansConfig::new(2, 10).with_seed(42).run(&two_groups()).unwrap();

    let first = clustered[0].cluster;
    assert!(clustered[..3].iter().all(|c| c.cluster == first));
    let second = clustered[3].cluster;
    assert!(clustered[3..].iter().all(|c| c.cluster == second));
    assert_ne!(first, second);
  }

  #[test]
  fn fourteen_point_scenario_with_tight_iteration_cap() {
    let data: Vec<Vector> = vec![
      vec![0.0, 2.0],
      vec![1.0, 1.0],
      vec![2.0, 2.0],
      vec![3.0, 3.0],
      vec![4.0, 4.0],
      vec![5.0, 5.0],
      vec![6.0, 6.0],
      vec![100.0, 100.0],
      vec![101.0, 100.0],
      vec![102.0, 100.0],
      vec![103.0, 100.0],
      vec![104.0, 100.0],
      vec![105.0, 100.0],
      vec![106.0, 100.0],
    ];

    let clustered = KmeansConfig::new(2, 2).with_seed(9).run(&data).unwrap();
    let low = clustered[0].cluster;
    assert!(clustered[..7].iter().all(|c| c.cluster == low));
    let high = clustered[7].cluster;
    assert!(clustered[7..].iter().all(|c| c.cluster == high));
    assert_ne!(low, high);
  }

  #[test]
  fn records_distance_to_assigned_centroid() {
    let clustered = KmeansConfig::new(2, 10).with_seed(1).run(&two_groups()).unwrap();
    // Points sit within a unit of their group center, nowhere near the
    // other group's centroid.
    for item in &clustered {
      assert!(item.distance < 1.0, "distance {} too large", item.distance);
    }
  }

  #[test]
  fn same_seed_reproduces_assignments() {
    let data = two_groups();
    let a = KmeansConfig::new(2, 10).with_seed(5).run(&data).unwrap();
    let b = KmeansConfig::new(2, 10).with_seed(5).run(&data).unwrap();
    let labels_a: Vec<usize> = a.iter().map(|c| c.cluster).collect();
    let labels_b: Vec<usize> = b.iter().map(|c| c.cluster).collect();
    assert_eq!(labels_a, labels_b);
  }

  #[test]
  fn k_equal_to_point_count_gives_each_point_a_cluster() {
    let data = vec![vec![0.0, 0.0], vec![5.0, 0.0], vec![0.0, 5.0]];
    let clustered = KmeansConfig::new(3, 10).with_seed(2).run(&data).unwrap();
    let labels: std::collections::HashSet<usize> = clustered.iter().map(|c| c.cluster).collect();
    assert_eq!(labels.len(), 3);
    assert!(clustered.iter().all(|c| c.distance == 0.0));
  }

  #[test]
  fn empty_input_errors() {
    let err = KmeansConfig::new(1, 3).run(&[]).unwrap_err();
    assert_eq!(err, Error::EmptyInput);
  }

  #[test]
  fn mismatched_dimensions_error() {
    let data = vec![vec![0.0, 0.0], vec![1.0]];
    let err = KmeansConfig::new(1, 3).run(&data).unwrap_err();
    assert_eq!(err, Error::DimensionMismatch { expected: 2, found: 1 });
  }
}
