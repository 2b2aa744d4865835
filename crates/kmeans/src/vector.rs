//! Elementwise vector arithmetic.
//!
//! Vectors are plain `Vec<f64>`; all operations assume equal dimensions
//! within one clustering run. Length is validated once at the crate
//! boundary (see [`crate::lloyd`]), so the hot-loop helpers here only
//! carry debug assertions.

/// An N-dimensional data point.
pub type Vector = Vec<f64>;

/// Elementwise sum, accumulated in place on `a`.
pub fn add(a: &mut Vector, b: &Vector) {
  debug_assert_eq!(a.len(), b.len());
  for (x, y) in a.iter_mut().zip(b.iter()) {
    *x += y;
  }
}

/// Elementwise multiplication by a scalar, in place.
pub fn scale(v: &mut Vector, s: f64) {
  for x in v.iter_mut() {
    *x *= s;
  }
}

/// Euclidean distance between two vectors of equal dimension.
pub fn distance(a: &[f64], b: &[f64]) -> f64 {
  debug_assert_eq!(a.len(), b.len());
  squared_distance(a, b).sqrt()
}

/// Squared Euclidean distance; avoids the sqrt in nearest-centroid scans.
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
  a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Elementwise average of a non-empty set of vectors.
pub fn mean(vectors: &[Vector]) -> Vector {
  debug_assert!(!vectors.is_empty());
  let mut sum = vectors[0].clone();
  for v in &vectors[1..] {
    add(&mut sum, v);
  }
  scale(&mut sum, 1.0 / vectors.len() as f64);
  sum
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn add_accumulates_in_place() {
    let mut a = vec![1.0, 2.0, 3.0];
    add(&mut a, &vec![0.5, 0.5, 0.5]);
    assert_eq!(a, vec![1.5, 2.5, 3.5]);
  }

  #[test]
  fn scale_multiplies_each_component() {
    let mut v = vec![2.0, -4.0];
    scale(&mut v, 0.5);
    assert_eq!(v, vec![1.0, -2.0]);
  }

  #[test]
  fn distance_is_euclidean() {
    assert_eq!(distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
  }

  #[test]
  fn distance_of_identical_points_is_zero() {
    assert_eq!(distance(&[1.5, 2.5], &[1.5, 2.5]), 0.0);
  }

  #[test]
  fn mean_averages_elementwise() {
    let vectors = vec![vec![0.0, 2.0], vec![4.0, 6.0]];
    assert_eq!(mean(&vectors), vec![2.0, 4.0]);
  }

  #[test]
  fn mean_of_single_vector_is_itself() {
    assert_eq!(mean(&[vec![7.0, -1.0]]), vec![7.0, -1.0]);
  }
}
