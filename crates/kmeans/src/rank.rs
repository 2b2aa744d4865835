//! Cohesion ranking of clustering results.
//!
//! Loose clusters are rarely actionable as "frequently asked but
//! unanswered" groups, so the ranked output favors statistically tight
//! clusters: survivors of the minimum-size filter are ordered by mean
//! member-to-centroid distance, smallest first.

use crate::lloyd::ClusteredVector;

/// Rank clusters by cohesion and return their member index lists.
///
/// Clusters with fewer than `min_size` members are dropped; the
/// remainder is sorted ascending by mean distance-to-centroid and
/// truncated to `take` entries. Member indices refer to positions in
/// `clustered` and keep their input order.
pub fn rank_clusters(
  clustered: &[ClusteredVector],
  k: usize,
  min_size: usize,
  take: usize,
) -> Vec<Vec<usize>> {
  let mut sizes = vec![0usize; k];
  let mut total_distance = vec![0.0f64; k];
  for item in clustered {
    sizes[item.cluster] += 1;
    total_distance[item.cluster] += item.distance;
  }

  let mut ranked: Vec<(usize, f64)> = (0..k)
    .filter(|&idx| sizes[idx] >= min_size && sizes[idx] > 0)
    .map(|idx| (idx, total_distance[idx] / sizes[idx] as f64))
    .collect();
  ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
  ranked.truncate(take);

  ranked
    .into_iter()
    .map(|(cluster, _)| {
      clustered
        .iter()
        .enumerate()
        .filter(|(_, item)| item.cluster == cluster)
        .map(|(idx, _)| idx)
        .collect()
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn member(cluster: usize, distance: f64) -> ClusteredVector {
    ClusteredVector { vector: vec![0.0], cluster, distance }
  }

  #[test]
  fn drops_clusters_below_minimum_size() {
    let clustered = vec![
      member(0, 0.1),
      member(0, 0.2),
      member(0, 0.3),
      member(1, 0.0), // lone member, filtered out
    ];
    let ranked = rank_clusters(&clustered, 2, 2, 2);
    assert_eq!(ranked, vec![vec![0, 1, 2]]);
  }

  #[test]
  fn orders_survivors_by_mean_distance_ascending() {
    let clustered = vec![
      member(0, 4.0),
      member(0, 6.0), // cluster 0 mean 5.0
      member(1, 1.0),
      member(1, 2.0), // cluster 1 mean 1.5
      member(2, 2.0),
      member(2, 4.0), // cluster 2 mean 3.0
    ];
    let ranked = rank_clusters(&clustered, 3, 1, 3);
    assert_eq!(ranked, vec![vec![2, 3], vec![4, 5], vec![0, 1]]);
  }

  #[test]
  fn truncates_to_requested_count() {
    let clustered = vec![member(0, 1.0), member(1, 2.0), member(2, 3.0)];
    let ranked = rank_clusters(&clustered, 3, 1, 2);
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0], vec![0]);
  }

  #[test]
  fn empty_clusters_never_appear() {
    // k allows indices 0..3 but nothing was assigned to cluster 1.
    let clustered = vec![member(0, 0.5), member(2, 0.5)];
    let ranked = rank_clusters(&clustered, 3, 0, 3);
    assert_eq!(ranked.len(), 2);
  }

  #[test]
  fn mean_distances_are_nondecreasing_along_output() {
    let clustered = vec![
      member(0, 9.0),
      member(0, 9.0),
      member(1, 0.5),
      member(1, 0.7),
      member(2, 3.0),
      member(2, 3.2),
    ];
    let ranked = rank_clusters(&clustered, 3, 2, 3);
    let means: Vec<f64> = ranked
      .iter()
      .map(|members| {
        members.iter().map(|&i| clustered[i].distance).sum::<f64>() / members.len() as f64
      })
      .collect();
    assert!(means.windows(2).all(|w| w[0] <= w[1]));
  }
}
