//! Representative-tag extraction for clusters.
//!
//! Given the pooled keyword tokens of a cluster, rank candidates by
//! relative frequency and keep the top N. The orchestrator treats this
//! as a black box returning ranked `(text, weight)` pairs, so the
//! ranking function can be swapped for something smarter (TF-IDF over
//! a corpus, say) without touching the pipeline.

use std::collections::HashMap;

/// Rank `words` by relative frequency, descending, ties broken
/// lexicographically, truncated to `top_n` pairs.
pub fn extract_tags(words: &[String], top_n: usize) -> Vec<(String, f64)> {
  if words.is_empty() || top_n == 0 {
    return Vec::new();
  }

  let mut counts: HashMap<&str, usize> = HashMap::new();
  for word in words {
    *counts.entry(word.as_str()).or_default() += 1;
  }

  let total = words.len() as f64;
  let mut ranked: Vec<(String, f64)> =
    counts.into_iter().map(|(word, count)| (word.to_string(), count as f64 / total)).collect();
  ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
  ranked.truncate(top_n);
  ranked
}
