//! Word-vector table and sentence embedding.
//!
//! The table is loaded once at startup from the resources directory
//! and treated as read-only for the process lifetime, so concurrent
//! runs can share it freely. Two files are expected:
//!
//! - `vectors.txt`, word2vec text format: a `count dimension` header
//!   line, then one `word v1 .. vdim` line per word.
//! - `stopwords.txt`, one token per line.
//!
//! Unknown tokens contribute nothing to a sentence vector; instead of
//! inventing values for them, each embedding carries a coverage ratio
//! (tokens found / tokens total) so low-coverage runs are visible in
//! the logs.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use kmeans::vector::{add, scale, Vector};
use tracing::warn;

const VECTORS_FILE: &str = "vectors.txt";
const STOPWORDS_FILE: &str = "stopwords.txt";

/// Weight of the full-segmentation embedding in the final blend.
const TOKEN_WEIGHT: f64 = 0.8;
/// Weight of the keyword embedding in the final blend.
const KEYWORD_WEIGHT: f64 = 0.2;

pub struct WordVectors {
  vectors: HashMap<String, Vector>,
  stop_words: HashSet<String>,
  dimension: usize,
}

impl WordVectors {
  /// Load the vector table and stop-word list from `resources`.
  pub fn load(resources: &Path) -> Result<Self> {
    let vectors_path = resources.join(VECTORS_FILE);
    let raw = fs::read_to_string(&vectors_path)
      .with_context(|| format!("cannot read word vectors from {vectors_path:?}"))?;
    let (vectors, dimension) = parse_vectors(&raw)?;

    let stopwords_path = resources.join(STOPWORDS_FILE);
    let raw = fs::read_to_string(&stopwords_path)
      .with_context(|| format!("cannot read stop words from {stopwords_path:?}"))?;
    let stop_words = raw.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect();

    Ok(Self { vectors, stop_words, dimension })
  }

  /// An empty table, for tests that never touch the embedding stage.
  #[cfg(test)]
  pub(crate) fn empty_for_tests() -> Self {
    Self { vectors: HashMap::new(), stop_words: HashSet::new(), dimension: 0 }
  }

  pub fn dimension(&self) -> usize {
    self.dimension
  }

  pub fn stop_words(&self) -> &HashSet<String> {
    &self.stop_words
  }

  pub fn get(&self, word: &str) -> Option<&Vector> {
    self.vectors.get(word)
  }

  /// Blend segmentation tokens and keywords into one sentence vector.
  ///
  /// The token embedding dominates (0.8) with the keyword embedding as
  /// a corrective (0.2); when no keyword is known the token embedding
  /// stands alone. Returns `None` when no token is known at all; the
  /// caller decides what a dead sentence means. The second element is
  /// the token coverage ratio.
  pub fn sentence_vector(&self, tokens: &[String], keywords: &[String]) -> Option<(Vector, f64)> {
    let (token_vec, found) = self.mean_of_known(tokens);
    let coverage = if tokens.is_empty() { 0.0 } else { found as f64 / tokens.len() as f64 };

    let token_vec = token_vec?;
    let (keyword_vec, _) = self.mean_of_known(keywords);

    let blended = match keyword_vec {
      Some(mut kw) => {
        let mut out = token_vec;
        scale(&mut out, TOKEN_WEIGHT);
        scale(&mut kw, KEYWORD_WEIGHT);
        add(&mut out, &kw);
        out
      }
      None => token_vec,
    };
    Some((blended, coverage))
  }

  /// Mean of the vectors known for `words`, plus how many were known.
  fn mean_of_known(&self, words: &[String]) -> (Option<Vector>, usize) {
    let mut sum = vec![0.0; self.dimension];
    let mut found = 0;
    for word in words {
      if let Some(vector) = self.vectors.get(word) {
        add(&mut sum, vector);
        found += 1;
      }
    }
    if found == 0 {
      return (None, 0);
    }
    scale(&mut sum, 1.0 / found as f64);
    (Some(sum), found)
  }
}

/// Parse the word2vec text format; vectors are L2-normalized on load.
fn parse_vectors(raw: &str) -> Result<(HashMap<String, Vector>, usize)> {
  let mut lines = raw.lines();
  let header = lines.next().ok_or_else(|| anyhow!("empty word-vector file"))?;
  let mut parts = header.split_whitespace();
  let count: usize = parts
    .next()
    .and_then(|p| p.parse().ok())
    .ok_or_else(|| anyhow!("malformed word-vector header: {header:?}"))?;
  let dimension: usize = parts
    .next()
    .and_then(|p| p.parse().ok())
    .ok_or_else(|| anyhow!("malformed word-vector header: {header:?}"))?;
  if dimension == 0 {
    return Err(anyhow!("word-vector dimension must be positive"));
  }

  let mut vectors = HashMap::with_capacity(count);
  for line in lines {
    if line.trim().is_empty() {
      continue;
    }
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else { continue };
    let values: Vec<f64> = parts.filter_map(|p| p.parse().ok()).collect();
    if values.len() != dimension {
      warn!("skipping malformed vector line for {word:?}: {} of {dimension} components", values.len());
      continue;
    }
    vectors.insert(word.to_string(), normalized(values));
  }

  if vectors.is_empty() {
    return Err(anyhow!("word-vector file contains no usable vectors"));
  }
  Ok((vectors, dimension))
}

fn normalized(mut v: Vector) -> Vector {
  let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
  if norm > 0.0 {
    scale(&mut v, 1.0 / norm);
  }
  v
}
