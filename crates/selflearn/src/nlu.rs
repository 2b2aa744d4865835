//! Client for the external NLU segmentation/keyword service.
//!
//! Questions go out in fixed-size batches; every response item comes
//! back with segment tokens and keyword tokens, both filtered against
//! the stop-word list before anything downstream sees them. A failed
//! batch is logged and dropped; the run continues with whatever the
//! remaining batches produced.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Questions sent per NLU request.
pub const NLU_BATCH_SIZE: usize = 20;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct NluRequest<'a> {
  queries: &'a [String],
  flags: &'static str,
  time: &'static str,
  appid: &'static str,
}

#[derive(Deserialize)]
struct NluItem {
  query: String,
  #[serde(default)]
  segment: Vec<NluWord>,
  #[serde(default)]
  keyword: Vec<NluWord>,
}

#[derive(Deserialize)]
struct NluWord {
  word: String,
}

/// A question enriched with its segmentation and keywords.
#[derive(Debug, Clone)]
pub struct AnalyzedQuestion {
  pub feedback_id: i64,
  pub question: String,
  pub tokens: Vec<String>,
  pub keywords: Vec<String>,
}

pub struct NluClient {
  client: reqwest::Client,
  url: String,
}

impl NluClient {
  pub fn new(url: &str) -> Self {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
      .build()
      .expect("Failed to create HTTP client");
    Self { client, url: url.to_string() }
  }

  /// Segment and keyword-tag a set of questions.
  ///
  /// Items whose tokens or keywords empty out after stop-word
  /// filtering are skipped, as are whole batches whose request fails;
  /// the returned set can therefore be smaller than the input.
  pub async fn analyze(
    &self,
    questions: &[(i64, String)],
    stop_words: &HashSet<String>,
  ) -> Vec<AnalyzedQuestion> {
    let mut analyzed = Vec::with_capacity(questions.len());
    for batch in questions.chunks(NLU_BATCH_SIZE) {
      match self.analyze_batch(batch).await {
        Ok(items) => collect_batch(batch, items, stop_words, &mut analyzed),
        Err(e) => {
          warn!("NLU batch of {} questions dropped: {e}", batch.len());
        }
      }
    }
    analyzed
  }

  async fn analyze_batch(&self, batch: &[(i64, String)]) -> anyhow::Result<Vec<NluItem>> {
    let queries: Vec<String> = batch.iter().map(|(_, q)| q.clone()).collect();
    let request =
      NluRequest { queries: &queries, flags: "segment,keyword", time: "false", appid: "0" };

    let response = self.client.post(&self.url).json(&request).send().await?;
    if !response.status().is_success() {
      anyhow::bail!("NLU service returned {}", response.status());
    }
    Ok(response.json().await?)
  }
}

/// Filter one batch's response items and append the survivors.
fn collect_batch(
  batch: &[(i64, String)],
  items: Vec<NluItem>,
  stop_words: &HashSet<String>,
  out: &mut Vec<AnalyzedQuestion>,
) {
  let ids: HashMap<&str, i64> = batch.iter().map(|(id, q)| (q.as_str(), *id)).collect();

  for item in items {
    let tokens = filter_words(&item.segment, stop_words);
    let keywords = filter_words(&item.keyword, stop_words);
    if tokens.is_empty() || keywords.is_empty() {
      continue;
    }
    let Some(&feedback_id) = ids.get(item.query.as_str()) else {
      warn!("NLU answered for unknown query: {}", item.query);
      continue;
    };
    out.push(AnalyzedQuestion { feedback_id, question: item.query, tokens, keywords });
  }
}

fn filter_words(words: &[NluWord], stop_words: &HashSet<String>) -> Vec<String> {
  words
    .iter()
    .filter(|w| !w.word.is_empty() && !stop_words.contains(&w.word))
    .map(|w| w.word.clone())
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn words(list: &[&str]) -> Vec<NluWord> {
    list.iter().map(|w| NluWord { word: w.to_string() }).collect()
  }

  fn stops(list: &[&str]) -> HashSet<String> {
    list.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn stop_words_and_empties_are_filtered() {
    let filtered = filter_words(&words(&["where", "is", "my", "order", ""]), &stops(&["is", "my"]));
    assert_eq!(filtered, vec!["where", "order"]);
  }

  #[test]
  fn items_with_emptied_lists_are_skipped() {
    let batch = vec![(1, "is my".to_string()), (2, "track order".to_string())];
    let items = vec![
      NluItem { query: "is my".into(), segment: words(&["is", "my"]), keyword: words(&["is"]) },
      NluItem {
        query: "track order".into(),
        segment: words(&["track", "order"]),
        keyword: words(&["order"]),
      },
    ];
    let mut out = Vec::new();
    collect_batch(&batch, items, &stops(&["is", "my"]), &mut out);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].feedback_id, 2);
    assert_eq!(out[0].keywords, vec!["order"]);
  }

  #[test]
  fn unknown_queries_are_dropped() {
    let batch = vec![(1, "known".to_string())];
    let items = vec![NluItem {
      query: "unknown".into(),
      segment: words(&["unknown"]),
      keyword: words(&["unknown"]),
    }];
    let mut out = Vec::new();
    collect_batch(&batch, items, &HashSet::new(), &mut out);
    assert!(out.is_empty());
  }

  #[test]
  fn request_body_matches_the_wire_contract() {
    let queries = vec!["a".to_string(), "b".to_string()];
    let request =
      NluRequest { queries: &queries, flags: "segment,keyword", time: "false", appid: "0" };
    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(
      json,
      serde_json::json!({
        "queries": ["a", "b"],
        "flags": "segment,keyword",
        "time": "false",
        "appid": "0"
      })
    );
  }
}
