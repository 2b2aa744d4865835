//! NLU client tests against a mocked segmentation service.

use std::collections::HashSet;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use selflearn::nlu::NluClient;

fn stops(list: &[&str]) -> HashSet<String> {
  list.iter().map(|s| s.to_string()).collect()
}

fn word_list(words: &[&str]) -> Vec<serde_json::Value> {
  words.iter().map(|w| json!({ "word": w })).collect()
}

#[tokio::test]
async fn responses_are_parsed_and_stop_words_filtered() {
  let mock = MockServer::start().await;
  Mock::given(method("POST"))
    .and(body_partial_json(json!({ "flags": "segment,keyword" })))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([
      {
        "query": "where is my refund",
        "segment": word_list(&["where", "is", "my", "refund"]),
        "keyword": word_list(&["refund"])
      }
    ])))
    .mount(&mock)
    .await;

  let client = NluClient::new(&mock.uri());
  let questions = vec![(7, "where is my refund".to_string())];
  let analyzed = client.analyze(&questions, &stops(&["is", "my"])).await;

  assert_eq!(analyzed.len(), 1);
  assert_eq!(analyzed[0].feedback_id, 7);
  assert_eq!(analyzed[0].tokens, vec!["where", "refund"]);
  assert_eq!(analyzed[0].keywords, vec!["refund"]);
}

#[tokio::test]
async fn failing_service_drops_the_batch() {
  let mock = MockServer::start().await;
  Mock::given(method("POST")).respond_with(ResponseTemplate::new(500)).mount(&mock).await;

  let client = NluClient::new(&mock.uri());
  let questions = vec![(1, "order status".to_string()), (2, "late delivery".to_string())];
  let analyzed = client.analyze(&questions, &HashSet::new()).await;

  assert!(analyzed.is_empty());
}

#[tokio::test]
async fn items_emptied_by_filtering_are_skipped() {
  let mock = MockServer::start().await;
  Mock::given(method("POST"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([
      {
        "query": "is my",
        "segment": word_list(&["is", "my"]),
        "keyword": word_list(&["is"])
      },
      {
        "query": "track order",
        "segment": word_list(&["track", "order"]),
        "keyword": word_list(&["order"])
      }
    ])))
    .mount(&mock)
    .await;

  let client = NluClient::new(&mock.uri());
  let questions = vec![(1, "is my".to_string()), (2, "track order".to_string())];
  let analyzed = client.analyze(&questions, &stops(&["is", "my"])).await;

  assert_eq!(analyzed.len(), 1);
  assert_eq!(analyzed[0].feedback_id, 2);
}

#[tokio::test]
async fn missing_segment_field_defaults_to_empty_and_skips_the_item() {
  let mock = MockServer::start().await;
  Mock::given(method("POST"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([
      { "query": "hello", "keyword": word_list(&["hello"]) }
    ])))
    .mount(&mock)
    .await;

  let client = NluClient::new(&mock.uri());
  let questions = vec![(1, "hello".to_string())];
  let analyzed = client.analyze(&questions, &HashSet::new()).await;

  assert!(analyzed.is_empty());
}
