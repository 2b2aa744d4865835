//! Self-learning feedback clustering service.
//!
//! Pulls unresolved user questions from a time window, embeds them via
//! an external NLU segmentation service plus a local word-vector
//! table, groups the embeddings with k-means++, ranks the clusters by
//! cohesion, extracts representative tags, and persists everything
//! under a report row that callers poll for status.

pub mod config;
pub mod nlu;
pub mod pipeline;
pub mod server;
pub mod store;
pub mod tags;
pub mod types;
pub mod wordvec;
pub mod worker;
