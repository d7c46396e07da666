//! Cross-encoder sidecar reranker
//!
//! Posts `{"pairs": [[query, text], ...]}` and reads `{"scores": [...]}`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::config::RerankerConfig;
use crate::error::{Error, Result};
use crate::transport::ResilientClient;
use crate::types::RerankPair;

use super::reranker::Reranker;

#[derive(Serialize)]
struct RerankRequest<'a> {
    pairs: &'a [RerankPair],
}

/// HTTP cross-encoder reranker
pub struct CrossEncoderReranker {
    http: ResilientClient,
    url: String,
}

impl CrossEncoderReranker {
    pub fn new(http: ResilientClient, config: &RerankerConfig) -> Self {
        Self {
            http,
            url: config.url.clone(),
        }
    }
}

#[async_trait]
impl Reranker for CrossEncoderReranker {
    async fn rerank(&self, pairs: &[RerankPair]) -> Result<Vec<f64>> {
        let reply = self
            .http
            .post_json(&self.url, &RerankRequest { pairs })
            .await?;
        decode_scores(&reply)
    }

    fn name(&self) -> &str {
        "crossencoder"
    }
}

/// `scores` list of a rerank reply. A missing list is empty; the caller
/// pads it from stored scores.
pub fn decode_scores(reply: &Value) -> Result<Vec<f64>> {
    let scores = match reply.get("scores") {
        Some(Value::Array(scores)) => scores,
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(other) => {
            return Err(Error::unrecognized_shape(
                "rerank",
                format!("'scores' is not a list: {}", other),
            ))
        }
    };

    scores
        .iter()
        .enumerate()
        .map(|(i, s)| {
            s.as_f64().ok_or_else(|| {
                Error::unrecognized_shape("rerank", format!("score {} is not a number: {}", i, s))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_scores() {
        let scores = decode_scores(&json!({"scores": [0.1, 2, -3.5]})).unwrap();
        assert_eq!(scores, vec![0.1, 2.0, -3.5]);
    }

    #[test]
    fn close_scores_stay_distinct() {
        let scores = decode_scores(&json!({"scores": [0.300000001, 0.300000002]})).unwrap();
        assert_eq!(scores, vec![0.300000001, 0.300000002]);
        assert!(scores[1] > scores[0]);
    }

    #[test]
    fn missing_scores_is_empty() {
        assert!(decode_scores(&json!({})).unwrap().is_empty());
        assert!(decode_scores(&json!({"scores": null})).unwrap().is_empty());
    }

    #[test]
    fn non_numeric_scores_are_rejected() {
        assert!(matches!(
            decode_scores(&json!({"scores": [0.1, "high"]})),
            Err(Error::UnrecognizedShape { service: "rerank", .. })
        ));
        assert!(decode_scores(&json!({"scores": "0.1"})).is_err());
    }

    #[test]
    fn request_serializes_pairs_as_arrays() {
        let pairs = vec![RerankPair::new("q", "doc one"), RerankPair::new("q", "")];
        let body = serde_json::to_value(RerankRequest { pairs: &pairs }).unwrap();
        assert_eq!(body, json!({"pairs": [["q", "doc one"], ["q", ""]]}));
    }
}
