//! Rerank pairing, score merging and top-N selection

use std::cmp::Ordering;

use crate::types::{RankedDoc, RerankPair, VectorRecord};

/// One (query, candidate text) pair per record, in record order
pub fn build_pairs(query_text: &str, records: &[VectorRecord]) -> Vec<RerankPair> {
    records
        .iter()
        .map(|record| RerankPair::new(query_text, record.text()))
        .collect()
}

/// Stored vector-store scores, `0.0` where absent
pub fn fallback_scores(records: &[VectorRecord]) -> Vec<f64> {
    records.iter().map(VectorRecord::fallback_score).collect()
}

/// Attach `scores[i]` to `records[i]`. A record without a score at its
/// position keeps its stored score.
pub fn merge_scores(records: Vec<VectorRecord>, scores: &[f64]) -> Vec<RankedDoc> {
    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            let rerank = scores
                .get(i)
                .copied()
                .unwrap_or_else(|| record.fallback_score());
            RankedDoc {
                id: record.id,
                rerank,
                payload: record.payload,
            }
        })
        .collect()
}

/// Sort by score, best first, keeping search order among equal scores,
/// then keep at most `top_n`.
pub fn rank_top_n(mut docs: Vec<RankedDoc>, top_n: usize) -> Vec<RankedDoc> {
    // sort_by is stable
    docs.sort_by(|a, b| descending(a.rerank, b.rerank));
    docs.truncate(top_n);
    docs
}

/// NaN sorts after every real score
fn descending(a: f64, b: f64) -> Ordering {
    sort_key(b).total_cmp(&sort_key(a))
}

fn sort_key(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, score: Option<f64>) -> VectorRecord {
        let mut point = json!({"id": id, "payload": {"text": format!("text of {}", id)}});
        if let Some(score) = score {
            point["score"] = json!(score);
        }
        VectorRecord::from_point(0, &point)
    }

    fn ids(docs: &[RankedDoc]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn pairs_follow_candidate_order() {
        let mut untexted = record("c", None);
        untexted.payload.clear();
        let records = vec![record("a", None), record("b", None), untexted];

        let pairs = build_pairs("Original: q\nExpanded: e", &records);
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].query(), "Original: q\nExpanded: e");
        assert_eq!(pairs[1].candidate(), "text of b");
        assert_eq!(pairs[2].candidate(), "");
    }

    #[test]
    fn rerank_scores_decide_order() {
        let records = vec![
            record("a", Some(0.2)),
            record("b", Some(0.9)),
            record("c", Some(0.5)),
        ];
        let top = rank_top_n(merge_scores(records, &[0.1, 0.8, 0.95]), 2);

        assert_eq!(ids(&top), vec!["c", "b"]);
        assert_eq!(top[0].rerank, 0.95);
        assert_eq!(top[1].rerank, 0.8);
    }

    #[test]
    fn ties_keep_search_order() {
        let records = vec![
            record("a", None),
            record("b", None),
            record("c", None),
            record("d", None),
        ];
        let top = rank_top_n(merge_scores(records, &[0.5, 0.7, 0.5, 0.7]), 4);
        assert_eq!(ids(&top), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn short_score_list_pads_from_stored_scores() {
        let records = vec![record("a", Some(0.3)), record("b", Some(0.6)), record("c", None)];
        let docs = merge_scores(records, &[2.0]);
        let scores: Vec<f64> = docs.iter().map(|d| d.rerank).collect();
        assert_eq!(scores, vec![2.0, 0.6, 0.0]);
    }

    #[test]
    fn fallback_uses_stored_scores_positionally() {
        let records = vec![record("a", Some(0.2)), record("b", None), record("c", Some(0.5))];
        assert_eq!(fallback_scores(&records), vec![0.2, 0.0, 0.5]);
    }

    #[test]
    fn length_is_min_of_top_n_and_candidates() {
        for candidates in 0..5 {
            for top_n in 1..6 {
                let records: Vec<_> = (0..candidates)
                    .map(|i| record(&i.to_string(), Some(i as f64)))
                    .collect();
                let scores = fallback_scores(&records);
                let top = rank_top_n(merge_scores(records, &scores), top_n);
                assert_eq!(top.len(), top_n.min(candidates));
            }
        }
    }

    #[test]
    fn nearly_equal_scores_keep_their_order() {
        let records = vec![record("a", None), record("b", None)];
        let top = rank_top_n(merge_scores(records, &[0.300000001, 0.300000002]), 2);
        assert_eq!(ids(&top), vec!["b", "a"]);
    }

    #[test]
    fn nan_scores_sort_last() {
        let records = vec![record("a", None), record("b", None), record("c", None)];
        let top = rank_top_n(merge_scores(records, &[f64::NAN, -3.0, 1.0]), 3);
        assert_eq!(ids(&top), vec!["c", "b", "a"]);
    }
}
