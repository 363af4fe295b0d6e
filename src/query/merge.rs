//! Multi-shard result merge: concatenate each shard's already-truncated
//! top-k, sort descending by score, truncate to the global top-k, and
//! format as TREC-style output lines.
//!
//! Grounded in spec.md §4.7's "Multi-shard merge" paragraph; the original
//! C++ engine is single-shard (`engine.cpp`), so shard fan-out/merge has no
//! direct original_source/ counterpart and follows spec.md directly.

use std::cmp::Ordering;

use crate::types::ScoredDoc;

/// Merge every shard's result vector into one descending-by-score list,
/// truncated to `top_k`.
pub fn merge_shards(per_shard: Vec<Vec<ScoredDoc>>, top_k: usize) -> Vec<ScoredDoc> {
    let mut all: Vec<ScoredDoc> = per_shard.into_iter().flatten().collect();
    all.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    all.truncate(top_k);
    all
}

/// Format one result as a TREC-style output line:
/// `<q_id> Q0 <docno> <rank> <score> <run_name>`.
pub fn format_trec_line(q_id: &str, rank: usize, doc: &ScoredDoc, run_name: &str) -> String {
    format!("{} Q0 {} {} {} {}", q_id, doc.docno, rank, doc.score, run_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sd(docno: &str, score: f64) -> ScoredDoc {
        ScoredDoc { docno: docno.to_string(), score }
    }

    #[test]
    fn merges_and_sorts_descending_then_truncates() {
        let shard_a = vec![sd("a", 3.0), sd("b", 1.0)];
        let shard_b = vec![sd("c", 5.0), sd("d", 2.0)];

        let merged = merge_shards(vec![shard_a, shard_b], 3);
        let docnos: Vec<&str> = merged.iter().map(|d| d.docno.as_str()).collect();
        assert_eq!(docnos, vec!["c", "a", "d"]);
    }

    #[test]
    fn formats_one_based_rank_as_trec_line() {
        let doc = sd("caffe", 1.2345);
        let line = format_trec_line("q1", 1, &doc, "MIRCV0");
        assert_eq!(line, "q1 Q0 caffe 1 1.2345 MIRCV0");
    }
}
