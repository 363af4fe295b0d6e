//! Query-time scoring functions: BM25 and TF-IDF, closed over a single
//! `enum` rather than a trait object — the spec calls for a fixed, known set
//! of scoring functions, so dynamic dispatch buys nothing but an indirection.
//!
//! Grounded in `examples/original_source/src/index/query_scorer.hpp` /
//! `.cpp`, generalized from TF-IDF-only to the BM25/TF-IDF pair SPEC_FULL.md
//! calls for.

use crate::types::{DocLen, Freq, Score, SigmaLexiconValue, SkipPointer};

/// Default BM25 constants. Deliberately not the textbook `k1=1.2, b=0.75` —
/// tuned for this corpus's length distribution.
pub const DEFAULT_BM25_K1: f64 = 0.82;
pub const DEFAULT_BM25_B: f64 = 0.68;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scorer {
    Bm25 { k1: f64, b: f64 },
    TfIdf,
}

impl Default for Scorer {
    fn default() -> Self {
        Scorer::Bm25 {
            k1: DEFAULT_BM25_K1,
            b: DEFAULT_BM25_B,
        }
    }
}

impl Scorer {
    /// Inverse document frequency, shared by both scorers.
    pub fn idf(n_docs: u64, df_term: Freq) -> Score {
        (n_docs as Score / df_term as Score).log2()
    }

    pub fn needs_doc_metadata(&self) -> bool {
        matches!(self, Scorer::Bm25 { .. })
    }

    /// Score a single posting. `doclen`/`avgdl` are ignored for TF-IDF.
    pub fn score(&self, freq: Freq, idf: Score, doclen: DocLen, avgdl: f64) -> Score {
        if freq == 0 {
            return 0.0;
        }
        match self {
            Scorer::TfIdf => (1.0 + (freq as Score).log2()) * idf,
            Scorer::Bm25 { k1, b } => {
                let norm = k1 * ((1.0 - b) + b * (doclen as f64 / avgdl));
                (freq as Score / (norm + freq as Score)) * idf
            }
        }
    }

    /// This scorer's precomputed global upper bound for a term.
    pub fn get_sigma(&self, lv: &SigmaLexiconValue) -> Score {
        match self {
            Scorer::Bm25 { .. } => lv.bm25_sigma,
            Scorer::TfIdf => lv.tfidf_sigma,
        }
    }

    /// This scorer's precomputed per-block upper bound.
    pub fn get_block_ub(&self, skip: &SkipPointer) -> Score {
        match self {
            Scorer::Bm25 { .. } => skip.bm25_ub,
            Scorer::TfIdf => skip.tfidf_ub,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tfidf_zero_freq_scores_zero() {
        let s = Scorer::TfIdf;
        assert_eq!(s.score(0, 3.0, 0, 1.0), 0.0);
    }

    #[test]
    fn bm25_increases_with_frequency() {
        let s = Scorer::default();
        let low = s.score(1, 2.0, 100, 100.0);
        let high = s.score(10, 2.0, 100, 100.0);
        assert!(high > low);
    }

    #[test]
    fn bm25_penalizes_longer_documents() {
        let s = Scorer::default();
        let short_doc = s.score(3, 2.0, 50, 100.0);
        let long_doc = s.score(3, 2.0, 300, 100.0);
        assert!(short_doc > long_doc);
    }

    #[test]
    fn idf_is_zero_when_term_is_in_every_document() {
        assert_eq!(Scorer::idf(100, 100), 0.0);
    }
}
