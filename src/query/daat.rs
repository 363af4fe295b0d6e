//! Document-at-a-time query processing: disjunctive ("OR", score every
//! document any term touches) and conjunctive ("AND", score only documents
//! every term touches).
//!
//! Grounded in `examples/original_source/src/index/Index.template.hpp`'s
//! `Index<LVT>::query`. Conjunctive mode implements SPEC_FULL.md §9's fix —
//! jump straight to `max(current docids)` each round rather than
//! single-stepping, avoiding an O(|D|) scan per candidate.

use crate::postings::{PostingList, SigmaPostingList};
use crate::query::TopK;
use crate::scorer::Scorer;
use crate::types::{DocId, DocLen, DOCID_MAX};

/// Score every document touched by at least one helper, keeping the
/// `top_k` highest-scoring. `helpers` must already be positioned at their
/// first posting `>= min_docid`.
pub fn disjunctive<'a>(
    mut helpers: Vec<SigmaPostingList<'a>>,
    min_docid: DocId,
    scorer: &Scorer,
    top_k: usize,
    doclen: impl Fn(DocId) -> DocLen,
    avgdl: f64,
) -> Vec<(DocId, f64)> {
    let mut results = TopK::new(top_k);
    let mut curr_docid = min_docid;

    while !helpers.is_empty() {
        let dl = if scorer.needs_doc_metadata() { doclen(curr_docid) } else { 0 };
        let mut score = 0.0;
        for h in helpers.iter() {
            if h.current().map(|(d, _)| d) == Some(curr_docid) {
                score += h.score(scorer, dl, avgdl);
            }
        }
        results.offer(curr_docid, score);

        let mut next_docid = DOCID_MAX;
        helpers.retain_mut(|h| {
            h.next_g(curr_docid);
            match h.current() {
                Some((d, _)) => {
                    next_docid = next_docid.min(d);
                    true
                }
                None => false,
            }
        });
        curr_docid = next_docid;
    }

    results.into_sorted_vec()
}

/// Score only documents every helper currently sits on, advancing lagging
/// helpers to the maximum current docid on every round instead of one step
/// at a time.
pub fn conjunctive<'a>(
    mut helpers: Vec<SigmaPostingList<'a>>,
    min_docid: DocId,
    scorer: &Scorer,
    top_k: usize,
    doclen: impl Fn(DocId) -> DocLen,
    avgdl: f64,
) -> Vec<(DocId, f64)> {
    let mut results = TopK::new(top_k);
    let mut curr_docid = min_docid;

    while !helpers.is_empty() {
        for h in helpers.iter_mut() {
            h.next_geq(curr_docid);
        }
        // Any helper running out means no further document can satisfy
        // every term — conjunctive semantics end the instant one list is
        // exhausted, they never degenerate into the remaining lists' AND.
        if helpers.iter().any(|h| h.is_end()) {
            break;
        }

        let max_docid = helpers
            .iter()
            .filter_map(|h| h.current().map(|(d, _)| d))
            .max()
            .expect("helpers is non-empty");

        let all_aligned = helpers.iter().all(|h| h.current().map(|(d, _)| d) == Some(max_docid));

        if all_aligned {
            let dl = if scorer.needs_doc_metadata() { doclen(max_docid) } else { 0 };
            let score: f64 = helpers.iter().map(|h| h.score(scorer, dl, avgdl)).sum();
            results.offer(max_docid, score);
            curr_docid = max_docid + 1;
        } else {
            curr_docid = max_docid;
        }
    }

    results.into_sorted_vec()
}
