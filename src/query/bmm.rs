//! Block-Max MaxScore (BMM): a dynamic-pruning DAAT variant that skips
//! whole blocks of non-essential posting lists once the running top-k
//! threshold θ makes them provably unable to change the result set.
//!
//! Has no counterpart in `examples/original_source/` (the C++ original only
//! implements plain DAAT) — specified directly by SPEC_FULL.md §4.7 /
//! spec.md §4.7, which this module implements verbatim: σ-sorted essential
//! lists, a prefix-sum pivot, and per-block upper-bound pruning within the
//! non-essential prefix.

use crate::postings::{PostingList, SigmaPostingList};
use crate::query::TopK;
use crate::scorer::Scorer;
use crate::types::{DocId, DocLen, DOCID_MAX};

/// Run Block-Max MaxScore over `helpers`, returning up to `top_k`
/// `(docid, score)` pairs. For any fixed query and top-k, the resulting set
/// equals [`super::daat::disjunctive`]'s (BMM only prunes work, it never
/// changes which documents qualify).
pub fn run<'a>(
    mut helpers: Vec<SigmaPostingList<'a>>,
    min_docid: DocId,
    scorer: &Scorer,
    top_k: usize,
    doclen: impl Fn(DocId) -> DocLen,
    avgdl: f64,
) -> Vec<(DocId, f64)> {
    if helpers.is_empty() {
        return Vec::new();
    }

    // Sort ascending by global σ: index 0 contributes the least to any
    // score, so it is the first candidate for pruning out of the essential
    // set as θ rises.
    helpers.sort_by(|a, b| {
        a.global_sigma(scorer)
            .partial_cmp(&b.global_sigma(scorer))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut upper_bounds: Vec<f64> = Vec::with_capacity(helpers.len());
    let mut running = 0.0;
    for h in &helpers {
        running += h.global_sigma(scorer);
        upper_bounds.push(running);
    }

    let mut results = TopK::new(top_k);
    let mut pivot = 0usize;
    let mut curr_docid = min_docid;

    while pivot < helpers.len() && !helpers.is_empty() {
        let dl = if scorer.needs_doc_metadata() { doclen(curr_docid) } else { 0 };
        let mut score = 0.0;
        let mut next = DOCID_MAX;

        // Essential lists: [pivot, len) must always be scored in full.
        for h in helpers[pivot..].iter_mut() {
            if h.current().map(|(d, _)| d) == Some(curr_docid) {
                score += h.score(scorer, dl, avgdl);
                h.next();
            }
            if let Some((d, _)) = h.current() {
                next = next.min(d);
            }
        }

        let theta = results.threshold();
        if pivot != 0 && score + upper_bounds[pivot - 1] > theta {
            // Per-block upper-bound prefix sums over the non-essential
            // prefix [0, pivot), built fresh each round since each list's
            // current block can have advanced since the last one.
            let mut block_ub = vec![0.0; pivot];
            block_ub[0] = helpers[0].block_ub(scorer);
            for i in 1..pivot {
                block_ub[i] = block_ub[i - 1] + helpers[i].block_ub(scorer);
            }

            for j in 0..pivot {
                let i = pivot - j - 1;
                if score + block_ub[i] <= theta {
                    break;
                }
                helpers[i].next_geq(curr_docid);
                if !helpers[i].is_end() && helpers[i].current().map(|(d, _)| d) == Some(curr_docid) {
                    score += helpers[i].score(scorer, dl, avgdl);
                }
            }
        }

        if !results.is_full() || score > results.threshold() {
            results.offer(curr_docid, score);
            let theta = results.threshold();
            while pivot < helpers.len() && upper_bounds[pivot] <= theta {
                pivot += 1;
            }
        }

        let mut i = 0;
        while i < helpers.len() {
            if helpers[i].is_end() {
                helpers.remove(i);
                if i < pivot {
                    pivot -= 1;
                }
            } else {
                i += 1;
            }
        }

        curr_docid = next;
    }

    results.into_sorted_vec()
}
