//! Posting-list primitive: paired docid/freq decoder streams exposing
//! `next`, `next_g`, `next_geq`, `score` and, for σ-augmented lexicon
//! values, skip-list-driven block jumps.
//!
//! Two concrete types share one trait rather than a single generic/
//! runtime-flagged type, per SPEC_FULL.md's "Generics over LexiconValue"
//! design note. Grounded in
//! `examples/original_source/src/index/Index.template.hpp`.

use crate::codec::unary::{self, UnaryDecoder};
use crate::codec::varbyte::VarByteDecoder;
use crate::scorer::Scorer;
use crate::types::{DocId, DocLen, Freq, Score, SkipPointer};

/// Shared behavior over a term's postings. `offset()` returns the
/// `(docid_byte_offset, packed_freq_bit_offset)` of the *current* posting,
/// relative to this term's own sub-streams — exactly what the σ pass
/// records into a [`SkipPointer`].
pub trait PostingList {
    fn current(&self) -> Option<(DocId, Freq)>;
    fn next(&mut self);
    fn offset(&self) -> (u64, u64);
    fn idf(&self) -> Score;

    fn is_end(&self) -> bool {
        self.current().is_none()
    }

    /// Advance while `docid <= d`.
    fn next_g(&mut self, d: DocId) {
        while let Some((docid, _)) = self.current() {
            if docid <= d {
                self.next();
            } else {
                break;
            }
        }
    }

    /// Advance while `docid < d`.
    fn next_geq(&mut self, d: DocId) {
        while let Some((docid, _)) = self.current() {
            if docid < d {
                self.next();
            } else {
                break;
            }
        }
    }

    fn score(&self, scorer: &Scorer, doclen: DocLen, avgdl: f64) -> Score {
        match self.current() {
            Some((_, freq)) => scorer.score(freq, self.idf(), doclen, avgdl),
            None => 0.0,
        }
    }
}

/// A posting list over a plain [`crate::types::LexiconValue`] — no skip
/// list, every `next_geq` call is a linear scan.
pub struct PlainPostingList<'a> {
    docid_bytes: &'a [u8],
    freq_bytes: &'a [u8],
    docid_dec: VarByteDecoder<'a>,
    freq_dec: UnaryDecoder<'a>,
    current: Option<(DocId, Freq)>,
    offset_docid: u64,
    offset_freq: u64,
    idf: Score,
}

impl<'a> PlainPostingList<'a> {
    pub fn new(docid_bytes: &'a [u8], freq_bytes: &'a [u8], idf: Score) -> Self {
        let mut pl = PlainPostingList {
            docid_bytes,
            freq_bytes,
            docid_dec: VarByteDecoder::new(docid_bytes),
            freq_dec: UnaryDecoder::new(freq_bytes),
            current: None,
            offset_docid: 0,
            offset_freq: 0,
            idf,
        };
        pl.next();
        pl
    }

    fn seek_to(&mut self, docid_offset: u64, freq_offset: u64) {
        self.docid_dec = VarByteDecoder::at(self.docid_bytes, docid_offset as usize);
        let (fb, fbit) = unary::deserialize_bit_offset(freq_offset);
        self.freq_dec = UnaryDecoder::at(self.freq_bytes, fb as usize, fbit);
        self.next();
    }
}

impl<'a> PostingList for PlainPostingList<'a> {
    fn current(&self) -> Option<(DocId, Freq)> {
        self.current
    }

    fn next(&mut self) {
        self.offset_docid = self.docid_dec.position() as u64;
        let (fb, fbit) = self.freq_dec.position();
        self.offset_freq = unary::serialize_bit_offset(fb as u64, fbit);

        self.current = match (self.docid_dec.next(), self.freq_dec.next()) {
            (Some(d), Some(f)) => Some((d, f)),
            _ => None,
        };
    }

    fn offset(&self) -> (u64, u64) {
        (self.offset_docid, self.offset_freq)
    }

    fn idf(&self) -> Score {
        self.idf
    }
}

/// A posting list over a [`crate::types::SigmaLexiconValue`] — wraps a
/// [`PlainPostingList`] and tracks which skip-list block the cursor is
/// currently within, enabling block-level jumps in `next_geq` and the
/// explicit `skip_block` used by Block-Max MaxScore.
pub struct SigmaPostingList<'a> {
    plain: PlainPostingList<'a>,
    skip_pointers: Vec<SkipPointer>,
    current_block: usize,
    bm25_sigma: Score,
    tfidf_sigma: Score,
}

impl<'a> SigmaPostingList<'a> {
    pub fn new(
        docid_bytes: &'a [u8],
        freq_bytes: &'a [u8],
        idf: Score,
        skip_pointers: Vec<SkipPointer>,
        bm25_sigma: Score,
        tfidf_sigma: Score,
    ) -> Self {
        SigmaPostingList {
            plain: PlainPostingList::new(docid_bytes, freq_bytes, idf),
            skip_pointers,
            current_block: 0,
            bm25_sigma,
            tfidf_sigma,
        }
    }

    pub fn skip_pointers(&self) -> &[SkipPointer] {
        &self.skip_pointers
    }

    /// `None` once the cursor has passed the last skip-recorded block — the
    /// trailing partial block (SPEC_FULL.md's resolution of the "trailing
    /// partial block" open question: option (b), no pointer emitted for it).
    pub fn current_block_ub(&self) -> Option<&SkipPointer> {
        self.skip_pointers.get(self.current_block)
    }

    /// This term's global score upper bound under `scorer`, used by BMM to
    /// order essential lists and compute the pivot prefix sums.
    pub fn global_sigma(&self, scorer: &Scorer) -> Score {
        match scorer {
            Scorer::Bm25 { .. } => self.bm25_sigma,
            Scorer::TfIdf => self.tfidf_sigma,
        }
    }

    /// The current block's score upper bound under `scorer`. Falls back to
    /// the term's global σ once the cursor has moved past the last
    /// skip-recorded block (the trailing partial block has no block-level
    /// bound, only the global one).
    pub fn block_ub(&self, scorer: &Scorer) -> Score {
        match self.current_block_ub() {
            Some(sp) => scorer.get_block_ub(sp),
            None => self.global_sigma(scorer),
        }
    }

    /// Advance past the current block boundary, reseeking directly to
    /// where the next block begins.
    pub fn skip_block(&mut self) {
        if let Some(sp) = self.skip_pointers.get(self.current_block).copied() {
            self.current_block += 1;
            self.plain.seek_to(sp.docid_offset, sp.freq_offset);
        }
    }
}

impl<'a> PostingList for SigmaPostingList<'a> {
    fn current(&self) -> Option<(DocId, Freq)> {
        self.plain.current()
    }

    fn next(&mut self) {
        self.plain.next();
        if let (Some(sp), Some((docid, _))) = (self.skip_pointers.get(self.current_block), self.plain.current())
        {
            if docid > sp.last_docid {
                self.current_block += 1;
            }
        }
    }

    fn offset(&self) -> (u64, u64) {
        self.plain.offset()
    }

    fn idf(&self) -> Score {
        self.plain.idf()
    }

    fn next_geq(&mut self, d: DocId) {
        while self.current_block < self.skip_pointers.len() && self.skip_pointers[self.current_block].last_docid < d
        {
            self.skip_block();
        }
        while let Some((docid, _)) = self.current() {
            if docid < d {
                self.next();
            } else {
                break;
            }
        }
    }
}
