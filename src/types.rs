//! Core value types shared across the disk-map, builder, index reader and
//! query engine: document identifiers, lexicon entries and the
//! [`DiskMapValue`] trait the disk-map is generic over.
//!
//! Grounded in `examples/original_source/src/index/types.hpp`.

use crate::codec::varbyte;

pub type DocId = u64;
pub type DocLen = u64;
pub type Freq = u64;
pub type Score = f64;

pub const DOCID_MAX: DocId = u64::MAX;

/// Fixed-point scale factor sigma values are stored at on disk. Matches the
/// original's `fixed_point_factor = 1e2`: two decimal digits of precision,
/// which is all BM25/TF-IDF upper bounds need for safe pruning.
pub const FIXED_POINT_FACTOR: f64 = 100.0;

pub fn score_to_fixed(score: Score) -> u64 {
    (score * FIXED_POINT_FACTOR) as u64
}

pub fn fixed_to_score(fixed: u64) -> Score {
    fixed as Score / FIXED_POINT_FACTOR
}

/// A value a disk-map can store, serialized as a sequence of `u64`s (the
/// disk-map itself VarByte-encodes each one).
///
/// `SERIALIZE_SIZE` mirrors the original's `serialize_size` constant: `Some(n)`
/// for a fixed-arity value (e.g. `LexiconValue`'s 5 fields), `None` for a
/// value whose arity depends on its contents (e.g. `SigmaLexiconValue`'s
/// skip list — the original marks this case with `serialize_size = 0` as a
/// sentinel). When `None`, the disk-map writer/reader prefixes the u64 array
/// with a VarByte-encoded count.
pub trait DiskMapValue: Sized {
    const SERIALIZE_SIZE: Option<usize>;

    fn serialize(&self) -> Vec<u64>;
    fn deserialize(values: &[u64]) -> Self;
}

impl DiskMapValue for u64 {
    const SERIALIZE_SIZE: Option<usize> = Some(1);

    fn serialize(&self) -> Vec<u64> {
        vec![*self]
    }

    fn deserialize(values: &[u64]) -> Self {
        values[0]
    }
}

/// Offsets into a shard's docid/freq streams plus the postings count for one
/// term, as stored in a shard's local lexicon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LexiconValue {
    pub start_pos_docid: u64,
    pub end_pos_docid: u64,
    pub start_pos_freq: u64,
    pub end_pos_freq: u64,
    pub n_docs: Freq,
}

impl DiskMapValue for LexiconValue {
    const SERIALIZE_SIZE: Option<usize> = Some(5);

    fn serialize(&self) -> Vec<u64> {
        vec![
            self.start_pos_docid,
            self.end_pos_docid,
            self.start_pos_freq,
            self.end_pos_freq,
            self.n_docs,
        ]
    }

    fn deserialize(values: &[u64]) -> Self {
        LexiconValue {
            start_pos_docid: values[0],
            end_pos_docid: values[1],
            start_pos_freq: values[2],
            end_pos_freq: values[3],
            n_docs: values[4],
        }
    }
}

/// One skip-list entry: per-block score upper bounds plus the cursor
/// (docid/stream offsets) needed to jump directly to the block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkipPointer {
    pub bm25_ub: Score,
    pub tfidf_ub: Score,
    pub last_docid: DocId,
    pub docid_offset: u64,
    pub freq_offset: u64,
}

/// A [`LexiconValue`] augmented with global BM25/TF-IDF score upper bounds
/// and a per-block skip list, as stored in the global (merged) lexicon.
#[derive(Debug, Clone, Default)]
pub struct SigmaLexiconValue {
    pub base: LexiconValue,
    pub bm25_sigma: Score,
    pub tfidf_sigma: Score,
    pub skip_pointers: Vec<SkipPointer>,
}

impl DiskMapValue for SigmaLexiconValue {
    const SERIALIZE_SIZE: Option<usize> = None;

    fn serialize(&self) -> Vec<u64> {
        let mut ser = Vec::with_capacity(7 + self.skip_pointers.len() * 5);
        ser.extend_from_slice(&self.base.serialize());
        ser.push(score_to_fixed(self.bm25_sigma));
        ser.push(score_to_fixed(self.tfidf_sigma));
        for sp in &self.skip_pointers {
            ser.push(score_to_fixed(sp.bm25_ub));
            ser.push(score_to_fixed(sp.tfidf_ub));
            ser.push(sp.last_docid);
            ser.push(sp.docid_offset);
            ser.push(sp.freq_offset);
        }
        ser
    }

    fn deserialize(values: &[u64]) -> Self {
        let base = LexiconValue::deserialize(&values[0..5]);
        let bm25_sigma = fixed_to_score(values[5]);
        let tfidf_sigma = fixed_to_score(values[6]);

        debug_assert_eq!((values.len() - 7) % 5, 0);
        let skip_pointers = values[7..]
            .chunks_exact(5)
            .map(|c| SkipPointer {
                bm25_ub: fixed_to_score(c[0]),
                tfidf_ub: fixed_to_score(c[1]),
                last_docid: c[2],
                docid_offset: c[3],
                freq_offset: c[4],
            })
            .collect();

        SigmaLexiconValue {
            base,
            bm25_sigma,
            tfidf_sigma,
            skip_pointers,
        }
    }
}

/// A document's length (for BM25's length normalization) and its offset into
/// the docno string heap, as stored in a shard's document index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentInfo {
    pub docno_offset: u64,
    pub length: DocLen,
}

/// One scored result, as returned by a query and formatted on output.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDoc {
    pub docno: String,
    pub score: Score,
}

/// Encode a sequence of `u64`s with a VarByte count prefix, for
/// variable-arity [`DiskMapValue`] implementors (`SERIALIZE_SIZE == None`).
pub fn encode_var_arity(values: &[u64]) -> Vec<u8> {
    let mut out = varbyte::encode(values.len() as u64);
    out.extend(varbyte::encode_all(values.iter().copied()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexicon_value_round_trips() {
        let lv = LexiconValue {
            start_pos_docid: 10,
            end_pos_docid: 20,
            start_pos_freq: 30,
            end_pos_freq: 40,
            n_docs: 5,
        };
        assert_eq!(LexiconValue::deserialize(&lv.serialize()), lv);
    }

    #[test]
    fn sigma_lexicon_value_round_trips_with_skip_list() {
        let slv = SigmaLexiconValue {
            base: LexiconValue {
                start_pos_docid: 1,
                end_pos_docid: 2,
                start_pos_freq: 3,
                end_pos_freq: 4,
                n_docs: 5,
            },
            bm25_sigma: 12.34,
            tfidf_sigma: 5.67,
            skip_pointers: vec![
                SkipPointer {
                    bm25_ub: 9.87,
                    tfidf_ub: 1.23,
                    last_docid: 999,
                    docid_offset: 100,
                    freq_offset: 200,
                },
                SkipPointer {
                    bm25_ub: 4.0,
                    tfidf_ub: 2.0,
                    last_docid: 1998,
                    docid_offset: 300,
                    freq_offset: 400,
                },
            ],
        };

        let ser = slv.serialize();
        let back = SigmaLexiconValue::deserialize(&ser);
        assert_eq!(back.base, slv.base);
        assert!((back.bm25_sigma - slv.bm25_sigma).abs() < 1e-9);
        assert!((back.tfidf_sigma - slv.tfidf_sigma).abs() < 1e-9);
        assert_eq!(back.skip_pointers.len(), slv.skip_pointers.len());
        assert_eq!(back.skip_pointers[0].last_docid, 999);
        assert_eq!(back.skip_pointers[1].docid_offset, 300);
    }

    #[test]
    fn fixed_point_round_trips_to_two_decimal_places() {
        assert_eq!(fixed_to_score(score_to_fixed(3.14)), 3.14);
    }
}
