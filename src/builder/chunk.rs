//! Per-chunk posting accumulator and its flush to disk.
//!
//! Grounded in `examples/original_source/src/indexBuilder/IndexBuilder.cpp`'s
//! `write_to_disk`: one term at a time, in sorted order (a `BTreeMap` here
//! stands in for the original's implied sorted iteration), writing the
//! docid stream, then decoding the in-memory VarByte freq stream and
//! re-encoding it as unary on the way to the freq stream — reproduced
//! rather than optimized away, since SPEC_FULL.md calls this out as the
//! documented shape of the original.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::codec::{unary, varbyte};
use crate::diskmap::writer::{DiskMapWriter, DEFAULT_BLOCK_SIZE as B};
use crate::error::{BuildError, Result};
use crate::types::{DocId, DocLen, Freq, LexiconValue};

/// One term's postings within a single chunk: docid and freq VarByte
/// streams, appended to in document order (docids are already strictly
/// increasing since the producer assigns them in input order).
#[derive(Default)]
struct TermAccumulator {
    docid_bytes: Vec<u8>,
    freq_bytes: Vec<u8>,
    n_docs: u64,
}

impl TermAccumulator {
    fn push(&mut self, docid: DocId, freq: Freq) {
        self.docid_bytes.extend_from_slice(&varbyte::encode(docid));
        self.freq_bytes.extend_from_slice(&varbyte::encode(freq));
        self.n_docs += 1;
    }
}

/// In-memory state for one chunk: a sorted per-term posting accumulator
/// plus the chunk's slice of the document index. `BTreeMap` keeps terms in
/// ascending order so flush can iterate and write straight into a disk-map
/// without a separate sort pass, matching the disk-map's
/// "keys added in increasing order" invariant directly.
pub struct ChunkAccumulator {
    base_docid: DocId,
    postings: BTreeMap<String, TermAccumulator>,
    documents: Vec<(String, DocLen)>,
}

impl ChunkAccumulator {
    pub fn new(base_docid: DocId) -> Self {
        ChunkAccumulator { base_docid, postings: BTreeMap::new(), documents: Vec::new() }
    }

    pub fn base_docid(&self) -> DocId {
        self.base_docid
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Tokenize `text`, record `(docno, doclen)` at the next local slot, and
    /// push this document's postings into the term accumulators. Returns
    /// the document's length (`Σ freq`, spec.md §9's canonical definition)
    /// so the caller can fold it into the global length sum.
    pub fn add_document(&mut self, docno: String, term_freqs: ahash::AHashMap<String, u32>) -> DocLen {
        let docid = self.base_docid + self.documents.len() as u64;
        let doclen: DocLen = term_freqs.values().map(|&f| f as u64).sum();

        for (term, freq) in term_freqs {
            self.postings.entry(term).or_default().push(docid, freq as u64);
        }

        self.documents.push((docno, doclen));
        doclen
    }

    /// Write this chunk's shard: docid stream, freq stream, document index
    /// and temporary (non-σ) lexicon. `shard_dir` must not already exist —
    /// its presence indicates the same chunk was flushed twice, a builder
    /// bug rather than a recoverable condition.
    pub fn flush(self, shard_dir: &Path) -> Result<()> {
        if shard_dir.exists() {
            return Err(BuildError::ChunkExists(shard_dir.to_path_buf()).into());
        }
        fs::create_dir_all(shard_dir)?;

        let docid_file = File::create(shard_dir.join("posting_lists_docids"))?;
        let freq_file = File::create(shard_dir.join("posting_lists_freqs"))?;
        let lexicon_file = File::create(shard_dir.join("lexicon_temp"))?;
        let doc_index_file = File::create(shard_dir.join("document_index"))?;

        let mut docid_w = BufWriter::new(docid_file);
        let mut freq_w = BufWriter::new(freq_file);
        let mut lexicon_w: DiskMapWriter<_, LexiconValue, B> = DiskMapWriter::new(BufWriter::new(lexicon_file))?;

        let mut docid_pos: u64 = 0;
        let mut freq_pos: u64 = 0;

        for (term, acc) in self.postings {
            docid_w.write_all(&acc.docid_bytes)?;
            let start_pos_docid = docid_pos;
            docid_pos += acc.docid_bytes.len() as u64;
            let end_pos_docid = docid_pos;

            // Decode the in-memory VarByte freq stream and re-encode as
            // unary on the way to the on-disk freq stream.
            let decoded_freqs: Vec<u64> = varbyte::VarByteDecoder::new(&acc.freq_bytes).collect();
            let unary_bytes = unary::encode_all(decoded_freqs);
            freq_w.write_all(&unary_bytes)?;
            let start_pos_freq = freq_pos;
            freq_pos += unary_bytes.len() as u64;
            let end_pos_freq = freq_pos;

            let lv = LexiconValue {
                start_pos_docid,
                end_pos_docid,
                start_pos_freq,
                end_pos_freq,
                n_docs: acc.n_docs,
            };
            lexicon_w.add(&term, &lv)?;
        }

        docid_w.flush()?;
        freq_w.flush()?;
        lexicon_w.finalize()?.flush()?;

        write_document_index(&doc_index_file, self.base_docid, &self.documents)?;

        Ok(())
    }
}

fn write_document_index(file: &File, base_docid: DocId, documents: &[(String, DocLen)]) -> Result<()> {
    let mut w = BufWriter::new(file);
    w.write_all(&base_docid.to_le_bytes())?;
    w.write_all(&(documents.len() as u64).to_le_bytes())?;

    let mut running_offset: u64 = 0;
    let mut offsets = Vec::with_capacity(documents.len());
    for (docno, _) in documents {
        offsets.push(running_offset);
        running_offset += docno.len() as u64 + 1;
    }

    for ((_, doclen), docno_offset) in documents.iter().zip(offsets.iter()) {
        w.write_all(&docno_offset.to_le_bytes())?;
        w.write_all(&doclen.to_le_bytes())?;
    }

    for (docno, _) in documents {
        w.write_all(docno.as_bytes())?;
        w.write_all(&[0u8])?;
    }

    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diskmap::reader::DiskMapReader;
    use memmap2::Mmap;
    use std::fs::File;

    fn freqs(pairs: &[(&str, u32)]) -> ahash::AHashMap<String, u32> {
        pairs.iter().map(|(t, f)| (t.to_string(), *f)).collect()
    }

    #[test]
    fn flush_writes_readable_shard() {
        let dir = tempfile::tempdir().unwrap();
        let shard_dir = dir.path().join("db_0");

        let mut acc = ChunkAccumulator::new(1);
        let l1 = acc.add_document("caffe".to_string(), freqs(&[("banano", 1)]));
        let l2 = acc.add_document("babe".to_string(), freqs(&[("banano", 2)]));
        let l3 = acc.add_document("beef".to_string(), freqs(&[("banano", 1)]));
        assert_eq!((l1, l2, l3), (1, 2, 1));

        acc.flush(&shard_dir).unwrap();

        let lexicon_mmap = unsafe { Mmap::map(&File::open(shard_dir.join("lexicon_temp")).unwrap()).unwrap() };
        let reader: DiskMapReader<LexiconValue, B> = DiskMapReader::open(&lexicon_mmap).unwrap();
        let lv = reader.find("banano").unwrap();
        assert_eq!(lv.n_docs, 3);

        let docid_bytes = fs::read(shard_dir.join("posting_lists_docids")).unwrap();
        let docids: Vec<u64> =
            varbyte::VarByteDecoder::new(&docid_bytes[lv.start_pos_docid as usize..lv.end_pos_docid as usize])
                .collect();
        assert_eq!(docids, vec![1, 2, 3]);

        let freq_bytes = fs::read(shard_dir.join("posting_lists_freqs")).unwrap();
        assert_eq!(&freq_bytes[lv.start_pos_freq as usize..lv.end_pos_freq as usize], &[0x02]);
    }

    #[test]
    fn flush_refuses_to_overwrite_existing_shard() {
        let dir = tempfile::tempdir().unwrap();
        let shard_dir = dir.path().join("db_0");
        fs::create_dir_all(&shard_dir).unwrap();

        let acc = ChunkAccumulator::new(1);
        let err = acc.flush(&shard_dir).unwrap_err();
        assert!(matches!(err, crate::error::SearchError::Build(BuildError::ChunkExists(_))));
    }
}
