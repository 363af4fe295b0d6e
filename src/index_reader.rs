//! Shard index reader: memory-maps a shard's four files and the global
//! lexicon, and answers per-shard queries.
//!
//! Grounded in `examples/original_source/src/index_worker.hpp` and
//! `examples/original_source/src/index/Index.template.hpp`.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::diskmap::reader::DiskMapReader;
use crate::diskmap::writer::DEFAULT_BLOCK_SIZE as B;
use crate::error::{BuildError, Result};
use crate::postings::{PostingList, SigmaPostingList};
use crate::query::Mode;
use crate::scorer::Scorer;
use crate::types::{DocId, DocLen, DocumentInfo, ScoredDoc, SigmaLexiconValue};

fn mmap_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path)?;
    Ok(unsafe { Mmap::map(&file)? })
}

fn read_cstr(data: &[u8], offset: usize) -> &str {
    let end = data[offset..].iter().position(|&b| b == 0).unwrap_or(0);
    std::str::from_utf8(&data[offset..offset + end]).unwrap_or("")
}

/// The collection-wide document frequency map (term → `n_i`) and the
/// length statistics derived from `metadata`. Built once, shared read-only
/// across every shard and query thread.
pub struct CollectionStats {
    global_lexicon_mmap: Mmap,
    pub n_docs: u64,
    pub avgdl: f64,
}

impl CollectionStats {
    pub fn open(data_dir: &Path) -> Result<Self> {
        let global_lexicon_mmap = mmap_file(&data_dir.join("global_lexicon"))?;

        let metadata = std::fs::read(data_dir.join("metadata"))?;
        let sum_doclen = u64::from_le_bytes(metadata[0..8].try_into().unwrap());
        let n_docs = u64::from_le_bytes(metadata[8..16].try_into().unwrap());
        let avgdl = sum_doclen as f64 / n_docs as f64;

        Ok(CollectionStats { global_lexicon_mmap, n_docs, avgdl })
    }

    pub fn global_lexicon(&self) -> DiskMapReader<'_, u64, B> {
        DiskMapReader::open(&self.global_lexicon_mmap[..]).expect("corrupt global_lexicon")
    }

    /// `idf` for `term`, or `BuildError::InvariantBroken` if absent — every
    /// shard's local lexicon is a subset of the global one by construction.
    pub fn idf(&self, term: &str) -> Result<f64> {
        let n_i = self
            .global_lexicon()
            .find(term)
            .ok_or_else(|| BuildError::InvariantBroken(term.to_string()))?;
        Ok(Scorer::idf(self.n_docs, n_i))
    }
}

pub(crate) struct DocumentIndex {
    mmap: Mmap,
    base_docid: DocId,
    length: u64,
    heap_start: usize,
}

const DOC_INFO_SERIALIZED_SIZE: usize = 16;

impl DocumentIndex {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let mmap = mmap_file(path)?;
        let base_docid = u64::from_le_bytes(mmap[0..8].try_into().unwrap());
        let length = u64::from_le_bytes(mmap[8..16].try_into().unwrap());
        let heap_start = 16 + length as usize * DOC_INFO_SERIALIZED_SIZE;
        Ok(DocumentIndex { mmap, base_docid, length, heap_start })
    }

    fn info(&self, docid: DocId) -> DocumentInfo {
        let idx = (docid - self.base_docid) as usize;
        debug_assert!((idx as u64) < self.length);
        let off = 16 + idx * DOC_INFO_SERIALIZED_SIZE;
        let docno_offset = u64::from_le_bytes(self.mmap[off..off + 8].try_into().unwrap());
        let length = u64::from_le_bytes(self.mmap[off + 8..off + 16].try_into().unwrap());
        DocumentInfo { docno_offset, length }
    }

    fn docno(&self, docid: DocId) -> &str {
        let info = self.info(docid);
        read_cstr(&self.mmap, self.heap_start + info.docno_offset as usize)
    }

    pub(crate) fn doclen(&self, docid: DocId) -> DocLen {
        self.info(docid).length
    }
}

/// One shard's four memory-mapped files plus its final (σ-augmented)
/// lexicon.
pub struct ShardIndex {
    docid_mmap: Mmap,
    freq_mmap: Mmap,
    lexicon_mmap: Mmap,
    document_index: DocumentIndex,
}

impl ShardIndex {
    pub fn open(shard_dir: &Path) -> Result<Self> {
        Ok(ShardIndex {
            docid_mmap: mmap_file(&shard_dir.join("posting_lists_docids"))?,
            freq_mmap: mmap_file(&shard_dir.join("posting_lists_freqs"))?,
            lexicon_mmap: mmap_file(&shard_dir.join("lexicon"))?,
            document_index: DocumentIndex::open(&shard_dir.join("document_index"))?,
        })
    }

    pub fn local_lexicon(&self) -> DiskMapReader<'_, SigmaLexiconValue, B> {
        DiskMapReader::open(&self.lexicon_mmap[..]).expect("corrupt lexicon")
    }

    pub fn posting_list(&self, lv: &SigmaLexiconValue, idf: f64) -> SigmaPostingList<'_> {
        SigmaPostingList::new(
            &self.docid_mmap[lv.base.start_pos_docid as usize..lv.base.end_pos_docid as usize],
            &self.freq_mmap[lv.base.start_pos_freq as usize..lv.base.end_pos_freq as usize],
            idf,
            lv.skip_pointers.clone(),
            lv.bm25_sigma,
            lv.tfidf_sigma,
        )
    }

    pub fn doclen(&self, docid: DocId) -> DocLen {
        self.document_index.doclen(docid)
    }

    pub fn docno(&self, docid: DocId) -> &str {
        self.document_index.docno(docid)
    }

    /// Build one [`SigmaPostingList`] per query term present in this
    /// shard's lexicon, plus the minimum starting docid across them.
    /// In conjunctive mode, any missing term empties the result entirely.
    pub fn build_helpers(
        &self,
        stats: &CollectionStats,
        terms: &[String],
        conjunctive: bool,
    ) -> Result<Option<(Vec<SigmaPostingList<'_>>, DocId)>> {
        let lexicon = self.local_lexicon();
        let mut helpers = Vec::new();
        let mut min_docid = crate::types::DOCID_MAX;

        for term in terms {
            match lexicon.find(term) {
                Some(lv) => {
                    let idf = stats.idf(term)?;
                    let pl = self.posting_list(&lv, idf);
                    if let Some((docid, _)) = pl.current() {
                        min_docid = min_docid.min(docid);
                    }
                    helpers.push(pl);
                }
                None => {
                    if conjunctive {
                        return Ok(None);
                    }
                }
            }
        }

        if helpers.is_empty() {
            return Ok(None);
        }
        Ok(Some((helpers, min_docid)))
    }

    /// Run a DAAT (disjunctive or conjunctive) or BMM query against this
    /// shard, returning up to `top_k` `(docid, score)` pairs.
    pub fn query(
        &self,
        stats: &CollectionStats,
        scorer: &Scorer,
        terms: &[String],
        mode: Mode,
        top_k: usize,
    ) -> Result<Vec<(DocId, f64)>> {
        let Some((helpers, min_docid)) = self.build_helpers(stats, terms, mode == Mode::Conjunctive)? else {
            return Ok(Vec::new());
        };

        let doclen_fn = |docid: DocId| self.doclen(docid);
        let results = match mode {
            Mode::Disjunctive => crate::query::daat::disjunctive(helpers, min_docid, scorer, top_k, doclen_fn, stats.avgdl),
            Mode::Conjunctive => crate::query::daat::conjunctive(helpers, min_docid, scorer, top_k, doclen_fn, stats.avgdl),
            Mode::Bmm => crate::query::bmm::run(helpers, min_docid, scorer, top_k, doclen_fn, stats.avgdl),
        };
        Ok(results)
    }

    pub fn scored_docs(&self, results: Vec<(DocId, f64)>) -> Vec<ScoredDoc> {
        results
            .into_iter()
            .map(|(docid, score)| ScoredDoc { docno: self.docno(docid).to_string(), score })
            .collect()
    }
}
