//! σ + skip-list annotation pass: rewrites a shard's temporary
//! (non-σ) lexicon into its final [`SigmaLexiconValue`] lexicon, recording
//! BM25/TF-IDF upper bounds and a skip-list entry every
//! [`crate::config::SKIP_BLOCK_SIZE`] postings.
//!
//! Grounded in SPEC_FULL.md §4.6 ("σ + skip-list pass"); one shard is
//! rewritten at a time with no merge step, since a shard's final lexicon has
//! exactly the same key set as its temp lexicon.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use memmap2::Mmap;

use crate::config::SKIP_BLOCK_SIZE;
use crate::diskmap::reader::DiskMapReader;
use crate::diskmap::writer::{DiskMapWriter, DEFAULT_BLOCK_SIZE as B};
use crate::error::{BuildError, Result};
use crate::index_reader::DocumentIndex;
use crate::postings::{PlainPostingList, PostingList};
use crate::scorer::{Scorer, DEFAULT_BM25_B, DEFAULT_BM25_K1};
use crate::types::{LexiconValue, Score, SigmaLexiconValue, SkipPointer};

/// Rewrite `shard_dir`'s `lexicon_temp` into `lexicon`, using `n_docs` and
/// `avgdl` (collection-wide, computed once every chunk has flushed) and
/// `global_lexicon` for each term's document frequency. Deletes
/// `lexicon_temp` on success.
pub fn annotate_shard(
    shard_dir: &Path,
    n_docs: u64,
    avgdl: f64,
    global_lexicon: &DiskMapReader<'_, u64, B>,
) -> Result<()> {
    let docid_mmap = unsafe { Mmap::map(&File::open(shard_dir.join("posting_lists_docids"))?)? };
    let freq_mmap = unsafe { Mmap::map(&File::open(shard_dir.join("posting_lists_freqs"))?)? };
    let lexicon_temp_mmap = unsafe { Mmap::map(&File::open(shard_dir.join("lexicon_temp"))?)? };
    let document_index = DocumentIndex::open(&shard_dir.join("document_index"))?;

    let local_temp: DiskMapReader<LexiconValue, B> = DiskMapReader::open(&lexicon_temp_mmap[..])?;

    let out_file = File::create(shard_dir.join("lexicon"))?;
    let mut writer: DiskMapWriter<_, SigmaLexiconValue, B> = DiskMapWriter::new(BufWriter::new(out_file))?;

    let bm25 = Scorer::Bm25 { k1: DEFAULT_BM25_K1, b: DEFAULT_BM25_B };
    let tfidf = Scorer::TfIdf;

    for (term, lv) in local_temp.iter() {
        let n_i = global_lexicon.find(&term).ok_or_else(|| BuildError::InvariantBroken(term.clone()))?;
        let idf = Scorer::idf(n_docs, n_i);

        let docid_bytes = &docid_mmap[lv.start_pos_docid as usize..lv.end_pos_docid as usize];
        let freq_bytes = &freq_mmap[lv.start_pos_freq as usize..lv.end_pos_freq as usize];
        let mut pl = PlainPostingList::new(docid_bytes, freq_bytes, idf);

        let mut bm25_sigma: Score = 0.0;
        let mut tfidf_sigma: Score = 0.0;
        let mut block_bm25_max: Score = 0.0;
        let mut block_tfidf_max: Score = 0.0;
        let mut skip_pointers = Vec::new();
        let mut in_block = 0usize;

        while let Some((docid, freq)) = pl.current() {
            let doclen = document_index.doclen(docid);
            let bm25_score = bm25.score(freq, idf, doclen, avgdl);
            let tfidf_score = tfidf.score(freq, idf, doclen, avgdl);

            bm25_sigma = bm25_sigma.max(bm25_score);
            tfidf_sigma = tfidf_sigma.max(tfidf_score);
            block_bm25_max = block_bm25_max.max(bm25_score);
            block_tfidf_max = block_tfidf_max.max(tfidf_score);
            in_block += 1;

            pl.next();

            if in_block == SKIP_BLOCK_SIZE {
                let (docid_offset, freq_offset) = pl.offset();
                skip_pointers.push(SkipPointer {
                    bm25_ub: block_bm25_max,
                    tfidf_ub: block_tfidf_max,
                    last_docid: docid,
                    docid_offset,
                    freq_offset,
                });
                block_bm25_max = 0.0;
                block_tfidf_max = 0.0;
                in_block = 0;
            }
        }

        let slv = SigmaLexiconValue { base: lv, bm25_sigma, tfidf_sigma, skip_pointers };
        writer.add(&term, &slv)?;
    }

    writer.finalize()?.flush()?;
    drop(lexicon_temp_mmap);
    fs::remove_file(shard_dir.join("lexicon_temp"))?;

    Ok(())
}
