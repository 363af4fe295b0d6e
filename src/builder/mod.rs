//! Top-level builder orchestration: reads tab-separated `(docno, text)`
//! lines, fans chunk processing out across a `rayon` worker pool bounded by
//! a backpressure gate, then merges the global lexicon and runs the σ +
//! skip-list annotation pass.
//!
//! Grounded in `examples/original_source/src/builder.cpp`'s `main` (stdin
//! chunking, per-chunk dispatch, final merge) realized with `rayon::scope`
//! instead of a hand-rolled thread pool, per SPEC_FULL.md §4.6/§5.

mod backpressure;
mod chunk;
mod global_lexicon;
mod sigma;

use std::fs::{self, File};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use memmap2::Mmap;
use parking_lot::Mutex as PLMutex;
use rayon::prelude::*;

use crate::config::{BuildConfig, MAX_CHUNK_SPACE};
use crate::diskmap::reader::DiskMapReader;
use crate::diskmap::writer::DEFAULT_BLOCK_SIZE as B;
use crate::error::{Result, SearchError};
use crate::tokenizer::{self, Tokenizer};
use crate::types::DocLen;

use backpressure::Backpressure;
use chunk::ChunkAccumulator;

/// Build a full index from `(docno, text)` lines read off `reader`, writing
/// shards and global artifacts under `cfg.out_dir`. `cfg.out_dir` is removed
/// and recreated if it already exists.
pub fn build<R: BufRead>(reader: R, cfg: &BuildConfig, tokenizer: &dyn Tokenizer) -> Result<()> {
    if cfg.out_dir.exists() {
        fs::remove_dir_all(&cfg.out_dir)?;
    }
    fs::create_dir_all(&cfg.out_dir)?;

    let n_workers = cfg
        .threads
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_workers)
        .build()
        .map_err(|e| SearchError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;
    let backpressure = Backpressure::new(n_workers + 1);

    let sum_doclen = AtomicU64::new(0);
    // Process-wide: serializes every chunk's disk flush and every mutation
    // of the shard-path vector, per spec.md §5's `disk_writer_mutex`. Workers
    // tokenize and accumulate postings for their chunk concurrently, lock-free;
    // only the actual flush to `db_<i>` happens one chunk at a time.
    let disk_writer_mutex: PLMutex<Vec<PathBuf>> = PLMutex::new(Vec::new());
    let errors: Mutex<Vec<SearchError>> = Mutex::new(Vec::new());

    let mut next_base_docid: u64 = 1;
    let mut total_docs: u64 = 0;

    pool.scope(|s| {
        let mut raw_chunk: Vec<(String, String)> = Vec::new();
        let mut chunk_bytes: usize = 0;

        let dispatch = |raw_chunk: Vec<(String, String)>, base_docid: u64| {
            if raw_chunk.is_empty() {
                return;
            }
            backpressure.acquire();
            let n_docs_in_chunk = raw_chunk.len();

            s.spawn(move |_| {
                let mut acc = ChunkAccumulator::new(base_docid);
                let mut chunk_doclen: DocLen = 0;
                for (docno, text) in raw_chunk {
                    let term_freqs = tokenizer::term_frequencies(tokenizer, &text);
                    chunk_doclen += acc.add_document(docno, term_freqs);
                }

                let flush_result = {
                    let mut shard_paths = disk_writer_mutex.lock();
                    let shard_idx = shard_paths.len();
                    let shard_dir = cfg.out_dir.join(format!("db_{}", shard_idx));
                    log::info!("flushing chunk {shard_idx} ({n_docs_in_chunk} docs) to {shard_dir:?}");
                    let result = acc.flush(&shard_dir);
                    if result.is_ok() {
                        shard_paths.push(shard_dir);
                    }
                    result
                };

                match flush_result {
                    Ok(()) => {
                        sum_doclen.fetch_add(chunk_doclen, Ordering::Relaxed);
                    }
                    Err(e) => {
                        log::error!("chunk flush failed: {e}");
                        errors.lock().unwrap().push(e);
                    }
                }
                backpressure.release();
            });
        };

        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    errors.lock().unwrap().push(e.into());
                    break;
                }
            };
            let Some((docno, text)) = line.split_once('\t') else {
                log::warn!("skipping line without a tab separator");
                continue;
            };
            chunk_bytes += docno.len() + text.len();
            raw_chunk.push((docno.to_string(), text.to_string()));
            total_docs += 1;

            if chunk_bytes >= MAX_CHUNK_SPACE {
                let base_docid = next_base_docid;
                next_base_docid += raw_chunk.len() as u64;
                dispatch(std::mem::take(&mut raw_chunk), base_docid);
                chunk_bytes = 0;
            }
        }

        dispatch(raw_chunk, next_base_docid);
    });

    if let Some(e) = errors.into_inner().unwrap().into_iter().next() {
        return Err(e);
    }

    if total_docs == 0 {
        write_metadata(&cfg.out_dir, 0, 0)?;
        let empty: crate::diskmap::writer::DiskMapWriter<_, u64, B> =
            crate::diskmap::writer::DiskMapWriter::new(File::create(cfg.out_dir.join("global_lexicon"))?)?;
        empty.finalize()?;
        return Ok(());
    }

    let mut shard_dirs = disk_writer_mutex.into_inner();
    shard_dirs.sort();

    log::info!("merging global lexicon across {} shards", shard_dirs.len());
    global_lexicon::build(&shard_dirs, &cfg.out_dir)?;

    let sum_doclen = sum_doclen.load(Ordering::SeqCst);
    let avgdl = sum_doclen as f64 / total_docs as f64;
    write_metadata(&cfg.out_dir, sum_doclen, total_docs)?;

    let global_mmap = unsafe { Mmap::map(&File::open(cfg.out_dir.join("global_lexicon"))?)? };
    let global_reader: DiskMapReader<u64, B> = DiskMapReader::open(&global_mmap)?;

    log::info!("annotating {} shards with sigma/skip-list data", shard_dirs.len());
    shard_dirs.par_iter().try_for_each(|shard_dir| sigma::annotate_shard(shard_dir, total_docs, avgdl, &global_reader))?;

    Ok(())
}

fn write_metadata(out_dir: &Path, sum_doclen: u64, n_docs: u64) -> Result<()> {
    let mut f = File::create(out_dir.join("metadata"))?;
    f.write_all(&sum_doclen.to_le_bytes())?;
    f.write_all(&n_docs.to_le_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index_reader::{CollectionStats, ShardIndex};
    use crate::query::Mode;
    use crate::scorer::Scorer;
    use crate::tokenizer::{query_terms, DefaultTokenizer};
    use std::io::Cursor;

    #[test]
    fn builds_queryable_index_from_three_documents() {
        let input = "caffe\tbanano\nbabe\tbanano banano\nbeef\tbanano\n";
        let dir = tempfile::tempdir().unwrap();

        let mut cfg = BuildConfig::default();
        cfg.out_dir = dir.path().to_path_buf();
        cfg.threads = Some(2);

        let tokenizer = DefaultTokenizer;
        build(Cursor::new(input), &cfg, &tokenizer).unwrap();

        assert!(dir.path().join("global_lexicon").exists());
        assert!(dir.path().join("metadata").exists());

        let stats = CollectionStats::open(dir.path()).unwrap();
        assert_eq!(stats.n_docs, 3);

        let shard_dirs: Vec<PathBuf> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        assert!(!shard_dirs.is_empty());

        let scorer = Scorer::default();
        let terms = query_terms(&tokenizer, "banano");

        let mut found_docnos = Vec::new();
        for shard_dir in &shard_dirs {
            let shard = ShardIndex::open(shard_dir).unwrap();
            let results = shard.query(&stats, &scorer, &terms, Mode::Disjunctive, 10).unwrap();
            let scored = shard.scored_docs(results);
            found_docnos.extend(scored.into_iter().map(|d| d.docno));
        }
        found_docnos.sort();
        assert_eq!(found_docnos, vec!["babe", "beef", "caffe"]);
    }

    #[test]
    fn empty_input_produces_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = BuildConfig::default();
        cfg.out_dir = dir.path().to_path_buf();

        let tokenizer = DefaultTokenizer;
        build(Cursor::new(""), &cfg, &tokenizer).unwrap();

        let stats = CollectionStats::open(dir.path()).unwrap();
        assert_eq!(stats.n_docs, 0);
    }
}
