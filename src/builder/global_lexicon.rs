//! Global lexicon: k-way merge of every shard's temporary (non-σ) lexicon
//! into one term → collection-wide document-frequency disk-map.
//!
//! Grounded in the shard-merge step of
//! `examples/original_source/src/indexBuilder/IndexBuilder.cpp` and the
//! `KWayMerge` primitive in [`crate::diskmap::merge`].

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use memmap2::Mmap;

use crate::diskmap::merge::KWayMerge;
use crate::diskmap::reader::DiskMapReader;
use crate::diskmap::writer::{DiskMapWriter, DEFAULT_BLOCK_SIZE as B};
use crate::error::Result;
use crate::types::LexiconValue;

/// Merge `shard_dirs`' `lexicon_temp` files into `out_dir/global_lexicon`,
/// summing `n_docs` across shards for every term.
pub fn build(shard_dirs: &[std::path::PathBuf], out_dir: &Path) -> Result<()> {
    let mmaps: Vec<Mmap> = shard_dirs
        .iter()
        .map(|dir| {
            let file = File::open(dir.join("lexicon_temp"))?;
            Ok(unsafe { Mmap::map(&file)? })
        })
        .collect::<Result<_>>()?;

    let readers: Vec<DiskMapReader<LexiconValue, B>> =
        mmaps.iter().map(|m| DiskMapReader::open(&m[..]).expect("corrupt lexicon_temp")).collect();

    let out_file = File::create(out_dir.join("global_lexicon"))?;
    let mut writer: DiskMapWriter<_, u64, B> = DiskMapWriter::new(BufWriter::new(out_file))?;

    for (term, group) in KWayMerge::new(&readers) {
        let n_i: u64 = group.iter().map(|(_, lv)| lv.n_docs).sum();
        writer.add(&term, &n_i)?;
    }

    writer.finalize()?.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diskmap::writer::DiskMapWriter as Writer;
    use std::fs;
    use std::io::Write as _;

    fn write_shard_lexicon(shard_dir: &Path, entries: &[(&str, LexiconValue)]) {
        fs::create_dir_all(shard_dir).unwrap();
        let file = File::create(shard_dir.join("lexicon_temp")).unwrap();
        let mut w: Writer<_, LexiconValue, B> = Writer::new(BufWriter::new(file)).unwrap();
        for (k, v) in entries {
            w.add(k, v).unwrap();
        }
        w.finalize().unwrap().flush().unwrap();
    }

    fn lv(n_docs: u64) -> LexiconValue {
        LexiconValue { start_pos_docid: 0, end_pos_docid: 1, start_pos_freq: 0, end_pos_freq: 1, n_docs }
    }

    #[test]
    fn merges_document_frequencies_across_shards() {
        let dir = tempfile::tempdir().unwrap();
        let shard_a = dir.path().join("db_0");
        let shard_b = dir.path().join("db_1");

        write_shard_lexicon(&shard_a, &[("apple", lv(2)), ("cherry", lv(5))]);
        write_shard_lexicon(&shard_b, &[("banana", lv(1)), ("cherry", lv(3))]);

        build(&[shard_a, shard_b], dir.path()).unwrap();

        let mmap = unsafe { Mmap::map(&File::open(dir.path().join("global_lexicon")).unwrap()).unwrap() };
        let reader: DiskMapReader<u64, B> = DiskMapReader::open(&mmap).unwrap();
        assert_eq!(reader.find("apple"), Some(2));
        assert_eq!(reader.find("banana"), Some(1));
        assert_eq!(reader.find("cherry"), Some(8));
        assert_eq!(reader.find("missing"), None);
    }
}
