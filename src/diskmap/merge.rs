//! K-way merge over several disk-maps' entries, grouping equal keys across
//! sources. Used to build the global lexicon from each shard's temporary
//! lexicon.
//!
//! Grounded in the shard-merge step of
//! `examples/original_source/src/indexBuilder/IndexBuilder.cpp` and the
//! general merge pattern in
//! `examples/motedb-motedb/src/storage/lsm/sstable.rs`'s sibling merging
//! iterator.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::diskmap::reader::{DiskMapIter, DiskMapReader};
use crate::types::DiskMapValue;

struct HeapEntry<'r, 'a, V: DiskMapValue, const B: usize> {
    key: String,
    value: V,
    source: usize,
    iter: DiskMapIter<'r, 'a, V, B>,
}

impl<'r, 'a, V: DiskMapValue, const B: usize> PartialEq for HeapEntry<'r, 'a, V, B> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.source == other.source
    }
}
impl<'r, 'a, V: DiskMapValue, const B: usize> Eq for HeapEntry<'r, 'a, V, B> {}

impl<'r, 'a, V: DiskMapValue, const B: usize> Ord for HeapEntry<'r, 'a, V, B> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the smallest key first.
        other.key.cmp(&self.key).then_with(|| other.source.cmp(&self.source))
    }
}
impl<'r, 'a, V: DiskMapValue, const B: usize> PartialOrd for HeapEntry<'r, 'a, V, B> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Merges `sources` (each required to be in ascending key order, as any
/// [`DiskMapReader`] is) into a single ascending stream, grouping together
/// every `(source_index, value)` that shares a key.
pub struct KWayMerge<'r, 'a, V: DiskMapValue, const B: usize> {
    heap: BinaryHeap<HeapEntry<'r, 'a, V, B>>,
}

impl<'r, 'a, V: DiskMapValue, const B: usize> KWayMerge<'r, 'a, V, B> {
    pub fn new(sources: &'r [DiskMapReader<'a, V, B>]) -> Self {
        let mut heap = BinaryHeap::new();
        for (source, reader) in sources.iter().enumerate() {
            let mut iter = reader.iter();
            if let Some((key, value)) = iter.next() {
                heap.push(HeapEntry { key, value, source, iter });
            }
        }
        KWayMerge { heap }
    }
}

impl<'r, 'a, V: DiskMapValue, const B: usize> Iterator for KWayMerge<'r, 'a, V, B> {
    type Item = (String, Vec<(usize, V)>);

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.heap.pop()?;
        let key = first.key.clone();
        let mut group = vec![(first.source, first.value)];

        let mut iter = first.iter;
        if let Some((next_key, next_value)) = iter.next() {
            self.heap.push(HeapEntry {
                key: next_key,
                value: next_value,
                source: first.source,
                iter,
            });
        }

        while let Some(top) = self.heap.peek() {
            if top.key != key {
                break;
            }
            let top = self.heap.pop().unwrap();
            group.push((top.source, top.value));

            let mut iter = top.iter;
            if let Some((next_key, next_value)) = iter.next() {
                self.heap.push(HeapEntry {
                    key: next_key,
                    value: next_value,
                    source: top.source,
                    iter,
                });
            }
        }

        Some((key, group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diskmap::writer::DiskMapWriter;
    use std::io::Cursor;

    fn build_map(entries: &[(&str, u64)]) -> Vec<u8> {
        let mut w: DiskMapWriter<_, u64, 64> = DiskMapWriter::new(Cursor::new(Vec::new())).unwrap();
        for (k, v) in entries {
            w.add(k, v).unwrap();
        }
        w.finalize().unwrap().into_inner()
    }

    #[test]
    fn merges_and_groups_shared_keys() {
        let buf_a = build_map(&[("apple", 1), ("cherry", 3), ("fig", 10)]);
        let buf_b = build_map(&[("banana", 2), ("cherry", 30), ("date", 4)]);

        let reader_a: DiskMapReader<u64, 64> = DiskMapReader::open(&buf_a).unwrap();
        let reader_b: DiskMapReader<u64, 64> = DiskMapReader::open(&buf_b).unwrap();
        let sources = vec![reader_a, reader_b];

        let merged: Vec<(String, Vec<(usize, u64)>)> = KWayMerge::new(&sources).collect();
        let keys: Vec<&str> = merged.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["apple", "banana", "cherry", "date", "fig"]);

        let cherry = &merged.iter().find(|(k, _)| k == "cherry").unwrap().1;
        assert_eq!(cherry.len(), 2);
        let sum: u64 = cherry.iter().map(|(_, v)| v).sum();
        assert_eq!(sum, 33);
    }

    #[test]
    fn merges_the_two_shard_worked_example() {
        let buf_a = build_map(&[("cisterna", 100), ("corea", 1), ("kkkkkkk", 50), ("pechino", 0), ("zorro", 5)]);
        let buf_b = build_map(&[
            ("banano", 5),
            ("cisterna", 150),
            ("corea", 4),
            ("ewew", 50),
            ("pacone", 0),
            ("pechino", 69),
        ]);

        let reader_a: DiskMapReader<u64, 64> = DiskMapReader::open(&buf_a).unwrap();
        let reader_b: DiskMapReader<u64, 64> = DiskMapReader::open(&buf_b).unwrap();
        let sources = vec![reader_a, reader_b];

        let merged: Vec<(String, u64)> = KWayMerge::new(&sources)
            .map(|(k, group)| (k, group.into_iter().map(|(_, v)| v).sum()))
            .collect();

        assert_eq!(
            merged,
            vec![
                ("banano".to_string(), 5),
                ("cisterna".to_string(), 250),
                ("corea".to_string(), 5),
                ("ewew".to_string(), 50),
                ("kkkkkkk".to_string(), 50),
                ("pacone".to_string(), 0),
                ("pechino".to_string(), 69),
                ("zorro".to_string(), 5),
            ]
        );
    }
}
