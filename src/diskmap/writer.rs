//! Disk-map writer: a sorted, prefix-compressed, block-paginated
//! string-to-value store.
//!
//! Grounded in `examples/original_source/src/codes/diskmap/builder.hpp`.

use std::io::{self, Seek, SeekFrom, Write};

use crate::codec::varbyte;
use crate::error::DiskMapError;
use crate::types::DiskMapValue;

pub const DEFAULT_BLOCK_SIZE: usize = 4096;

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}

fn encode_value<V: DiskMapValue>(value: &V) -> Vec<u8> {
    let ser = value.serialize();
    match V::SERIALIZE_SIZE {
        Some(n) => {
            debug_assert_eq!(ser.len(), n);
            varbyte::encode_all(ser)
        }
        None => crate::types::encode_var_arity(&ser),
    }
}

/// Writes entries in strictly increasing key order into a `Write + Seek`
/// sink, one block of up to `B` bytes at a time.
///
/// Within a block, every entry after the block's head is prefix-compressed
/// against that head (not against the immediately preceding key) — matching
/// the original's single-level compression scheme.
pub struct DiskMapWriter<W: Write + Seek, V: DiskMapValue, const B: usize = DEFAULT_BLOCK_SIZE> {
    sink: W,
    metadata_block_off: u64,
    heads: Vec<String>,
    current_block_bytes: usize,
    entries_written: u64,
    last_key: Option<String>,
    _marker: std::marker::PhantomData<V>,
}

impl<W: Write + Seek, V: DiskMapValue, const B: usize> DiskMapWriter<W, V, B> {
    pub fn new(mut sink: W) -> io::Result<Self> {
        let metadata_block_off = sink.stream_position()?;
        sink.write_all(&vec![0u8; B])?;
        Ok(DiskMapWriter {
            sink,
            metadata_block_off,
            heads: Vec::new(),
            current_block_bytes: 0,
            entries_written: 0,
            last_key: None,
            _marker: std::marker::PhantomData,
        })
    }

    fn align_to_block(&mut self) -> io::Result<()> {
        let pos = self.sink.stream_position()?;
        let rem = (pos as usize) % B;
        if rem != 0 {
            self.sink.write_all(&vec![0u8; B - rem])?;
        }
        Ok(())
    }

    pub fn add(&mut self, key: &str, value: &V) -> Result<(), DiskMapError> {
        if key.is_empty() {
            return Err(DiskMapError::EmptyKey);
        }
        if key.len() >= 255 {
            return Err(DiskMapError::KeyTooLong(key.to_string(), key.len()));
        }
        if let Some(prev) = &self.last_key {
            if key <= prev.as_str() {
                return Err(DiskMapError::InvalidOrder {
                    key: key.to_string(),
                    previous: prev.clone(),
                });
            }
        }

        let value_bytes = encode_value(value);
        let entry_index = self.entries_written;

        if self.heads.is_empty() {
            self.heads.push(key.to_string());
            self.sink
                .write_all(&varbyte::encode(entry_index))
                .map_err(|e| DiskMapError::Corrupted(e.to_string()))?;
            self.sink
                .write_all(&value_bytes)
                .map_err(|e| DiskMapError::Corrupted(e.to_string()))?;
            self.current_block_bytes = varbyte::encode(entry_index).len() + value_bytes.len();
        } else {
            let head = self.heads.last().unwrap();
            let common_len = common_prefix_len(key, head).min(254);
            let key_len = key.len() + 1;
            let diff_len = key_len - common_len;
            let needed = 1 + value_bytes.len() + diff_len;

            if self.current_block_bytes + needed > B {
                self.heads.push(key.to_string());
                self.align_to_block()
                    .map_err(|e| DiskMapError::Corrupted(e.to_string()))?;

                let idx_bytes = varbyte::encode(entry_index);
                self.sink
                    .write_all(&idx_bytes)
                    .map_err(|e| DiskMapError::Corrupted(e.to_string()))?;
                self.sink
                    .write_all(&value_bytes)
                    .map_err(|e| DiskMapError::Corrupted(e.to_string()))?;
                self.current_block_bytes = idx_bytes.len() + value_bytes.len();
            } else {
                self.sink
                    .write_all(&[common_len as u8])
                    .map_err(|e| DiskMapError::Corrupted(e.to_string()))?;
                self.sink
                    .write_all(key[common_len..].as_bytes())
                    .map_err(|e| DiskMapError::Corrupted(e.to_string()))?;
                self.sink
                    .write_all(&[0u8])
                    .map_err(|e| DiskMapError::Corrupted(e.to_string()))?;
                self.sink
                    .write_all(&value_bytes)
                    .map_err(|e| DiskMapError::Corrupted(e.to_string()))?;
                self.current_block_bytes += needed;
            }
        }

        self.last_key = Some(key.to_string());
        self.entries_written += 1;
        Ok(())
    }

    /// Write the heads array and back-patch the metadata block, returning
    /// the underlying sink.
    pub fn finalize(mut self) -> io::Result<W> {
        self.align_to_block()?;
        let offset_to_heads = self.sink.stream_position()?;

        for head in &self.heads {
            self.sink.write_all(head.as_bytes())?;
            self.sink.write_all(&[0u8])?;
        }

        self.sink.seek(SeekFrom::Start(self.metadata_block_off))?;
        self.sink.write_all(&self.entries_written.to_le_bytes())?;
        self.sink.write_all(&offset_to_heads.to_le_bytes())?;
        self.sink
            .write_all(&(self.heads.len() as u64).to_le_bytes())?;
        self.sink.seek(SeekFrom::End(0))?;

        Ok(self.sink)
    }
}
