//! Byte- and bit-aligned integer codecs used by the disk-map and posting
//! streams: [`varbyte`] for docid gaps and lexicon offsets, [`unary`] for
//! frequency streams.

pub mod unary;
pub mod varbyte;
