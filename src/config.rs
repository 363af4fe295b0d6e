//! CLI configuration for the `searchrs-build` and `searchrs-query` binaries.
//!
//! Grounded in spec.md §6 ("External interfaces") for the flag set and in
//! the pack's other full-text-search-shaped crates for the choice of
//! `clap::Parser` derive — the teacher crate (`motedb-motedb`) hand-rolls
//! `env::args()` parsing for its single-binary REPL, but spec.md's flag
//! list (six long/short options with defaults) is exactly what `clap`
//! derive exists to express, and is added here as an ambient-stack
//! enrichment per SPEC_FULL.md §2 (C11).

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::scorer::{Scorer, DEFAULT_BM25_B, DEFAULT_BM25_K1};

/// Bound on in-flight (docno, text) bytes buffered per chunk before it is
/// dispatched to a worker, per spec.md §5 ("Backpressure"). Matches
/// `examples/original_source/src/builder.cpp`'s `CHUNK_SIZE`, generalized
/// from a line count to a byte budget since spec.md §4.6 defines chunking
/// by cumulative byte size rather than document count.
pub const MAX_CHUNK_SPACE: usize = 675_000_000;

/// Number of postings per skip-list block, per spec.md §3/§4.6.
pub const SKIP_BLOCK_SIZE: usize = 2000;

#[derive(Parser, Debug, Clone)]
#[command(name = "searchrs-build", about = "Build a disk-resident inverted index from stdin")]
pub struct BuildConfig {
    /// Output directory for the built shards and global artifacts. Removed
    /// and recreated if it already exists, matching
    /// `examples/original_source/src/builder.cpp`'s `main`.
    #[arg(default_value = "data")]
    pub out_dir: PathBuf,

    /// Worker thread count; defaults to available parallelism.
    #[arg(long, short)]
    pub threads: Option<usize>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig { out_dir: PathBuf::from("data"), threads: None }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmArg {
    Daat,
    #[value(name = "daat-c")]
    DaatC,
    Bmm,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreArg {
    Bm25,
    Tfidf,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "searchrs-query", about = "Query a searchrs index")]
pub struct QueryConfig {
    /// Input directory produced by `searchrs-build`.
    #[arg(long, short, default_value = "data")]
    pub data_dir: PathBuf,

    /// Results returned per query.
    #[arg(long, short = 'k', default_value_t = 10)]
    pub top_k: usize,

    /// Run tag written into TREC-style output lines.
    #[arg(long, short, default_value = "MIRCV0")]
    pub run_name: String,

    /// Query processing algorithm.
    #[arg(long, short, value_enum, default_value_t = AlgorithmArg::Daat)]
    pub algorithm: AlgorithmArg,

    /// Batch mode: read `<q_id> <query>` lines from stdin instead of
    /// prompting interactively.
    #[arg(long, short)]
    pub batch: bool,

    /// Worker thread count for shard fan-out; defaults to available
    /// parallelism.
    #[arg(long, short)]
    pub threads: Option<usize>,

    /// Scoring function.
    #[arg(long, short, value_enum, default_value_t = ScoreArg::Bm25)]
    pub score: ScoreArg,
}

impl QueryConfig {
    pub fn scorer(&self) -> Scorer {
        match self.score {
            ScoreArg::Bm25 => Scorer::Bm25 { k1: DEFAULT_BM25_K1, b: DEFAULT_BM25_B },
            ScoreArg::Tfidf => Scorer::TfIdf,
        }
    }

    pub fn mode(&self) -> crate::query::Mode {
        match self.algorithm {
            AlgorithmArg::Daat => crate::query::Mode::Disjunctive,
            AlgorithmArg::DaatC => crate::query::Mode::Conjunctive,
            AlgorithmArg::Bmm => crate::query::Mode::Bmm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn build_config_parses_with_defaults() {
        let cfg = BuildConfig::parse_from(["searchrs-build"]);
        assert_eq!(cfg.out_dir, PathBuf::from("data"));
        assert_eq!(cfg.threads, None);
    }

    #[test]
    fn query_config_parses_flags() {
        let cfg = QueryConfig::parse_from([
            "searchrs-query",
            "--data-dir",
            "/tmp/idx",
            "--top-k",
            "20",
            "--algorithm",
            "bmm",
            "--score",
            "tfidf",
            "--batch",
        ]);
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/idx"));
        assert_eq!(cfg.top_k, 20);
        assert_eq!(cfg.algorithm, AlgorithmArg::Bmm);
        assert_eq!(cfg.score, ScoreArg::Tfidf);
        assert!(cfg.batch);
        assert_eq!(cfg.mode(), crate::query::Mode::Bmm);
    }

    #[test]
    fn clap_commands_are_well_formed() {
        BuildConfig::command().debug_assert();
        QueryConfig::command().debug_assert();
    }
}
