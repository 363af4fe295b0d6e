//! `searchrs-query`: queries a `searchrs-build`-produced index, fanning each
//! query out across shards and merging results into TREC-style output
//! lines.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rayon::prelude::*;

use searchrs::config::QueryConfig;
use searchrs::index_reader::{CollectionStats, ShardIndex};
use searchrs::query::merge::{format_trec_line, merge_shards};
use searchrs::tokenizer::{query_terms, DefaultTokenizer};
use searchrs::ScoredDoc;

fn shard_dirs(data_dir: &std::path::Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> =
        fs::read_dir(data_dir)?.filter_map(|e| e.ok()).map(|e| e.path()).filter(|p| p.is_dir()).collect();
    dirs.sort();
    Ok(dirs)
}

fn run_query(
    shards: &[ShardIndex],
    stats: &CollectionStats,
    cfg: &QueryConfig,
    tokenizer: &DefaultTokenizer,
    query: &str,
) -> searchrs::Result<Vec<ScoredDoc>> {
    let terms = query_terms(tokenizer, query);
    if terms.is_empty() {
        return Ok(Vec::new());
    }

    let scorer = cfg.scorer();
    let mode = cfg.mode();

    let per_shard: Vec<Vec<ScoredDoc>> = shards
        .par_iter()
        .map(|shard| {
            let results = shard.query(stats, &scorer, &terms, mode, cfg.top_k)?;
            Ok(shard.scored_docs(results))
        })
        .collect::<searchrs::Result<Vec<_>>>()?;

    Ok(merge_shards(per_shard, cfg.top_k))
}

fn main() -> ExitCode {
    env_logger::init();
    let cfg = QueryConfig::parse();

    if let Some(n) = cfg.threads {
        let _ = rayon::ThreadPoolBuilder::new().num_threads(n).build_global();
    }

    let dirs = match shard_dirs(&cfg.data_dir) {
        Ok(d) => d,
        Err(e) => {
            log::error!("cannot list shards in {:?}: {e}", cfg.data_dir);
            return ExitCode::FAILURE;
        }
    };

    let stats = match CollectionStats::open(&cfg.data_dir) {
        Ok(s) => s,
        Err(e) => {
            log::error!("cannot open collection stats: {e}");
            return ExitCode::FAILURE;
        }
    };

    let shards: Vec<ShardIndex> = match dirs.iter().map(|d| ShardIndex::open(d)).collect() {
        Ok(s) => s,
        Err(e) => {
            log::error!("cannot open shard: {e}");
            return ExitCode::FAILURE;
        }
    };

    let tokenizer = DefaultTokenizer;
    let stdin = io::stdin();

    if cfg.batch {
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    log::error!("stdin read error: {e}");
                    return ExitCode::FAILURE;
                }
            };
            let Some((q_id, query)) = line.split_once(' ') else {
                log::warn!("skipping malformed batch line: {line:?}");
                continue;
            };

            match run_query(&shards, &stats, &cfg, &tokenizer, query) {
                Ok(results) => print_results(q_id, &results, &cfg.run_name),
                Err(e) => log::error!("query {q_id:?} failed: {e}"),
            }
        }
    } else {
        let mut q_id = 0u64;
        loop {
            eprint!("query> ");
            let _ = io::stderr().flush();
            let mut line = String::new();
            if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
                break;
            }
            let query = line.trim();
            if query.is_empty() {
                continue;
            }

            q_id += 1;
            match run_query(&shards, &stats, &cfg, &tokenizer, query) {
                Ok(results) => print_results(&q_id.to_string(), &results, &cfg.run_name),
                Err(e) => log::error!("query failed: {e}"),
            }
        }
    }

    ExitCode::SUCCESS
}

fn print_results(q_id: &str, results: &[ScoredDoc], run_name: &str) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (rank, doc) in results.iter().enumerate() {
        let _ = writeln!(out, "{}", format_trec_line(q_id, rank + 1, doc, run_name));
    }
}
