//! `searchrs-build`: reads `(docno, text)` lines from stdin and builds a
//! disk-resident index under `--out-dir`.

use std::io::{self, BufReader};
use std::process::ExitCode;

use clap::Parser;
use searchrs::config::BuildConfig;
use searchrs::tokenizer::DefaultTokenizer;

fn main() -> ExitCode {
    env_logger::init();
    let cfg = BuildConfig::parse();

    let stdin = io::stdin();
    let reader = BufReader::new(stdin.lock());
    let tokenizer = DefaultTokenizer;

    match searchrs::builder::build(reader, &cfg, &tokenizer) {
        Ok(()) => {
            log::info!("index built at {:?}", cfg.out_dir);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("build failed: {e}");
            ExitCode::FAILURE
        }
    }
}
