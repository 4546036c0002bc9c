//! Jeepney Fares CLI
//!
//! Replays a drive script through a fare session and prints every event the
//! engine reports as CSV.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- route.csv [seed] > events.csv
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug`, `info` or `warn` to control logging verbosity

use jeepney_fares::{Result, Session, SimConfig, SimError, DEFAULT_SEED};
use log::info;
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run(env::args().skip(1)) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Script path and RNG seed taken from the command line.
fn parse_args(mut args: impl Iterator<Item = String>) -> Result<(String, u64)> {
    let script = args.next().ok_or(SimError::MissingArgument)?;
    let seed = match args.next() {
        Some(raw) => raw.parse().map_err(|_| SimError::InvalidSeed(raw))?,
        None => DEFAULT_SEED,
    };
    Ok((script, seed))
}

fn run(args: impl Iterator<Item = String>) -> Result<()> {
    let (script, seed) = parse_args(args)?;

    let mut session = Session::with_seed(SimConfig::default(), seed)?;
    session.process_script(BufReader::new(File::open(&script)?))?;
    info!("Session over at {}", session.summary());

    session.write_output(io::stdout().lock())
}
