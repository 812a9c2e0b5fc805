//! primeclone - resumable repository cloning
//!
//! Clones a repository into a new directory, optionally seeding the object
//! graph from an out-of-band primer resource and resuming interrupted
//! primer downloads across invocations.

use clap::Parser;

mod checkout;
mod cli;
mod commands;
mod config;
mod error;
mod junk;
mod local_clone;
mod plan;
mod primer;
mod progress;
mod refs;
mod repo;
mod transport;
mod ui;

use cli::Cli;

fn init_tracing(verbosity: i32) {
    let default_directive = match verbosity {
        v if v < 0 => "error",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let opts = match cli.validate() {
        Ok(opts) => opts,
        Err(err) => {
            eprintln!("Error: {}", err);
            std::process::exit(1);
        }
    };

    init_tracing(opts.verbosity);

    if let Err(err) = commands::clone::run(opts) {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
