//! Foreman ENC - node classification and fact upload for Puppet servers

use clap::Parser;
use tracing_subscriber::EnvFilter;

use foreman_enc::cli::{Cli, exit_code};

#[tokio::main]
async fn main() {
    // stdout carries the ENC document; every diagnostic goes to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    // Exit explicitly: a timed-out classification may still be blocking a
    // runtime thread, and dropping the runtime would wait for it.
    match cli.run().await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(exit_code(&e));
        }
    }
}
