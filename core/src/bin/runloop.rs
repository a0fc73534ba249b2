//! runloop CLI
//!
//! Benchmarks the effect run-loop and inspects configuration.

use runloop_core::cli;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
