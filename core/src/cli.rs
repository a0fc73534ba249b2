use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::benchmark::{ContextKind, Shape};
use crate::config::{Config, LogConfig};

#[derive(Parser)]
#[command(name = "runloop")]
#[command(about = "runloop - trampolined effect interpreter", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Time chains of effects through the run-loop
    Bench {
        /// Steps per chain (default: bench.depth from config)
        #[arg(long)]
        depth: Option<usize>,

        /// Runs per benchmark (default: bench.iterations from config)
        #[arg(long)]
        iterations: Option<usize>,

        /// Chain layout
        #[arg(long, value_enum, default_value_t = Shape::Bind)]
        shape: Shape,

        /// Execution context the chain runs on
        #[arg(long, value_enum, default_value_t = ContextKind::Immediate)]
        context: ContextKind,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load and validate configuration before executing any command
    let config = Config::builder()
        .config_path(cli.config.map(std::path::PathBuf::from))
        .build()
        .context("Failed to load configuration")?;

    init_logging(&config.log);

    match cli.command {
        Commands::Bench {
            depth,
            iterations,
            shape,
            context,
        } => {
            use crate::benchmark;

            let params = benchmark::BenchmarkParams {
                depth: depth.unwrap_or(config.bench.depth),
                iterations: iterations.unwrap_or(config.bench.iterations),
                shape,
                context,
                worker_threads: config.runtime.worker_threads,
            };

            tokio::task::spawn_blocking(move || benchmark::run_benchmark(params))
                .await
                .context("Benchmark thread panicked")??;
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Install the fmt subscriber; `RUST_LOG` wins over the configured filter
fn init_logging(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(log.ansi)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bench_args() {
        let cli = Cli::parse_from([
            "runloop", "bench", "--depth", "10", "--shape", "left-bind", "--context", "thread",
        ]);
        match cli.command {
            Commands::Bench {
                depth,
                iterations,
                shape,
                context,
            } => {
                assert_eq!(depth, Some(10));
                assert_eq!(iterations, None);
                assert_eq!(shape, Shape::LeftBind);
                assert_eq!(context, ContextKind::Thread);
            }
            _ => panic!("expected bench command"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["runloop", "config", "--config", "custom.toml"]);
        assert_eq!(cli.config.as_deref(), Some("custom.toml"));
        assert!(matches!(cli.command, Commands::Config));
    }
}
