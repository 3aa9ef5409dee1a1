use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use calculator::calc::Operation;
use calculator::config::{Config, LogFormat, LoggingConfig};

#[derive(Parser)]
#[command(
    name = "calculator",
    about = "Arithmetic HTTP service with a bounded, ordered invocation history",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Bind address (overrides the config file)
        #[arg(long)]
        bind: Option<String>,

        /// Path to a TOML config file (must load). Without it,
        /// CALCULATOR_CONFIG and /etc/calculator/calculator.toml are tried
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of history entries to retain
        #[arg(long, allow_negative_numbers = true)]
        max_history: Option<i64>,
    },

    /// Evaluate a single operation locally and print the result
    Calc {
        /// Operation: add|subtract|multiply|divide or + - * x /
        op: String,

        #[arg(allow_negative_numbers = true)]
        a: f64,

        #[arg(allow_negative_numbers = true)]
        b: f64,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            config,
            max_history,
        } => {
            let mut cfg = match &config {
                Some(path) => {
                    let cfg = Config::load(path)?;
                    init_tracing(&cfg.logging);
                    tracing::info!(path = %path.display(), "loaded calculator configuration");
                    cfg
                }
                None => {
                    let resolved = Config::load_or_default();
                    init_tracing(&resolved.config.logging);
                    resolved.report();
                    resolved.config
                }
            };

            cfg.apply_port_env();
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            if let Some(n) = max_history {
                cfg.history.max_history = n;
            }

            tracing::info!(bind = %cfg.server.bind, "Starting calculator");
            calculator::serve(cfg).await?;
        }
        Commands::Calc { op, a, b } => {
            init_tracing(&LoggingConfig {
                level: "warn".to_string(),
                ..LoggingConfig::default()
            });
            let op: Operation = op.parse()?;
            let result = op.apply(a, b)?;
            println!("{result}");
        }
    }

    Ok(())
}
