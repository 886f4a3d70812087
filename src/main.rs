use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tabsql::config::Config;
use tabsql::ingestion::{CompositeObserver, ConversionObserver, FileObserver, TracingObserver};
use tabsql::pipeline::Converter;

#[derive(Debug, Parser)]
#[command(name = "tabsql", version, about = "Convert table files into a SQLite database")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read table files (.xlsx, .tsv, .csv) and write a SQLite database file.
    Gen {
        /// Output database file. Existing content is removed.
        db_file: PathBuf,

        /// Config file (default: ./.tabsql.toml when present).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Local source directory (overrides the config).
        #[arg(long)]
        local: Option<PathBuf>,

        /// Remote git repository (overrides the config).
        #[arg(long, conflicts_with = "local")]
        repo: Option<String>,

        /// Branch or tag to check out from the remote repository.
        #[arg(long)]
        refs: Option<String>,

        /// Also append conversion events to this file.
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command {
        Command::Gen {
            db_file,
            config,
            local,
            repo,
            refs,
            log_file,
        } => {
            let mut cfg = Config::load(config.as_deref()).context("failed to load config")?;
            if let Some(path) = local {
                cfg.local.path = Some(path);
            }
            if let Some(repo) = repo {
                cfg.local.path = None;
                cfg.remote.repo = Some(repo);
            }
            if let Some(refs) = refs {
                cfg.remote.refs = Some(refs);
            }

            let tracing_observer: Arc<dyn ConversionObserver> = Arc::new(TracingObserver);
            let observer: Arc<dyn ConversionObserver> = match log_file {
                Some(path) => {
                    let file_observer: Arc<dyn ConversionObserver> = Arc::new(FileObserver::new(path));
                    Arc::new(CompositeObserver::new(vec![tracing_observer, file_observer]))
                }
                None => tracing_observer,
            };

            tracing::info!(db = %db_file.display(), "generating database");
            Converter::new(&cfg)
                .with_observer(observer)
                .convert(&db_file)
                .with_context(|| format!("failed to generate {}", db_file.display()))?;
        }
    }

    Ok(())
}
