use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use pdf_rag::Result;
use pdf_rag::commands::{ingest, print_ingest_report, print_query_outcome, query};
use pdf_rag::config::{Config, show_config};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pdf-rag")]
#[command(about = "Question answering over a PDF with a local vector index and Ollama")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml; relative paths in the config resolve against it
    #[arg(long, global = true, env = "PDF_RAG_HOME", default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the PDF if missing, then build the vector index
    Ingest,
    /// Answer a question from the vector index
    Query {
        /// The question to ask
        query: String,
        /// Query an index built with a different embedding model
        #[arg(long)]
        allow_model_mismatch: bool,
    },
    /// Show the effective configuration
    Config {
        /// Write the default config.toml into the config directory
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest => {
            let config = Config::load(&cli.config_dir)?;
            let report = ingest(&config).await?;
            print_ingest_report(&report);
        }
        Commands::Query {
            query: question,
            allow_model_mismatch,
        } => {
            let config = Config::load(&cli.config_dir)?;
            let outcome = query(&config, &question, allow_model_mismatch).await?;
            print_query_outcome(&outcome);
        }
        Commands::Config { init } => {
            if init {
                let config = Config {
                    base_dir: cli.config_dir.clone(),
                    ..Config::default()
                };
                let path = config.config_file_path();
                if path.exists() {
                    return Err(anyhow!("{} already exists", path.display()).into());
                }
                config.save()?;
                println!("Wrote default configuration to {}", path.display());
            } else {
                show_config(&Config::load(&cli.config_dir)?)?;
            }
        }
    }

    Ok(())
}
