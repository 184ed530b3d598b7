use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use mail_ingest::config::{Config, load_config, load_config_from, resolve_index_path, resolve_watch_dir};
use mail_ingest::daemon::{DaemonConfig, run_daemon};
use mail_ingest::domain::email::{MetadataProfile, Outcome};
use mail_ingest::ingest::Pipeline;
use mail_ingest::remote::{RagClient, UploadMode};
use mail_ingest::store::JsonIndex;

#[derive(Parser)]
#[command(name = "mail_ingest")]
#[command(about = "Watch a directory for email files and feed them to a retrieval service", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/mail_ingest/config.toml)
    #[arg(long, env = "MAIL_INGEST_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Retrieval service base URL
    #[arg(long, env = "MAIL_INGEST_SERVICE_URL", global = true)]
    service_url: Option<String>,

    /// Processed index file
    #[arg(long, env = "MAIL_INGEST_INDEX", global = true)]
    index: Option<PathBuf>,

    /// Metadata richness and upload transport
    #[arg(long, value_enum, env = "MAIL_INGEST_VARIANT", global = true)]
    variant: Option<MetadataProfile>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process existing files, then watch for new ones until Ctrl+C
    Watch {
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Wait before reading a newly created file
        #[arg(long)]
        grace_ms: Option<u64>,
    },

    /// Process every email file under a directory once
    Scan {
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Process a single email file
    File { path: PathBuf },

    /// Show processing statistics
    Stats,

    /// List documents held by the service
    List,

    /// Delete a document from the service
    Delete { id: String },

    /// Ask the service a question over ingested mail
    Query {
        question: String,

        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
    .map_err(|e| anyhow!("Configuration error: {e}"))?;
    apply_overrides(&mut cfg, &cli);

    let service_url = cfg.service_url()?;
    let client = RagClient::new(&service_url, cfg.timeout(), UploadMode::from(cfg.variant))?;

    match cli.cmd {
        Command::List => {
            println!("{}", serde_json::to_string_pretty(&client.list()?)?);
            Ok(())
        }

        Command::Delete { id } => {
            client.delete(&id)?;
            println!("Deleted {id}");
            Ok(())
        }

        Command::Query { question, top_k } => {
            let answer = client.query(&question, top_k, None, None)?;
            println!("{}", serde_json::to_string_pretty(&answer)?);
            Ok(())
        }

        Command::Stats => {
            let pipeline = open_pipeline(&cfg, client)?;
            println!("{}", serde_json::to_string_pretty(&pipeline.stats())?);
            Ok(())
        }

        Command::File { path } => {
            let mut pipeline = open_pipeline(&cfg, client)?;
            match pipeline.process_file(&path) {
                Outcome::Processed => println!("Successfully processed: {}", path.display()),
                Outcome::Skipped => println!("Already processed: {}", path.display()),
                Outcome::Failed(e) => return Err(anyhow!("Failed to process {}: {e}", path.display())),
            }
            Ok(())
        }

        Command::Scan { dir } => {
            let dir = match dir {
                Some(d) => d,
                None => resolve_watch_dir(&cfg)?,
            };
            let mut pipeline = open_pipeline(&cfg, client)?;
            let count = pipeline.process_directory(&dir);
            println!("Processed {count} emails from {}", dir.display());
            Ok(())
        }

        Command::Watch { dir, grace_ms } => {
            if let Some(ms) = grace_ms {
                cfg.grace_ms = ms;
            }
            let watch_dir = match dir {
                Some(d) => d,
                None => resolve_watch_dir(&cfg)?,
            };
            let mut pipeline = open_pipeline(&cfg, client)?;
            run_daemon(
                &mut pipeline,
                DaemonConfig {
                    watch_dir,
                    grace: cfg.grace(),
                },
            )
        }
    }
}

fn apply_overrides(cfg: &mut Config, cli: &Cli) {
    if let Some(url) = &cli.service_url {
        cfg.service_url = url.clone();
    }
    if let Some(index) = &cli.index {
        cfg.index_path = Some(index.display().to_string());
    }
    if let Some(variant) = cli.variant {
        cfg.variant = variant;
    }
}

fn open_pipeline(cfg: &Config, client: RagClient) -> Result<Pipeline<RagClient, JsonIndex>> {
    let index_path = resolve_index_path(cfg)?;
    let store = JsonIndex::load(&index_path);
    Ok(Pipeline::new(client, store, cfg.variant).with_retry(cfg.retry_policy()))
}
