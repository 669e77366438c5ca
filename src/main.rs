use std::io::Read;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use mql::{Context, Engine, EngineConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mql")]
#[command(about = "Run MQL queries over JSON data", long_about = None)]
struct Args {
    /// Query text (read from stdin when neither QUERY nor --file is given)
    query: Option<String>,

    /// Read the query from a file
    #[arg(short, long, conflicts_with = "query")]
    file: Option<PathBuf>,

    /// JSON object whose top-level keys become context variables
    #[arg(short, long, env = "MQL_CONTEXT")]
    context: Option<PathBuf>,

    /// Threads in the async join pool
    #[arg(long)]
    worker_threads: Option<usize>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mql=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let text = match (&args.query, &args.file) {
        (Some(query), _) => query.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading query file {}", path.display()))?,
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading query from stdin")?;
            buf
        }
    };

    let context = match &args.context {
        Some(path) => Context::from_json_file(path)
            .with_context(|| format!("loading context {}", path.display()))?,
        None => Context::default(),
    };

    let mut config = EngineConfig::default();
    if let Some(threads) = args.worker_threads {
        config.worker_threads = threads.max(1);
    }
    tracing::debug!("Engine config: {:?}", config);

    let engine = Engine::with_config(config);
    let results = engine.execute_text(&text, &context)?;

    let output = if args.pretty {
        serde_json::to_string_pretty(&results)?
    } else {
        serde_json::to_string(&results)?
    };
    println!("{}", output);

    Ok(())
}
