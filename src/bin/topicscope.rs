use std::io::{self, Read, Write};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use topicscope::{EngineArgs, ModelManager, DEFAULT_OUT_TOP_N, DEFAULT_TERM_TOP_N};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "topicscope",
    version,
    about = "Expand transcript terms with a wiki-trained word2vec model and match them to topics"
)]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    /// Pretty-print JSON output
    #[arg(long, global = true, default_value_t = false)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train from the corpus dump and overwrite the persisted artifacts
    Train,
    /// Match topics for free text, explicit terms, or stdin
    Query(QueryArgs),
    /// Print the nearest neighbors of the given terms
    Expand(ExpandArgs),
    /// Print the tokens a text normalizes to (reads stdin when no text is given)
    Tokenize {
        /// Text to tokenize
        text: Option<String>,
    },
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Free text to tokenize before matching
    #[arg(long, conflicts_with = "terms")]
    text: Option<String>,

    /// Comma-separated terms used as-is (no stopword filtering)
    #[arg(long, value_delimiter = ',')]
    terms: Vec<String>,

    /// Maximum number of topics returned
    #[arg(long, default_value_t = DEFAULT_OUT_TOP_N)]
    out_top_n: usize,

    /// Number of neighbor terms added to the query
    #[arg(long, default_value_t = DEFAULT_TERM_TOP_N)]
    term_top_n: usize,
}

#[derive(Args, Debug)]
struct ExpandArgs {
    /// Seed terms
    #[arg(required = true)]
    terms: Vec<String>,

    /// Number of neighbors to print
    #[arg(long, default_value_t = DEFAULT_TERM_TOP_N)]
    top_n: usize,
}

#[derive(Serialize)]
struct Neighbor {
    term: String,
    similarity: f32,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.engine.build_config();
    let manager = ModelManager::new(config).context("failed to prepare the topic engine")?;

    match cli.command {
        Command::Train => {
            manager
                .retrain()
                .context("training from the corpus dump failed")?;
            let artifacts = &manager.config().artifacts;
            info!(
                dictionary = %artifacts.dictionary.display(),
                model = %artifacts.model.display(),
                "training complete"
            );
        }
        Command::Query(args) => {
            let query = if !args.terms.is_empty() {
                let (topics, keywords) = manager
                    .query_topics_from_raw(&args.terms, args.out_top_n, args.term_top_n)
                    .context("topic query failed")?;
                topicscope::TopicQuery { topics, keywords }
            } else {
                let text = match args.text {
                    Some(text) => text,
                    None => read_stdin()?,
                };
                manager
                    .query_text(&text, args.out_top_n, args.term_top_n)
                    .context("topic query failed")?
            };
            emit(&query, cli.pretty)?;
        }
        Command::Expand(args) => {
            let handle = manager.handle().context("model initialization failed")?;
            let neighbors: Vec<Neighbor> = handle
                .expander()
                .expand_scored(&args.terms, args.top_n)
                .into_iter()
                .map(|(term, similarity)| Neighbor { term, similarity })
                .collect();
            emit(&neighbors, cli.pretty)?;
        }
        Command::Tokenize { text } => {
            let text = match text {
                Some(text) => text,
                None => read_stdin()?,
            };
            emit(&manager.normalizer().normalize(&text), cli.pretty)?;
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("failed to read query text from stdin")?;
    if text.trim().is_empty() {
        bail!("no query text given: pass --text, --terms, or pipe text on stdin");
    }
    Ok(text)
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if pretty {
        serde_json::to_writer_pretty(&mut out, value)?;
    } else {
        serde_json::to_writer(&mut out, value)?;
    }
    writeln!(out)?;
    Ok(())
}
