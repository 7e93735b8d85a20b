use anyhow::Result;
use clap::{Parser, Subcommand};
use stash_common::ExtractConfig;
use stash_extract::{canonicalize, classify, ContentExtraction, ContentExtractor};
use tracing_subscriber::EnvFilter;

/// Diagnostic front end for the extraction stack.
#[derive(Parser)]
#[command(name = "stash-extract", about = "Canonicalize, classify, and extract saved URLs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the canonical form of a URL
    Canonicalize { url: String },
    /// Print the platform a URL belongs to
    Classify { url: String },
    /// Run the full extraction and print the result as JSON
    Extract { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("stash=info".parse()?))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Canonicalize { url } => println!("{}", canonicalize(&url)),
        Command::Classify { url } => println!("{}", classify(&url)),
        Command::Extract { url } => {
            let config = ExtractConfig::from_env();
            config.log_summary();
            let extractor = ContentExtractor::from_config(config)?;
            let content = extractor.extract(&url).await?;
            println!("{}", serde_json::to_string_pretty(&content)?);
        }
    }
    Ok(())
}
