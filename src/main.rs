//! Conversation Featurizer CLI
//!
//! Computes chat-level and conversation-level features from a chat transcript.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use convo_featurizer::{
    config::Config,
    core::{FeatureBuilder, FeatureRegistry},
    report::create_shared_log,
    VERSION,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "convo-featurizer")]
#[command(version = VERSION)]
#[command(about = "Conversational feature extraction for chat transcripts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute chat-level and conversation-level features for a CSV transcript
    Featurize {
        /// Input CSV (one row per message)
        #[arg(long, short)]
        input: PathBuf,

        /// Chat-level output CSV (defaults to <output_dir>/<stem>_chat_level.csv)
        #[arg(long)]
        chat_output: Option<PathBuf>,

        /// Conversation-level output CSV (defaults to <output_dir>/<stem>_conversation_level.csv)
        #[arg(long)]
        conversation_output: Option<PathBuf>,

        /// Column holding the message text
        #[arg(long)]
        text_column: Option<String>,

        /// Compute features on a single thread
        #[arg(long)]
        sequential: bool,
    },

    /// List the features that are computed
    Features,

    /// Show configuration
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Featurize {
            input,
            chat_output,
            conversation_output,
            text_column,
            sequential,
        } => cmd_featurize(input, chat_output, conversation_output, text_column, sequential),
        Commands::Features => cmd_features(),
        Commands::Config => cmd_config(),
    }
}

fn cmd_featurize(
    input: PathBuf,
    chat_output: Option<PathBuf>,
    conversation_output: Option<PathBuf>,
    text_column: Option<String>,
    sequential: bool,
) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(text_column) = text_column {
        config.text_column = text_column;
    }
    if sequential {
        config.parallel = false;
    }

    let (default_chat, default_conversation) = config.output_paths_for(&input);
    let chat_output = chat_output.unwrap_or(default_chat);
    let conversation_output = conversation_output.unwrap_or(default_conversation);

    println!("Conversation Featurizer v{VERSION}");
    println!();
    println!("  Input: {}", input.display());
    println!("  Text column: {}", config.text_column);
    println!("  Parallel: {}", if config.parallel { "enabled" } else { "disabled" });
    println!();

    let log = create_shared_log();
    let mut builder = FeatureBuilder::new(&input, &chat_output, &conversation_output, config)
        .with_log(log.clone());
    let tables = builder
        .featurize()
        .with_context(|| format!("Failed to featurize {}", input.display()))?;

    println!(
        "Chat-level features ({} rows): {}",
        tables.chat.len(),
        chat_output.display()
    );
    println!(
        "Conversation-level features ({} rows): {}",
        tables.conversation.len(),
        conversation_output.display()
    );
    println!();
    println!("{}", log.summary());

    Ok(())
}

fn cmd_features() -> Result<()> {
    let registry = FeatureRegistry::standard();

    println!("Features");
    println!("========");
    println!();
    for descriptor in registry.describe() {
        let aggregations: Vec<&str> = descriptor
            .aggregations
            .iter()
            .map(|a| a.prefix())
            .collect();
        let context = descriptor
            .context
            .map(|c| {
                let scope = serde_json::to_string(&c).unwrap_or_default();
                format!(" [context: {}]", scope.trim_matches('"'))
            })
            .unwrap_or_default();
        println!(
            "  {:<40} {:<13} {}{}",
            descriptor.name,
            serde_json::to_string(&descriptor.level)?.trim_matches('"'),
            aggregations.join(", "),
            context
        );
    }

    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}
