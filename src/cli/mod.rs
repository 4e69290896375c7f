//! CLI entry point for ytoai.

use clap::{Parser, Subcommand};

/// YtoAI command line client
#[derive(Parser, Debug)]
#[command(name = "ytoai", version, about = "Chat, embed and generate images with YtoAI")]
pub struct Cli {
    /// Config file (defaults to ~/.ytoai/config.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chat with a model
    Chat(ChatArgs),
    /// Embed one or more texts
    Embed(EmbedArgs),
    /// Generate an image
    Image(ImageArgs),
}

/// Arguments for the `chat` subcommand.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Model to use (e.g. glm-4-air)
    #[arg(short, long)]
    pub model: Option<String>,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Temperature (0.0 - 1.0)
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Max tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Print partial responses as they arrive
    #[arg(long)]
    pub stream: bool,

    /// User prompt
    pub prompt: String,
}

/// Arguments for the `embed` subcommand.
#[derive(Parser, Debug)]
pub struct EmbedArgs {
    /// Model to use (e.g. embedding-3)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Output dimensions
    #[arg(short, long)]
    pub dimensions: Option<u32>,

    /// Texts to embed
    #[arg(required = true)]
    pub texts: Vec<String>,
}

/// Arguments for the `image` subcommand.
#[derive(Parser, Debug)]
pub struct ImageArgs {
    /// Model to use (e.g. cogview-3)
    #[arg(short, long)]
    pub model: Option<String>,

    /// End-user id forwarded to the API
    #[arg(short, long)]
    pub user: Option<String>,

    /// Image description
    pub prompt: String,
}
