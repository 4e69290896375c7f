//! ytoai CLI binary entry point.

use std::io::Write;

use clap::Parser;
use futures::StreamExt;
use ytoai::cli::{ChatArgs, Cli, Commands, EmbedArgs, ImageArgs};
use ytoai::model::{EmbeddingOptions, ImageOptions};
use ytoai::prelude::*;

type CliResult = std::result::Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match YtoAiConfig::load(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Commands::Chat(args) => handle_chat(&config, args).await,
            Commands::Embed(args) => handle_embed(&config, args).await,
            Commands::Image(args) => handle_image(&config, args).await,
        },
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn models(config: &YtoAiConfig) -> Result<YtoAiModels> {
    YtoAiModels::from_config(config).build()
}

async fn handle_chat(config: &YtoAiConfig, args: ChatArgs) -> CliResult {
    let chat = models(config)?
        .chat
        .ok_or("chat model is disabled in the configuration")?;

    let mut messages = Vec::new();
    if let Some(system) = args.system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(args.prompt));

    let options = ChatOptions {
        model: args.model,
        temperature: args.temperature,
        max_tokens: args.max_tokens,
        ..Default::default()
    };
    let prompt = Prompt::new(messages).with_options(options);

    if args.stream {
        let mut stream = chat.stream(prompt);
        while let Some(chunk) = stream.next().await {
            print!("{}", chunk?.text());
            let _ = std::io::stdout().flush();
        }
        println!();
    } else {
        let response = chat.call(prompt).await?;
        println!("{}", response.text());
        let usage = response.metadata.usage;
        if !usage.is_empty() {
            eprintln!(
                "tokens: prompt={} generation={} total={}",
                usage.prompt_tokens, usage.generation_tokens, usage.total_tokens
            );
        }
    }

    Ok(())
}

async fn handle_embed(config: &YtoAiConfig, args: EmbedArgs) -> CliResult {
    let embedding = models(config)?
        .embedding
        .ok_or("embedding model is disabled in the configuration")?;

    let request = EmbeddingRequest::new(args.texts).with_options(EmbeddingOptions {
        model: args.model,
        dimensions: args.dimensions,
    });
    let response = embedding.call(request).await?;
    for item in &response.embeddings {
        println!("{}", serde_json::to_string(&item.output)?);
    }
    eprintln!(
        "model={} total_tokens={}",
        response.metadata.model, response.metadata.usage.total_tokens
    );

    Ok(())
}

async fn handle_image(config: &YtoAiConfig, args: ImageArgs) -> CliResult {
    let image = models(config)?
        .image
        .ok_or("image model is disabled in the configuration")?;

    let prompt = ImagePrompt::new(args.prompt).with_options(ImageOptions {
        model: args.model,
        user: args.user,
        ..Default::default()
    });
    let response = image.call(prompt).await?;
    if response.generations.is_empty() {
        eprintln!("No image returned");
    }
    for generation in &response.generations {
        if let Some(url) = &generation.output.url {
            println!("{url}");
        }
    }

    Ok(())
}
