//! ytoai: YtoAI model binding
//!
//! Adapts the YtoAI HTTP API (chat completion, streaming chat, embeddings,
//! image generation) to a small set of generic model traits, with typed
//! option merging, retry and observation decorators, and property-driven
//! wiring.
//!
//! # Quick Start
//!
//! ```no_run
//! use ytoai::prelude::*;
//!
//! # async fn example() -> ytoai::error::Result<()> {
//! let config = YtoAiConfig::load(None)?;
//! let models = YtoAiModels::from_config(&config).build()?;
//! let chat = models.chat.expect("chat model enabled");
//! let response = chat.call(Prompt::from_text("Hello!")).await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod model;
pub mod observation;
pub mod options;
pub mod prelude;
pub mod provider;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
