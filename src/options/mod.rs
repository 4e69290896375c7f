//! Provider-specific option sets and their typed merge rules.

pub mod chat;
pub mod embedding;
pub mod image;

pub use chat::YtoAiChatOptions;
pub use embedding::YtoAiEmbeddingOptions;
pub use image::YtoAiImageOptions;
