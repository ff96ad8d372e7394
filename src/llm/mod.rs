//! Language model access
//!
//! The pipeline talks to the model only through the `Generator` trait.

pub mod generator;
pub mod ollama;
pub mod paced;
pub mod retry;

pub use generator::{GenerationRequest, Generator, PromptKind};
pub use ollama::{OllamaClient, Temperatures};
pub use paced::{PacedGenerator, Pacer};
pub use retry::RetryPolicy;
