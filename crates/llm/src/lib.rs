//! Generative-analysis backends.
//!
//! This crate provides one narrow contract, [`AnalysisBackend`] (prompt text
//! in, narrative text out), and an implementation per provider:
//!
//! - [`OpenAiBackend`] - OpenAI chat completions
//! - [`AnthropicBackend`] - Anthropic messages API
//! - [`OllamaBackend`] - local models served by Ollama
//!
//! The backend is chosen once, at construction, from [`LlmConfig::provider`]:
//!
//! ```no_run
//! use llm::{build_backend, AnalysisBackend, LlmConfig};
//!
//! # async fn run() -> Result<(), llm::BackendError> {
//! let backend = build_backend(&LlmConfig::from_env())?;
//! let narrative = backend.analyze("Why is checkout slow?").await?;
//! println!("{narrative}");
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod anthropic;
pub mod backend;
pub mod config;
pub mod error;
pub mod factory;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicBackend;
pub use backend::AnalysisBackend;
pub use config::{LlmConfig, ProviderKind};
pub use error::{BackendError, BackendResult};
pub use factory::build_backend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;
