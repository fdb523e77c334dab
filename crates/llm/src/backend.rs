//! The backend capability trait.
//!
//! A backend turns prompt text into narrative text. Everything else
//! (prompt construction, result shaping, cancellation scopes) belongs to the
//! caller, so implementations stay as thin as the provider API allows.

use async_trait::async_trait;

use crate::error::BackendResult;

/// Trait for generative-analysis backends.
///
/// All backends (OpenAI, Anthropic, Ollama) implement this trait and are
/// interchangeable behind `Arc<dyn AnalysisBackend>`.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Provider name (e.g., "openai", "anthropic", "ollama").
    fn name(&self) -> &'static str;

    /// Model the backend sends requests to.
    fn model(&self) -> &str;

    /// Send a single prompt and return the raw response text.
    ///
    /// Dropping the returned future aborts the in-flight request.
    async fn analyze(&self, prompt: &str) -> BackendResult<String>;
}
