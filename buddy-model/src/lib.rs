//! # buddy-model
//!
//! Streaming LLM clients for Research Buddy.
//!
//! The [`Llm`] trait is the seam every generation goes through. Providers
//! stream fragments; [`collect_fragments`] reassembles them and
//! [`fix_markdown`] cleans up summaries.
//!
//! ## Features
//!
//! - `gemini` (default): [`gemini::GeminiClient`] for the Generative Language API
//! - `openai` (default): [`openai::OpenAIClient`] for OpenAI-compatible APIs such as Groq

pub mod catalog;
pub mod error;
pub mod llm;
pub mod mock;
pub mod params;
pub mod reassemble;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "openai")]
pub mod openai;

pub use catalog::{ModelCatalog, ModelRouter};
pub use error::{ModelError, Result};
pub use llm::{FragmentStream, GenerationRequest, Llm};
pub use mock::MockLlm;
pub use params::{DEFAULT_TEMPERATURE, GenerationParams};
pub use reassemble::{collect_fragments, fix_markdown};

#[cfg(feature = "gemini")]
pub use gemini::GeminiClient;
#[cfg(feature = "openai")]
pub use openai::{OpenAIClient, OpenAIConfig};
