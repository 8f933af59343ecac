//! Generation parameters.

use serde::{Deserialize, Serialize};

/// Sampling temperature used for every task.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Sampling parameters sent along with a prompt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GenerationParams {
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling probability mass. Provider default when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Upper bound on generated tokens. Provider default when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self { temperature: DEFAULT_TEMPERATURE, top_p: None, max_output_tokens: None }
    }
}

impl GenerationParams {
    /// Derive parameters from the number of chunks a document was split into.
    ///
    /// Longer documents get a wider nucleus and a larger output budget:
    ///
    /// - `top_p = clamp(0.7 + (doc_length / 100) * 0.2, 0.7, 0.9)`
    /// - `max_output_tokens = clamp(doc_length * 100, 1024, 4096)`
    pub fn for_document_length(doc_length: usize) -> Self {
        let top_p = (0.7 + (doc_length as f32 / 100.0) * 0.2).clamp(0.7, 0.9);
        let max_output_tokens = doc_length.saturating_mul(100).clamp(1024, 4096) as u32;
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_p: Some(top_p),
            max_output_tokens: Some(max_output_tokens),
        }
    }
}
