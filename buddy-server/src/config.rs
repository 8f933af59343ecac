//! Server configuration from the environment.

use std::path::PathBuf;

use anyhow::{Context, bail};
use buddy_rag::RagConfig;
use buddy_search::SearchConfig;

/// Everything the service needs at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Root of the `{sum,report,qa}_uploads` directories.
    pub upload_dir: PathBuf,
    pub vector_db_dir: PathBuf,
    pub database_url: String,
    pub google_api_key: String,
    pub groq_api_key: String,
    pub cse_api_key: String,
    pub cse_id: String,
    pub rag: RagConfig,
    pub search: SearchConfig,
    pub deduplicate_chunks: bool,
}

impl ServerConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            var(key).with_context(|| format!("environment variable {key} must be set"))
        };

        let port = match var("BUDDY_PORT") {
            Some(port) => port.parse::<u16>().with_context(|| format!("invalid BUDDY_PORT '{port}'"))?,
            None => 5000,
        };

        let rag = match var("BUDDY_RAG_CONFIG") {
            Some(path) => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read RAG config {path}"))?;
                let rag: RagConfig = serde_json::from_str(&contents)
                    .with_context(|| format!("failed to parse RAG config {path}"))?;
                rag.validate().with_context(|| format!("invalid RAG config {path}"))?;
                rag
            }
            None => RagConfig::default(),
        };

        let search = match var("BUDDY_SEARCH_CONFIG") {
            Some(path) => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read search config {path}"))?;
                let search: SearchConfig = serde_json::from_str(&contents)
                    .with_context(|| format!("failed to parse search config {path}"))?;
                search.validate().with_context(|| format!("invalid search config {path}"))?;
                search
            }
            None => SearchConfig::default(),
        };

        let deduplicate_chunks = match var("BUDDY_DEDUPLICATE_CHUNKS").as_deref() {
            None => false,
            Some("1" | "true" | "TRUE" | "yes") => true,
            Some("0" | "false" | "FALSE" | "no") => false,
            Some(other) => bail!("invalid BUDDY_DEDUPLICATE_CHUNKS '{other}'"),
        };

        Ok(Self {
            host: var("BUDDY_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            upload_dir: var("BUDDY_UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()).into(),
            vector_db_dir: var("BUDDY_VECTOR_DB_DIR")
                .unwrap_or_else(|| "vector_db".to_string())
                .into(),
            database_url: var("BUDDY_DATABASE_URL")
                .unwrap_or_else(|| "sqlite://research_buddy.db".to_string()),
            google_api_key: required("GOOGLE_API_KEY")?,
            groq_api_key: required("GROQ_API_KEY")?,
            cse_api_key: required("GOOGLE_CSE_API_KEY")?,
            cse_id: required("GOOGLE_CSE_ID")?,
            rag,
            search,
            deduplicate_chunks,
        })
    }
}
