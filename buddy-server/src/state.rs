use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use buddy_auth::UserStore;
use buddy_model::{GeminiClient, ModelRouter, OpenAIClient, OpenAIConfig};
use buddy_rag::{GeminiEmbeddingProvider, PersistentVectorStore, RagPipeline};
use buddy_search::PaperSearch;
use tracing::info;

use crate::config::ServerConfig;

/// Shared handles behind every request.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
    pub users: UserStore,
    pub search: Arc<PaperSearch>,
    pub upload_dir: PathBuf,
}

impl AppState {
    /// Wire the production providers: Gemini for `gemini*` models and
    /// embeddings, Groq for `llama*`, Google Custom Search for papers.
    pub async fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let gemini = GeminiClient::new(&config.google_api_key).context("failed to create Gemini client")?;
        let groq = OpenAIClient::new(OpenAIConfig::groq(&config.groq_api_key))
            .context("failed to create Groq client")?;
        let router = ModelRouter::new().route("gemini", Arc::new(gemini)).route("llama", Arc::new(groq));

        let embedder = GeminiEmbeddingProvider::new(&config.google_api_key)
            .context("failed to create embedding provider")?
            .with_model(&config.rag.embed_model);
        let store = PersistentVectorStore::open(&config.vector_db_dir)
            .with_deduplication(config.deduplicate_chunks);

        let pipeline = RagPipeline::builder()
            .config(config.rag.clone())
            .embedding_provider(Arc::new(embedder))
            .vector_store(Arc::new(store))
            .llm(Arc::new(router))
            .build()
            .context("failed to build RAG pipeline")?;

        let users = UserStore::connect(&config.database_url)
            .await
            .with_context(|| format!("failed to open user database {}", config.database_url))?;

        let search = PaperSearch::new(&config.cse_api_key, &config.cse_id, config.search.clone())
            .context("failed to create paper search client")?;

        info!(
            upload_dir = %config.upload_dir.display(),
            vector_db_dir = %config.vector_db_dir.display(),
            "application state ready"
        );
        Ok(Self {
            pipeline: Arc::new(pipeline),
            users,
            search: Arc::new(search),
            upload_dir: config.upload_dir.clone(),
        })
    }
}
