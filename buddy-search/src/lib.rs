//! # buddy-search
//!
//! Related-paper keyword search for Research Buddy, backed by the Google
//! Custom Search JSON API.
//!
//! ```rust,ignore
//! use buddy_search::{PaperSearch, SearchConfig, render_markdown};
//!
//! let search = PaperSearch::new(api_key, engine_id, SearchConfig::default())?;
//! let hits = search.search("retrieval augmented generation").await?;
//! println!("{}", render_markdown("retrieval augmented generation", &hits));
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod markdown;

pub use client::{CUSTOM_SEARCH_API_BASE, PaperHit, PaperSearch};
pub use config::{Backend, MAX_RESULTS_LIMIT, SafeSearch, SearchConfig, TimeLimit};
pub use error::{Result, SearchError};
pub use markdown::render_markdown;
