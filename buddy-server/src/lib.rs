//! `buddy-server` is the Research Buddy HTTP service: document summaries and
//! reports, question answering over uploaded files, paper recommendations and
//! user accounts, served by axum.

pub mod config;
pub mod error;
pub mod server;
pub mod state;
pub mod telemetry;
pub mod upload;

pub use config::ServerConfig;
pub use error::ApiError;
pub use server::{MAX_UPLOAD_BYTES, app_router, run_server};
pub use state::AppState;
