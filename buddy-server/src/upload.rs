//! Saving uploaded files.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

/// Which feature an upload belongs to; selects its subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Summary,
    Report,
    Question,
}

impl UploadKind {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Summary => "sum_uploads",
            Self::Report => "report_uploads",
            Self::Question => "qa_uploads",
        }
    }
}

/// Reduce a client-supplied file name to a safe single path component.
///
/// Path separators become spaces, whitespace runs become `_`, anything but
/// ASCII letters, digits, `_`, `.` and `-` is dropped, and leading/trailing
/// `.` and `_` are stripped. May return an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name.chars().map(|c| if c == '/' || c == '\\' { ' ' } else { c }).collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Write `bytes` to `{root}/{kind}_uploads/{timestamp}_{name}` and return
/// the saved file name and full path. The saved name always ends in
/// `.{extension}`.
pub async fn save_upload(
    root: &Path,
    kind: UploadKind,
    original_name: &str,
    extension: &str,
    bytes: &[u8],
) -> anyhow::Result<(String, PathBuf)> {
    let dir = root.join(kind.dir_name());
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("failed to create upload directory {}", dir.display()))?;

    let mut name = sanitize_filename(original_name);
    if name.is_empty() {
        name = "upload".to_string();
    }
    if !name.to_ascii_lowercase().ends_with(&format!(".{extension}")) {
        name = format!("{name}.{extension}");
    }
    let saved_name = format!("{}_{name}", chrono::Utc::now().timestamp());
    let path = dir.join(&saved_name);
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("failed to save upload {}", path.display()))?;
    debug!(path = %path.display(), size = bytes.len(), "saved upload");
    Ok((saved_name, path))
}
