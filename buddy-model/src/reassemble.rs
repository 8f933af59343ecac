//! Turning a fragment stream back into one response.

use futures::StreamExt;
use tracing::error;

use crate::error::Result;
use crate::llm::FragmentStream;

/// Concatenate every fragment in emission order.
///
/// No deduplication or reordering happens. The first error aborts collection
/// and is returned unchanged, so the provider diagnostic survives.
pub async fn collect_fragments(mut stream: FragmentStream) -> Result<String> {
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        match fragment {
            Ok(fragment) => text.push_str(&fragment),
            Err(e) => {
                error!(error = %e, received = text.len(), "generation stream failed");
                return Err(e);
            }
        }
    }
    Ok(text)
}

/// Repair the Markdown quirks models tend to produce.
///
/// - `##Heading` becomes `## Heading`
/// - every heading gets a blank line before it
/// - three or more consecutive newlines collapse to two
pub fn fix_markdown(text: &str) -> String {
    let spaced = text.split('\n').map(space_heading).collect::<Vec<_>>().join("\n");
    let mut fixed = spaced.replace("\n#", "\n\n#");
    while fixed.contains("\n\n\n") {
        fixed = fixed.replace("\n\n\n", "\n\n");
    }
    fixed
}

fn space_heading(line: &str) -> String {
    let hashes = line.len() - line.trim_start_matches('#').len();
    if hashes == 0 {
        return line.to_string();
    }
    let rest = &line[hashes..];
    if rest.trim().is_empty() || rest.starts_with(' ') {
        return line.to_string();
    }
    format!("{} {}", &line[..hashes], rest.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use futures::stream;

    #[tokio::test]
    async fn collects_in_order() {
        let stream: FragmentStream =
            Box::pin(stream::iter(vec![Ok("The ".to_string()), Ok("end".to_string())]));
        assert_eq!(collect_fragments(stream).await.unwrap(), "The end");
    }

    #[tokio::test]
    async fn empty_stream_yields_empty_text() {
        let stream: FragmentStream = Box::pin(stream::iter(Vec::<Result<String>>::new()));
        assert_eq!(collect_fragments(stream).await.unwrap(), "");
    }

    #[tokio::test]
    async fn first_error_aborts() {
        let stream: FragmentStream = Box::pin(stream::iter(vec![
            Ok("partial".to_string()),
            Err(ModelError::generation("Gemini", "quota exceeded")),
            Ok("never seen".to_string()),
        ]));
        let err = collect_fragments(stream).await.unwrap_err();
        match err {
            ModelError::Generation { provider, message } => {
                assert_eq!(provider, "Gemini");
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn adds_space_after_heading_marks() {
        assert_eq!(fix_markdown("##Summary"), "## Summary");
        assert_eq!(fix_markdown("# Already fine"), "# Already fine");
        assert_eq!(fix_markdown("###"), "###");
    }

    #[test]
    fn separates_headings_from_paragraphs() {
        assert_eq!(fix_markdown("intro\n## Findings\n- a"), "intro\n\n## Findings\n- a");
    }

    #[test]
    fn collapses_extra_blank_lines() {
        assert_eq!(fix_markdown("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(fix_markdown("a\n\n\n#B"), "a\n\n# B");
    }

    #[test]
    fn leaves_plain_text_alone() {
        let text = "- point one\n- point two";
        assert_eq!(fix_markdown(text), text);
    }
}
