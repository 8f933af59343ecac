use crate::client::PaperHit;

/// Render hits as a Markdown reading list.
///
/// ```rust,ignore
/// let md = render_markdown("RAG", &hits);
/// assert!(md.starts_with("## Research Papers on RAG\n\n"));
/// ```
pub fn render_markdown(topic: &str, hits: &[PaperHit]) -> String {
    let mut markdown = format!("## Research Papers on {topic}\n\n");
    for hit in hits {
        let title = if hit.title.is_empty() { "No Title" } else { &hit.title };
        let link = if hit.link.is_empty() { "#" } else { &hit.link };
        let snippet = if hit.snippet.is_empty() { "No Description" } else { &hit.snippet };
        markdown.push_str(&format!("### [{title}]({link})\n{snippet}\n\n"));
    }
    markdown
}
