//! Multi-page output rendering

/// Literal marker placed between consecutive pages
///
/// Downstream consumers split on this exact text.
pub const PAGE_SPLIT_MARKER: &str = "<--- Page Split --->";

/// Join per-page text into one markdown document
///
/// Each page is preceded by a 1-based `## Page <n>` header; consecutive pages
/// are separated by [`PAGE_SPLIT_MARKER`]. An empty page list renders as an
/// empty string.
pub fn render_document(pages: &[String]) -> String {
    let separator = format!("\n\n{PAGE_SPLIT_MARKER}\n\n");
    pages
        .iter()
        .enumerate()
        .map(|(idx, text)| format!("## Page {}\n\n{}", idx + 1, text))
        .collect::<Vec<_>>()
        .join(&separator)
}
