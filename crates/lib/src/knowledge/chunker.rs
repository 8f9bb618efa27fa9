//! Line-window chunking of extracted page text.

/// Splits one page of text into overlapping line windows.
///
/// Lines are trimmed and blank lines dropped. A window starts every
/// `window_size - overlap` lines (at least one), and each window holds up to
/// `window_size` lines joined with `\n`. The final windows may be shorter.
pub fn chunk_lines(text: &str, window_size: usize, overlap: usize) -> Vec<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let window_size = window_size.max(1);
    let step = window_size.saturating_sub(overlap).max(1);

    (0..lines.len())
        .step_by(step)
        .map(|start| {
            let end = (start + window_size).min(lines.len());
            lines[start..end].join("\n")
        })
        .collect()
}

/// Chunks every page in order, so chunk order follows page then line order.
pub fn chunk_pages(pages: &[String], window_size: usize, overlap: usize) -> Vec<String> {
    pages
        .iter()
        .flat_map(|page| chunk_lines(page, window_size, overlap))
        .collect()
}
