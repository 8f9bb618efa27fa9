//! Page text extraction for policy documents.

use super::KnowledgeError;
use std::path::Path;

/// Reads a document and returns its text, one entry per page.
///
/// Files with a `.pdf` extension are parsed as PDF; anything else is read as
/// UTF-8 text and treated as a single page.
pub async fn extract_pages(path: &Path) -> Result<Vec<String>, KnowledgeError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| KnowledgeError::Io {
            path: path.display().to_string(),
            source,
        })?;

    if is_pdf(path) {
        // PDF parsing is CPU-bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || extract_pdf_pages(&bytes[..]))
            .await
            .map_err(|e| KnowledgeError::PdfParse(format!("PDF parsing task failed: {e}")))?
    } else {
        Ok(vec![String::from_utf8_lossy(&bytes).into_owned()])
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

#[cfg(feature = "pdf")]
fn extract_pdf_pages(pdf_data: &[u8]) -> Result<Vec<String>, KnowledgeError> {
    use pdf::{
        content::{Op, TextDrawAdjusted},
        file::FileOptions,
    };
    use tracing::warn;

    let file = FileOptions::cached()
        .load(pdf_data)
        .map_err(|e| KnowledgeError::PdfParse(e.to_string()))?;
    let resolver = file.resolver();
    let mut pages = Vec::with_capacity(file.num_pages() as usize);

    for page_num in 0..file.num_pages() {
        let page = file
            .get_page(page_num)
            .map_err(|e| KnowledgeError::PdfParse(e.to_string()))?;
        let mut page_text = String::new();

        let Some(content) = &page.contents else {
            warn!(page = page_num, "Page has no content stream.");
            pages.push(page_text);
            continue;
        };
        let operations = content
            .operations(&resolver)
            .map_err(|e| KnowledgeError::PdfParse(e.to_string()))?;

        for op in operations.iter() {
            match op {
                Op::TextDraw { text } => page_text.push_str(&text.to_string_lossy()),
                Op::TextDrawAdjusted { array } => {
                    for item in array.iter() {
                        if let TextDrawAdjusted::Text(text) = item {
                            page_text.push_str(&text.to_string_lossy());
                        }
                    }
                }
                // Text positioning operators start a new output line.
                Op::TextNewline | Op::BeginText | Op::EndText | Op::SetTextMatrix { .. } => {
                    push_newline(&mut page_text)
                }
                Op::MoveTextPosition { translation } if translation.y != 0.0 => {
                    push_newline(&mut page_text)
                }
                _ => {}
            }
        }
        pages.push(page_text);
    }
    Ok(pages)
}

#[cfg(feature = "pdf")]
fn push_newline(text: &mut String) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf_pages(_pdf_data: &[u8]) -> Result<Vec<String>, KnowledgeError> {
    Err(KnowledgeError::PdfParse(
        "PDF support is disabled; enable the `pdf` feature".to_string(),
    ))
}
