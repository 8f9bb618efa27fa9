//! # Prompt Templates
//!
//! The generation stage renders a system prompt from a template holding the
//! `{context_str}` and `{rag_str}` placeholders. Deployments ship their own
//! template file; this is the built-in fallback.

/// Used when the configured template file cannot be read.
///
/// Placeholders: `{context_str}`, `{rag_str}`
pub const DEFAULT_FALLBACK_TEMPLATE: &str = "Context: {context_str}. Info: {rag_str}";

/// Substitutes the context block and retrieved passages into `template`.
///
/// Any other braces in the template are left untouched.
pub fn render_template(template: &str, context_str: &str, rag_str: &str) -> String {
    template
        .replace("{context_str}", context_str)
        .replace("{rag_str}", rag_str)
}

/// Renders retrieved passages as `- {passage}` lines.
pub fn format_passages(passages: &[String]) -> String {
    passages
        .iter()
        .map(|passage| format!("- {passage}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_template_renders_both_sections() {
        let rendered = render_template(DEFAULT_FALLBACK_TEMPLATE, "User: Guest", "- Be kind");
        assert_eq!(rendered, "Context: User: Guest. Info: - Be kind");
    }

    #[test]
    fn unrelated_braces_survive() {
        let rendered = render_template("{greeting} {context_str}", "ctx", "");
        assert_eq!(rendered, "{greeting} ctx");
    }

    #[test]
    fn passages_become_bullets() {
        let passages = vec!["one".to_string(), "two\nlines".to_string()];
        assert_eq!(format_passages(&passages), "- one\n- two\nlines");
        assert_eq!(format_passages(&[]), "");
    }
}
