//! Prompts for LLM-based scientific translation.
//!
//! The translator contract lives here and nowhere else: translate the
//! natural-language text only, keep every formula, LaTeX span, table and
//! Markdown structure exactly as it is, and never summarise. The crate does
//! not enforce this contract; it trusts the returned text and hands it to the
//! document renderer.
//!
//! Callers can override the system prompt via
//! [`crate::config::TranslationConfig::system_prompt`]; the document text is
//! always sent through [`translation_request`].

/// Default system prompt. `{source}` and `{target}` are replaced with the
/// configured languages by [`system_prompt`].
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert in translating scientific and educational documents.

Your task: convert the following math / physics / chemistry / biology text from {source} into {target} while preserving all formulas, equations, tables, diagrams, LaTeX structures, and scientific notation exactly as they appear in the original text.

Requirements:

1. Translate ONLY the {source} text into {target}.

2. DO NOT alter any mathematical or chemical formulas. Keep variable symbols,
   indices, superscripts, subscripts, fractions, roots, limits, vectors,
   reaction arrows, etc. identical to the original.

3. Preserve Markdown and LaTeX structures: keep headings, bullet points,
   tables, and especially LaTeX blocks ($...$ and $$...$$) unchanged.

4. Do not summarise or rewrite. Provide a direct, accurate translation of the
   text content while leaving all non-textual and formulaic elements unchanged.

5. Output ONLY the translated text. Do NOT add commentary and do NOT wrap the
   output in code fences."#;

/// Fill the language placeholders of `template`.
pub fn system_prompt(template: &str, source: &str, target: &str) -> String {
    template
        .replace("{source}", source)
        .replace("{target}", target)
}

/// Wrap the document text in the user turn sent to the translator.
pub fn translation_request(source_language: &str, text: &str) -> String {
    format!("{source_language} text to translate:\n---\n{text}\n---")
}
