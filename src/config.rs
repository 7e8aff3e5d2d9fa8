//! Configuration types for document translation.
//!
//! All session behaviour is controlled through [`TranslationConfig`], built
//! via its [`TranslationConfigBuilder`]. One struct for every knob keeps the
//! CLI mapping trivial and lets two runs be compared field by field.

use crate::error::TranslateError;
use crate::pipeline::formula::FormulaRenderer;
use crate::pipeline::translate::Translator;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for one translation session.
///
/// Built via [`TranslationConfig::builder()`] or using
/// [`TranslationConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_scitranslate::TranslationConfig;
///
/// let config = TranslationConfig::builder()
///     .source_language("Vietnamese")
///     .target_language("English")
///     .reconstruct_delay_ms(0)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct TranslationConfig {
    /// LLM model identifier, e.g. "gemini-2.5-flash", "gpt-4.1-mini".
    /// If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Custom translator. Takes precedence over every LLM setting above.
    pub translator: Option<Arc<dyn Translator>>,

    /// Language of the uploaded document. Default: "Vietnamese".
    pub source_language: String,

    /// Language to translate into. Default: "English".
    pub target_language: String,

    /// Sampling temperature for the LLM completion. Default: 0.1.
    ///
    /// Translation should be faithful, not creative.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate for the whole document. Default: 16384.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses the built-in scientific prompt.
    pub system_prompt: Option<String>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Separator inserted between pages during extraction. Default: blank line.
    pub page_separator: PageSeparator,

    /// Format shown on the download action. Default: [`OutputFormat::Docx`].
    ///
    /// Only the label changes; the download artifact is always plain text.
    pub output_format: OutputFormat,

    /// Pause in the `Reconstructing` stage, in milliseconds. Default: 500.
    pub reconstruct_delay_ms: u64,

    /// Timeout for the translation call in seconds. Default: 180.
    pub api_timeout_secs: u64,

    /// Formula renderer used when displaying the result.
    pub formula_renderer: FormulaRenderer,

    /// Receives stage and page events.
    pub progress_callback: Option<ProgressCallback>,
}

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            translator: None,
            source_language: "Vietnamese".to_string(),
            target_language: "English".to_string(),
            temperature: 0.1,
            max_tokens: 16384,
            system_prompt: None,
            password: None,
            pages: PageSelection::default(),
            page_separator: PageSeparator::default(),
            output_format: OutputFormat::default(),
            reconstruct_delay_ms: 500,
            api_timeout_secs: 180,
            formula_renderer: FormulaRenderer::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TranslationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("translator", &self.translator.as_ref().map(|_| "<dyn Translator>"))
            .field("source_language", &self.source_language)
            .field("target_language", &self.target_language)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("pages", &self.pages)
            .field("page_separator", &self.page_separator)
            .field("output_format", &self.output_format)
            .field("reconstruct_delay_ms", &self.reconstruct_delay_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("formula_renderer", &self.formula_renderer)
            .finish()
    }
}

impl TranslationConfig {
    /// Create a new builder for `TranslationConfig`.
    pub fn builder() -> TranslationConfigBuilder {
        TranslationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`TranslationConfig`].
#[derive(Debug)]
pub struct TranslationConfigBuilder {
    config: TranslationConfig,
}

impl TranslationConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.config.translator = Some(translator);
        self
    }

    pub fn source_language(mut self, lang: impl Into<String>) -> Self {
        self.config.source_language = lang.into();
        self
    }

    pub fn target_language(mut self, lang: impl Into<String>) -> Self {
        self.config.target_language = lang.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn reconstruct_delay_ms(mut self, ms: u64) -> Self {
        self.config.reconstruct_delay_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn formula_renderer(mut self, renderer: FormulaRenderer) -> Self {
        self.config.formula_renderer = renderer;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TranslationConfig, TranslateError> {
        let c = &self.config;
        if c.source_language.trim().is_empty() || c.target_language.trim().is_empty() {
            return Err(TranslateError::InvalidConfig(
                "Source and target language must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(TranslateError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(TranslateError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Format label offered on the download action.
///
/// Both labels produce the same plain-text artifact; building real DOCX or
/// PDF output is not implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Word (.docx). (default)
    #[default]
    Docx,
    /// PDF (.pdf).
    Pdf,
}

impl OutputFormat {
    pub fn label(&self) -> &'static str {
        match self {
            OutputFormat::Docx => "Word (.docx)",
            OutputFormat::Pdf => "PDF (.pdf)",
        }
    }
}

/// Specifies which pages of the PDF to extract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// Extract all pages (default).
    #[default]
    All,
    /// Extract a single page (1-indexed).
    Single(usize),
    /// Extract a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Extract specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// How to separate pages in the extracted text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSeparator {
    /// Blank line only: "\n\n". (default)
    #[default]
    None,
    /// Horizontal rule: "\n\n---\n\n"
    HorizontalRule,
    /// HTML comment with page number: "<!-- page N -->"
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator placed before the given page (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => "\n\n".to_string(),
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }
}
