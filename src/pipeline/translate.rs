//! Translation boundary: extracted text → translated text.
//!
//! The orchestrator only knows the [`Translator`] trait: one call, text in,
//! text out, success or failure. There is no retry policy here or anywhere
//! else; a failed call ends the session.
//!
//! [`LlmTranslator`] is the production implementation. It sends the whole
//! document to an `edgequake-llm` provider with the scientific-translation
//! prompt from [`crate::prompts`], then applies a few deterministic clean-up
//! rules for model quirks (wrapping fences, CRLF, zero-width characters).
//! None of the rules touch `$` delimiters.

use crate::config::{TranslationConfig, DEFAULT_MODEL};
use crate::error::TranslateError;
use crate::prompts::{system_prompt, translation_request, DEFAULT_SYSTEM_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Translates a whole document's text.
///
/// Returned futures must be `Send` so sessions can run on any runtime thread.
pub trait Translator: Send + Sync {
    fn translate<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<String, TranslateError>>;
}

/// Translator backed by an LLM chat completion.
pub struct LlmTranslator {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    source_language: String,
    temperature: f32,
    max_tokens: usize,
    timeout: Duration,
}

impl LlmTranslator {
    /// Build from a provider and the prompt/limit settings in `config`.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &TranslationConfig) -> Self {
        let template = config
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        Self {
            provider,
            system_prompt: system_prompt(template, &config.source_language, &config.target_language),
            source_language: config.source_language.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }

    async fn translate_inner(&self, text: &str) -> Result<String, TranslateError> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(&self.system_prompt),
            ChatMessage::user(translation_request(&self.source_language, text)),
        ];
        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = tokio::time::timeout(self.timeout, self.provider.chat(&messages, Some(&options)))
            .await
            .map_err(|_| TranslateError::TranslationTimeout {
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| {
                warn!("Translation call failed — {}", e);
                TranslateError::translation(format!(
                    "failed to get a response from the translation model: {e}"
                ))
            })?;

        debug!(
            "Translation: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        let cleaned = clean_translation(&response.content);
        if cleaned.trim().is_empty() {
            return Err(TranslateError::translation(
                "the translation model returned an empty response",
            ));
        }
        Ok(cleaned)
    }
}

impl Translator for LlmTranslator {
    fn translate<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<String, TranslateError>> {
        Box::pin(self.translate_inner(text))
    }
}

/// Pick the translator for a session, from most-specific to least-specific.
///
/// 1. **Custom translator** (`config.translator`) — used as-is.
/// 2. **Pre-built provider** (`config.provider`).
/// 3. **Named provider + model** (`config.provider_name`).
/// 4. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 5. **Gemini key present** (`GEMINI_API_KEY`) — the default model is a
///    Gemini model, so prefer it when its key is available.
/// 6. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_translator(config: &TranslationConfig) -> Result<Arc<dyn Translator>, TranslateError> {
    if let Some(ref translator) = config.translator {
        return Ok(Arc::clone(translator));
    }
    let provider = resolve_provider(config)?;
    info!(
        "Translating {} → {} with an LLM provider",
        config.source_language, config.target_language
    );
    Ok(Arc::new(LlmTranslator::new(provider, config)))
}

fn resolve_provider(config: &TranslationConfig) -> Result<Arc<dyn LLMProvider>, TranslateError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            return create_provider("gemini", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| TranslateError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, TranslateError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        TranslateError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

// ── Response clean-up ────────────────────────────────────────────────────────

/// Apply the clean-up rules to a raw model reply.
///
/// 1. Strip outer code fences (models sometimes disobey the prompt)
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, word joiners)
pub fn clean_translation(input: &str) -> String {
    let s = strip_outer_fences(input);
    let s = normalise_line_endings(&s);
    remove_invisible_chars(&s)
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md|text|latex)?\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_outer_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(['\u{200B}', '\u{FEFF}', '\u{200C}', '\u{200D}', '\u{2060}'], "")
}
