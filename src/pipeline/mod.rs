//! Pipeline stages for document translation and math-aware rendering.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and swapped (e.g. a different formula engine) without
//! touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ translate ──▶ document ◀── segment
//! (gate)    (pdfium)    (LLM)         (units)  ◀── formula
//! ```
//!
//! 1. [`input`]     — accept exactly PDF or DOCX, reject everything else
//! 2. [`extract`]   — join page texts into one stream; pdfium runs in
//!    `spawn_blocking` because it is not async-safe
//! 3. [`translate`] — one call to the translator; the only stage with
//!    network I/O
//! 4. [`segment`]   — split text into prose and `$`/`$$` formula runs
//! 5. [`formula`]   — typeset one formula, containing every engine failure
//! 6. [`document`]  — segment + typeset a whole text into render units

pub mod document;
pub mod extract;
pub mod formula;
pub mod input;
pub mod segment;
pub mod translate;
