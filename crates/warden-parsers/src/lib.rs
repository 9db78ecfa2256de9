//! Source parsing for warden.
//!
//! Everything language-specific lives behind [`grammar::SourceGrammar`]:
//! which nodes are comments or documentation, and how per-scope docs are
//! collected. The rest of the crate is grammar-agnostic:
//! - [`treesitter`]: parser wrapper, language detection, parse errors
//! - [`canonical`]: parse → canonicalize → compare
//! - [`metadata`]: comment/doc extraction and edit-category diffing
//! - [`walker`]: repository file discovery
//!
//! Grammars: [`python`] (with structural queries) and [`rust_lang`].

pub mod canonical;
pub mod grammar;
pub mod metadata;
pub mod treesitter;
pub mod walker;

pub mod python;
pub mod rust_lang;
