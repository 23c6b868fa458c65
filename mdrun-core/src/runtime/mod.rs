//! Language routing: which execution strategy a fence tag maps to.

pub mod languages;

pub use languages::{classify, normalize_tag, Classification, ExecutionStrategy, LanguageTable};
