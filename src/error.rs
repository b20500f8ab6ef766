//! Crate-wide error type.
//!
//! Most of the pipeline is best-effort: a failed fetch layer, a paragraph
//! that refuses to translate, or an LLM that times out are logged and
//! skipped. [`NewsError`] is what those operations return before the caller
//! decides to fall back.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewsError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Search failed: {0}")]
    Search(String),
    #[error("Content extraction failed: {0}")]
    Extraction(String),
    #[error("Translation failed: {0}")]
    Translation(String),
    #[error("LLM request failed: {0}")]
    Llm(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, NewsError>;
