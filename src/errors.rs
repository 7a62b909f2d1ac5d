// ABOUTME: Error types for the beamer-slides application
// ABOUTME: Provides structured error handling for conversion, linting, building and previewing

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlidesError {
    #[error("Failed to read file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("Failed to write {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to fetch remote resource: {0}")]
    FetchError(#[from] reqwest::Error),

    #[error("Invalid resource path: {0}")]
    InvalidResourcePath(String),

    #[error("Input validation error: {0}")]
    ValidationError(String),

    #[error("Path not found: {0}")]
    PathNotFoundError(PathBuf),

    #[error("Typesetting engine not found: {0}. Make sure a TeX distribution is installed.")]
    EngineNotFound(String),

    #[error("Compilation of {path} failed:\n{log}")]
    CompileError { path: PathBuf, log: String },

    #[error("Preview tool not found: {0}. Make sure poppler-utils is installed.")]
    PreviewToolNotFound(String),

    #[error("Preview error: {0}")]
    PreviewError(String),

    #[error("No page images found matching pattern: {0}")]
    NoPagesFoundError(String),

    #[error("Lint failed with {0} error(s)")]
    LintFailed(usize),

    #[error("Theme store error: {0}")]
    ThemeError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Watch error: {0}")]
    WatchError(String),

    #[error("Unknown error: {0}")]
    UnknownError(String),
}

impl From<anyhow::Error> for SlidesError {
    fn from(err: anyhow::Error) -> Self {
        SlidesError::UnknownError(err.to_string())
    }
}

impl From<toml::de::Error> for SlidesError {
    fn from(err: toml::de::Error) -> Self {
        SlidesError::ThemeError(format!("Invalid theme file: {}", err))
    }
}

impl From<toml::ser::Error> for SlidesError {
    fn from(err: toml::ser::Error) -> Self {
        SlidesError::ThemeError(format!("Failed to serialize theme: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, SlidesError>;
