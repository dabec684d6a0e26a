use std::path::PathBuf;
use thiserror::Error;

/// Error types for fixture generation
#[derive(Error, Debug)]
pub enum ContractError {
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Font could not be loaded from {}: {reason}", .path.display())]
    FontLoad { path: PathBuf, reason: String },

    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("Generated document is empty: {}", .0.display())]
    EmptyOutput(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("DOCX archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type with ContractError
pub type Result<T> = std::result::Result<T, ContractError>;
