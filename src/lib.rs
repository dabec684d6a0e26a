//! Contract Fixtures Library
//!
//! Generates DOCX and PDF test fixtures from plain-text contract templates.
//! A run resolves a CJK-capable font once, then converts each configured
//! contract with both emitters and reports the outcome per file.

pub mod batch;
pub mod config;
pub mod content;
pub mod docx;
pub mod error;
pub mod font;
pub mod pdf;

pub use batch::{BatchDriver, BatchReport};
pub use config::Config;
pub use error::{ContractError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        batch::{BatchDriver, BatchReport, ContractOutcome, EmitStatus},
        config::{Config, DocxConfig, FontConfig, PageConfig},
        content::{ContractText, Paragraph},
        docx::{DocxEmitter, DocxReport},
        error::{ContractError, Result},
        font::{FontHandle, FontResolver},
        pdf::{FontMetrics, PdfEmitter, PdfReport},
    };

    pub use tracing::{debug, error, info, warn};
}

/// Resolve the configured font and run the batch
pub fn generate(config: &Config) -> BatchReport {
    let font = font::FontResolver::from_config(&config.fonts).resolve();
    BatchDriver::new(config, font).run()
}
