//! Plain-text contract model shared by the DOCX and PDF emitters.
//!
//! A contract file is a sequence of paragraphs separated by blank lines.
//! Within a paragraph every line is kept as its own line of text.

use crate::error::Result;
use std::fs;
use std::path::Path;
use tracing::debug;

/// One blank-line-delimited block of a contract, holding its non-blank lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub lines: Vec<String>,
}

/// The parsed content of one contract text file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractText {
    pub title: String,
    pub paragraphs: Vec<Paragraph>,
}

impl ContractText {
    /// Parse text content under a given title
    pub fn parse(title: impl Into<String>, text: &str) -> Self {
        Self {
            title: title.into(),
            paragraphs: split_paragraphs(text),
        }
    }

    /// Read and parse a contract file; the title is the file stem
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let contract = Self::parse(title_from_path(path), &text);

        debug!(
            "Parsed {} into {} paragraphs",
            path.display(),
            contract.paragraphs.len()
        );
        Ok(contract)
    }

    /// Total number of body lines across all paragraphs
    pub fn line_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.lines.len()).sum()
    }
}

/// Document title derived from the base file name without its extension
pub fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Split text into paragraphs on blank-line boundaries.
///
/// Lines are trimmed and blank lines dropped. A paragraph left with no
/// lines, such as the one after a trailing blank line, is discarded.
pub fn split_paragraphs(text: &str) -> Vec<Paragraph> {
    let normalized = text.replace("\r\n", "\n");

    normalized
        .split("\n\n")
        .filter_map(|block| {
            let lines: Vec<String> = block
                .split('\n')
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();

            if lines.is_empty() {
                None
            } else {
                Some(Paragraph { lines })
            }
        })
        .collect()
}
