//! Font discovery for CJK glyph rendering in generated PDFs.
//!
//! The resolver walks an ordered list of candidate paths and returns the
//! first font that loads. Nothing is registered globally: the resulting
//! [`FontHandle`] is handed to the PDF emitter explicitly.

use crate::config::FontConfig;
use crate::error::{ContractError, Result};
use printpdf::PdfDocument;
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A loaded font, registered under a logical name
#[derive(Clone)]
pub struct FontHandle {
    pub name: String,
    pub path: PathBuf,
    pub data: Vec<u8>,
}

impl fmt::Debug for FontHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontHandle")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Loads the font program stored at a path
pub trait FontLoader {
    fn load(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Reads font files from disk and checks the PDF backend accepts them.
/// Collections (`.ttc`) are reduced to their first face.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileFontLoader;

/// sfnt signatures: TrueType, CFF OpenType, legacy Apple TrueType, collections
const FONT_SIGNATURES: [&[u8]; 4] = [b"\x00\x01\x00\x00", b"OTTO", b"true", b"ttcf"];

impl FontLoader for FileFontLoader {
    fn load(&self, path: &Path) -> Result<Vec<u8>> {
        let raw = fs::read(path).map_err(|e| font_error(path, e))?;

        if !has_font_signature(&raw) {
            return Err(font_error(path, "not a TrueType/OpenType font file"));
        }

        let data = first_face(&raw)
            .map_err(|reason| font_error(path, reason))?
            .into_owned();
        if raw.starts_with(b"ttcf") {
            debug!(
                "Unpacked first face of collection {} ({} of {} bytes)",
                path.display(),
                data.len(),
                raw.len()
            );
        }

        PdfDocument::empty("font check")
            .add_external_font(Cursor::new(data.as_slice()))
            .map_err(|e| font_error(path, format!("{e:?}")))?;

        Ok(data)
    }
}

fn has_font_signature(data: &[u8]) -> bool {
    FONT_SIGNATURES
        .iter()
        .any(|signature| data.starts_with(signature))
}

fn read_u16(data: &[u8], at: usize) -> Option<u16> {
    let bytes = data.get(at..at.checked_add(2)?)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at.checked_add(4)?)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// The font program of a single face.
///
/// A standalone sfnt is returned as is. For a TrueType collection the first
/// face is rebuilt as a standalone font: its table directory is copied and
/// every table is re-packed after it with offsets relative to the new file,
/// since a PDF font stream must hold exactly one font.
pub fn first_face(data: &[u8]) -> std::result::Result<Cow<'_, [u8]>, String> {
    if !data.starts_with(b"ttcf") {
        return Ok(Cow::Borrowed(data));
    }

    let truncated = || "truncated font collection".to_string();

    let num_fonts = read_u32(data, 8).ok_or_else(truncated)?;
    if num_fonts == 0 {
        return Err("font collection holds no faces".to_string());
    }

    let face = read_u32(data, 12).ok_or_else(truncated)? as usize;
    let num_tables = read_u16(data, face + 4).ok_or_else(truncated)? as usize;
    let directory_len = 12 + 16 * num_tables;
    let directory = data
        .get(face..face + directory_len)
        .ok_or_else(truncated)?;

    let mut tables = Vec::with_capacity(num_tables);
    for record in directory[12..].chunks_exact(16) {
        let offset = read_u32(record, 8).ok_or_else(truncated)? as usize;
        let length = read_u32(record, 12).ok_or_else(truncated)? as usize;
        let body = offset
            .checked_add(length)
            .and_then(|end| data.get(offset..end))
            .ok_or_else(truncated)?;
        tables.push((&record[..8], body));
    }

    let padded = |len: usize| (len + 3) & !3;
    let total = directory_len + tables.iter().map(|(_, body)| padded(body.len())).sum::<usize>();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&directory[..12]);

    let mut next = directory_len;
    for (tag_and_checksum, body) in &tables {
        out.extend_from_slice(tag_and_checksum);
        out.extend_from_slice(&(next as u32).to_be_bytes());
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        next += padded(body.len());
    }

    for (_, body) in &tables {
        out.extend_from_slice(body);
        out.resize(padded(out.len()), 0);
    }

    Ok(Cow::Owned(out))
}

fn font_error(path: &Path, reason: impl fmt::Display) -> ContractError {
    ContractError::FontLoad {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Tries candidate font paths in order
pub struct FontResolver<L = FileFontLoader> {
    name: String,
    candidates: Vec<PathBuf>,
    loader: L,
}

impl FontResolver<FileFontLoader> {
    pub fn new(name: impl Into<String>, candidates: Vec<PathBuf>) -> Self {
        Self::with_loader(name, candidates, FileFontLoader)
    }

    pub fn from_config(config: &FontConfig) -> Self {
        Self::new(config.name.clone(), config.candidates.clone())
    }
}

impl<L: FontLoader> FontResolver<L> {
    pub fn with_loader(name: impl Into<String>, candidates: Vec<PathBuf>, loader: L) -> Self {
        Self {
            name: name.into(),
            candidates,
            loader,
        }
    }

    /// Return the first candidate that exists and loads.
    ///
    /// Load failures are logged and skipped; `None` means no usable font.
    pub fn resolve(&self) -> Option<FontHandle> {
        for path in &self.candidates {
            if !path.exists() {
                debug!("Font candidate not present: {}", path.display());
                continue;
            }

            match self.loader.load(path) {
                Ok(data) => {
                    info!("✓ Registered font '{}' from {}", self.name, path.display());
                    return Some(FontHandle {
                        name: self.name.clone(),
                        path: path.clone(),
                        data,
                    });
                }
                Err(e) => {
                    warn!("⚠️  Font registration failed: {}", e);
                }
            }
        }

        warn!("⚠️  No usable Chinese font found, PDFs will use the built-in font");
        None
    }
}
