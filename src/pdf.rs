//! PDF generation.
//!
//! Contract text is turned into a story of flowables (title, body blocks,
//! spacers), laid out top to bottom inside the page frame, then drawn with
//! `printpdf`. Layout is independent of the PDF backend so block and page
//! counts can be checked without parsing the output.

use crate::config::PageConfig;
use crate::content::ContractText;
use crate::error::{ContractError, Result};
use crate::font::{self, FontHandle};
use fontdue::{Font, FontSettings};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

/// Helvetica advance widths for ' '..='~', in 1/1000 em (Adobe AFM)
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

/// Latin-1 supplement glyphs are mostly accented letters of digit width
const HELVETICA_DEFAULT_WIDTH: u16 = 556;

const LAYER_NAME: &str = "Layer 1";

/// One unit of content placed sequentially in the page frame
#[derive(Debug, Clone, PartialEq)]
pub enum Flowable {
    Title(String),
    /// A paragraph; each entry is an explicit line break
    Body(Vec<String>),
    Spacer(f32),
}

/// A line of text positioned on a page. Coordinates are in points from
/// the bottom-left corner; `y` is the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub page: usize,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub text: String,
}

/// Result of laying out a story
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub pages: usize,
    pub body_blocks: usize,
    pub lines: Vec<PlacedLine>,
}

/// Which font the PDF was drawn with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FontSource {
    Embedded { name: String },
    Builtin { name: String },
}

/// Summary of a generated PDF
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfReport {
    pub body_blocks: usize,
    pub pages: usize,
    pub lines: usize,
    pub font: FontSource,
}

/// Glyph advances used for line breaking
#[derive(Clone)]
pub enum FontMetrics {
    /// Built-in Helvetica, from its AFM width table
    Helvetica,
    /// Advances read from the embedded font program
    Embedded(Font),
}

impl fmt::Debug for FontMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontMetrics::Helvetica => f.write_str("Helvetica"),
            FontMetrics::Embedded(_) => f.write_str("Embedded"),
        }
    }
}

impl FontMetrics {
    pub fn from_handle(handle: &FontHandle) -> Result<Self> {
        let data = font::first_face(&handle.data).map_err(ContractError::Pdf)?;
        let font = Font::from_bytes(data.as_ref(), FontSettings::default())
            .map_err(|e| ContractError::Pdf(format!("font metrics for {}: {e}", handle.path.display())))?;
        Ok(FontMetrics::Embedded(font))
    }

    /// Advance of one character at the given size, in points
    pub fn char_width(&self, c: char, size: f32) -> f32 {
        match self {
            FontMetrics::Embedded(font) if font.lookup_glyph_index(c) != 0 => {
                font.metrics(c, size).advance_width
            }
            FontMetrics::Embedded(_) if is_wide(c) => size,
            _ => helvetica_width(c, size),
        }
    }

    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        text.chars().map(|c| self.char_width(c, size)).sum()
    }
}

fn helvetica_width(c: char, size: f32) -> f32 {
    let units = match c {
        ' '..='~' => HELVETICA_WIDTHS[c as usize - ' ' as usize],
        _ if is_wide(c) => 1000,
        _ => HELVETICA_DEFAULT_WIDTH,
    };
    f32::from(units) * size / 1000.0
}

/// Writes contract text as a PDF, with the resolved CJK font if one exists
#[derive(Debug, Clone)]
pub struct PdfEmitter<'a> {
    page: PageConfig,
    font: Option<&'a FontHandle>,
}

impl<'a> PdfEmitter<'a> {
    pub fn new(page: PageConfig, font: Option<&'a FontHandle>) -> Self {
        Self { page, font }
    }

    /// Convert a text file into a PDF file, overwriting the output
    pub fn emit<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<PdfReport> {
        let input = input.as_ref();
        let output = output.as_ref();

        if !input.exists() {
            return Err(ContractError::MissingInput(input.to_path_buf()));
        }

        let contract = ContractText::from_file(input)?;
        let (bytes, report) = self.render(&contract)?;

        if bytes.is_empty() {
            return Err(ContractError::EmptyOutput(output.to_path_buf()));
        }
        fs::write(output, &bytes)?;

        info!(
            "✓ Created PDF: {} ({} pages, {} bytes)",
            output.display(),
            report.pages,
            bytes.len()
        );
        Ok(report)
    }

    /// Build the PDF in memory
    pub fn render(&self, contract: &ContractText) -> Result<(Vec<u8>, PdfReport)> {
        let metrics = match self.font {
            Some(handle) => FontMetrics::from_handle(handle)?,
            None => FontMetrics::Helvetica,
        };
        let story = build_story(contract, &self.page, self.font.is_some());
        let layout = layout_story(&story, &self.page, &metrics);

        let width = pt_to_mm(self.page.width);
        let height = pt_to_mm(self.page.height);
        let (doc, first_page, first_layer) =
            PdfDocument::new(contract.title.clone(), width, height, LAYER_NAME.to_string());

        let (font, source) = self.register_font(&doc)?;

        let mut layers = vec![doc.get_page(first_page).get_layer(first_layer)];
        for _ in 1..layout.pages {
            let (page, layer) = doc.add_page(width, height, LAYER_NAME.to_string());
            layers.push(doc.get_page(page).get_layer(layer));
        }

        for line in &layout.lines {
            if let Some(layer) = layers.get(line.page) {
                layer.use_text(
                    line.text.clone(),
                    line.size,
                    pt_to_mm(line.x),
                    pt_to_mm(line.y),
                    &font,
                );
            }
        }

        let bytes = doc.save_to_bytes().map_err(pdf_error)?;
        debug!(
            "Rendered '{}' into {} body blocks on {} pages",
            contract.title, layout.body_blocks, layout.pages
        );

        let report = PdfReport {
            body_blocks: layout.body_blocks,
            pages: layout.pages,
            lines: layout.lines.len(),
            font: source,
        };
        Ok((bytes, report))
    }

    fn register_font(&self, doc: &PdfDocumentReference) -> Result<(IndirectFontRef, FontSource)> {
        match self.font {
            Some(handle) => {
                let data = font::first_face(&handle.data).map_err(ContractError::Pdf)?;
                let font = doc
                    .add_external_font(Cursor::new(data.as_ref()))
                    .map_err(pdf_error)?;
                Ok((font, FontSource::Embedded { name: handle.name.clone() }))
            }
            None => {
                let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
                Ok((font, FontSource::Builtin { name: "Helvetica".to_string() }))
            }
        }
    }
}

fn pdf_error(e: impl std::fmt::Debug) -> ContractError {
    ContractError::Pdf(format!("{e:?}"))
}

fn pt_to_mm(points: f32) -> Mm {
    Mm(points * 25.4 / 72.0)
}

/// Title, a spacer, then every non-empty paragraph followed by a spacer.
///
/// Without an embedded font, text is reduced to what the built-in font
/// can encode.
pub fn build_story(contract: &ContractText, page: &PageConfig, embedded_font: bool) -> Vec<Flowable> {
    let prepare = |text: &str| {
        if embedded_font {
            text.to_string()
        } else {
            to_builtin_charset(text)
        }
    };

    let mut story = vec![
        Flowable::Title(prepare(&contract.title)),
        Flowable::Spacer(page.title_spacing),
    ];

    for paragraph in &contract.paragraphs {
        story.push(Flowable::Body(
            paragraph.lines.iter().map(|line| prepare(line)).collect(),
        ));
        story.push(Flowable::Spacer(page.block_spacing));
    }

    story
}

/// Place a story into the page frame, breaking pages as needed
pub fn layout_story(story: &[Flowable], page: &PageConfig, metrics: &FontMetrics) -> Layout {
    let top = page.height - page.margin_top;
    let bottom = page.margin_bottom;
    let frame_width = page.frame_width();

    let mut layout = Layout {
        pages: 1,
        ..Default::default()
    };
    let mut cursor = top;

    for flowable in story {
        let (explicit_lines, size, leading) = match flowable {
            Flowable::Title(text) => (vec![text.clone()], page.title_size, page.title_leading),
            Flowable::Body(lines) => {
                layout.body_blocks += 1;
                (lines.clone(), page.body_size, page.body_leading)
            }
            Flowable::Spacer(height) => {
                // a spacer never forces a page break on its own
                cursor = (cursor - height).max(bottom);
                continue;
            }
        };

        for explicit in &explicit_lines {
            for text in wrap_text(explicit, frame_width, size, metrics) {
                if cursor - leading < bottom {
                    layout.pages += 1;
                    cursor = top;
                }

                layout.lines.push(PlacedLine {
                    page: layout.pages - 1,
                    x: page.margin_left,
                    y: cursor - size,
                    size,
                    text,
                });
                cursor -= leading;
            }
        }
    }

    layout
}

/// Break a line of text so that no piece is wider than `max_width`.
///
/// Latin words stay whole unless a single word exceeds the width; CJK
/// characters may break anywhere.
pub fn wrap_text(text: &str, max_width: f32, size: f32, metrics: &FontMetrics) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut width = 0.0;

    for token in tokenize(text) {
        let token_width = metrics.text_width(token, size);
        let is_space = token.chars().all(char::is_whitespace);

        if width + token_width > max_width && !current.is_empty() {
            lines.push(current.trim_end().to_string());
            current.clear();
            width = 0.0;
        }

        if is_space && current.is_empty() {
            continue;
        }

        if token_width > max_width {
            for c in token.chars() {
                let advance = metrics.char_width(c, size);
                if width + advance > max_width && !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    width = 0.0;
                }
                current.push(c);
                width += advance;
            }
            continue;
        }

        current.push_str(token);
        width += token_width;
    }

    let last = current.trim_end();
    if !last.is_empty() {
        lines.push(last.to_string());
    }

    lines
}

/// Split into break opportunities: Latin words, single whitespace
/// characters, and single wide characters
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut word_start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        if is_wide(c) || c.is_whitespace() {
            if let Some(start) = word_start.take() {
                tokens.push(&text[start..i]);
            }
            tokens.push(&text[i..i + c.len_utf8()]);
        } else if word_start.is_none() {
            word_start = Some(i);
        }
    }

    if let Some(start) = word_start {
        tokens.push(&text[start..]);
    }

    tokens
}

/// East Asian wide and fullwidth ranges
fn is_wide(c: char) -> bool {
    matches!(
        c as u32,
        0x1100..=0x115F
            | 0x2E80..=0x303E
            | 0x3041..=0x33FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xA000..=0xA4CF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6
            | 0x20000..=0x3FFFD
    )
}

/// Replace characters the built-in Helvetica cannot encode with `?`
fn to_builtin_charset(text: &str) -> String {
    let mut replaced = 0;
    let converted: String = text
        .chars()
        .map(|c| match c {
            ' '..='~' | '\u{A0}'..='\u{FF}' => c,
            _ => {
                replaced += 1;
                '?'
            }
        })
        .collect();

    if replaced > 0 {
        warn!("⚠️  {} characters not renderable by the built-in font", replaced);
    }
    converted
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> ContractText {
        ContractText::parse("技术服务合同", "第一条\n甲方...\n\n第二条\n乙方...")
    }

    #[test]
    fn test_story_has_title_and_body_blocks_with_spacers() {
        let page = PageConfig::default();
        let story = build_story(&sample(), &page, true);

        assert_eq!(
            story,
            vec![
                Flowable::Title("技术服务合同".to_string()),
                Flowable::Spacer(12.0),
                Flowable::Body(vec!["第一条".to_string(), "甲方...".to_string()]),
                Flowable::Spacer(6.0),
                Flowable::Body(vec!["第二条".to_string(), "乙方...".to_string()]),
                Flowable::Spacer(6.0),
            ]
        );
    }

    #[test]
    fn test_builtin_story_replaces_cjk() {
        let page = PageConfig::default();
        let story = build_story(&ContractText::parse("合同 A", "Café 甲"), &page, false);

        assert_eq!(story[0], Flowable::Title("?? A".to_string()));
        assert_eq!(story[2], Flowable::Body(vec!["Café ?".to_string()]));
    }

    #[test]
    fn test_layout_positions_within_margins() {
        let page = PageConfig::default();
        let layout = layout_story(&build_story(&sample(), &page, true), &page, &FontMetrics::Helvetica);

        assert_eq!(layout.pages, 1);
        assert_eq!(layout.body_blocks, 2);
        assert_eq!(layout.lines.len(), 5);

        let title = &layout.lines[0];
        assert_eq!(title.size, 16.0);
        assert_eq!(title.x, 72.0);
        assert!((title.y - (page.height - 72.0 - 16.0)).abs() < 0.01);

        // title leading 20 + spacer 12, then body size 11
        let first_body = &layout.lines[1];
        assert!((first_body.y - (page.height - 72.0 - 20.0 - 12.0 - 11.0)).abs() < 0.01);

        for pair in layout.lines.windows(2) {
            assert!(pair[1].y < pair[0].y);
        }
    }

    #[test]
    fn test_layout_breaks_pages() {
        let page = PageConfig::default();
        let text: Vec<String> = (1..=120).map(|i| format!("第{i}条\n内容")).collect();
        let contract = ContractText::parse("长合同", &text.join("\n\n"));

        let layout = layout_story(&build_story(&contract, &page, true), &page, &FontMetrics::Helvetica);

        assert_eq!(layout.body_blocks, 120);
        assert!(layout.pages > 1);
        for line in &layout.lines {
            assert!(line.y >= page.margin_bottom - 0.01);
            assert!(line.page < layout.pages);
        }
    }

    #[test]
    fn test_wrap_latin_at_word_boundaries() {
        let lines = wrap_text("alpha beta gamma delta", 60.0, 10.0, &FontMetrics::Helvetica);

        // "alpha beta gamma" is 82.82 pt, "gamma delta" 57.80 pt
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
    }

    #[test]
    fn test_wrap_cjk_anywhere() {
        let lines = wrap_text("甲方乙方丙方", 40.0, 10.0, &FontMetrics::Helvetica);
        assert_eq!(lines, vec!["甲方乙方", "丙方"]);
    }

    #[test]
    fn test_wrap_splits_overlong_word() {
        let lines = wrap_text("abcdefghij", 22.0, 10.0, &FontMetrics::Helvetica);
        assert_eq!(lines, vec!["abcd", "efghi", "j"]);
    }

    #[test]
    fn test_wrap_short_line_unchanged() {
        let metrics = FontMetrics::Helvetica;
        assert_eq!(wrap_text("第一条 总则", 451.0, 11.0, &metrics), vec!["第一条 总则"]);
        assert!(wrap_text("   ", 451.0, 11.0, &metrics).is_empty());
    }

    #[test]
    fn test_helvetica_widths() {
        let metrics = FontMetrics::Helvetica;
        assert!((metrics.text_width("W", 10.0) - 9.44).abs() < 0.001);
        assert!((metrics.text_width("il", 10.0) - 4.44).abs() < 0.001);
        assert!((metrics.text_width("~", 10.0) - 5.84).abs() < 0.001);
        assert!((metrics.text_width("甲", 10.0) - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_wide_latin_stays_inside_frame() {
        let page = PageConfig::default();
        let metrics = FontMetrics::Helvetica;
        let contract = ContractText::parse("Widths", &"WWWWWWWWWW ".repeat(20));

        let layout = layout_story(&build_story(&contract, &page, false), &page, &metrics);

        assert!(layout.lines.len() > 2);
        for line in &layout.lines {
            let right_edge = line.x + metrics.text_width(&line.text, line.size);
            assert!(
                right_edge <= page.width - page.margin_right + 0.01,
                "line '{}' ends at {right_edge}",
                line.text
            );
        }
    }

    /// Repack a standalone TrueType font as a one-face collection
    fn wrap_in_collection(ttf: &[u8]) -> Vec<u8> {
        let num_tables = u16::from_be_bytes([ttf[4], ttf[5]]) as usize;
        let mut face = ttf.to_vec();
        for i in 0..num_tables {
            let at = 12 + 16 * i + 8;
            let offset = u32::from_be_bytes([face[at], face[at + 1], face[at + 2], face[at + 3]]);
            face[at..at + 4].copy_from_slice(&(offset + 16).to_be_bytes());
        }

        let mut ttc = Vec::new();
        ttc.extend_from_slice(b"ttcf");
        ttc.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        ttc.extend_from_slice(&1u32.to_be_bytes());
        ttc.extend_from_slice(&16u32.to_be_bytes());
        ttc.extend_from_slice(&face);
        ttc
    }

    #[test]
    fn test_render_with_font_from_collection() {
        let system_font = Path::new("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf");
        let Ok(ttf) = fs::read(system_font) else {
            return;
        };

        let dir = TempDir::new().unwrap();
        let collection = dir.path().join("collection.ttc");
        fs::write(&collection, wrap_in_collection(&ttf)).unwrap();

        let handle = font::FontResolver::new("ChineseFont", vec![collection])
            .resolve()
            .unwrap();
        // the registered program is a standalone TrueType face
        assert!(handle.data.starts_with(b"\x00\x01\x00\x00"));

        let contract = ContractText::parse("Service Contract", &"Wide text WWWW ".repeat(40));
        let (bytes, report) = PdfEmitter::new(PageConfig::default(), Some(&handle))
            .render(&contract)
            .unwrap();

        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(
            report.font,
            FontSource::Embedded {
                name: "ChineseFont".to_string()
            }
        );

        let metrics = FontMetrics::from_handle(&handle).unwrap();
        let page = PageConfig::default();
        let layout = layout_story(&build_story(&contract, &page, true), &page, &metrics);
        for line in &layout.lines {
            assert!(line.x + metrics.text_width(&line.text, line.size) <= page.width - page.margin_right + 0.01);
        }
    }

    #[test]
    fn test_render_with_builtin_font() {
        let emitter = PdfEmitter::new(PageConfig::default(), None);
        let (bytes, report) = emitter.render(&sample()).unwrap();

        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(report.body_blocks, 2);
        assert_eq!(report.pages, 1);
        assert_eq!(report.lines, 5);
        assert_eq!(
            report.font,
            FontSource::Builtin {
                name: "Helvetica".to_string()
            }
        );
    }

    #[test]
    fn test_emit_writes_pdf_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("销售合同.txt");
        let output = dir.path().join("销售合同.pdf");
        fs::write(&input, "Article 1\nSeller\n\nArticle 2\nBuyer\n\n").unwrap();

        let report = PdfEmitter::new(PageConfig::default(), None)
            .emit(&input, &output)
            .unwrap();

        assert_eq!(report.body_blocks, 2);
        let bytes = fs::read(&output).unwrap();
        assert!(!bytes.is_empty());
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_emit_missing_input() {
        let dir = TempDir::new().unwrap();
        let result = PdfEmitter::new(PageConfig::default(), None)
            .emit(dir.path().join("absent.txt"), dir.path().join("absent.pdf"));

        assert!(matches!(result, Err(ContractError::MissingInput(_))));
        assert!(!dir.path().join("absent.pdf").exists());
    }
}
