//! DOCX generation.
//!
//! A DOCX file is a ZIP archive of XML parts. The emitter writes the minimal
//! set of parts Word needs: content types, package relationships, the main
//! document, a style sheet with `Title` and `Normal`, and core properties.

use crate::config::DocxConfig;
use crate::content::ContractText;
use crate::error::{ContractError, Result};
use serde::Serialize;
use std::fs;
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
  <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
</Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Counts of what was written into a DOCX document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocxReport {
    /// Paragraph groups, each followed by a spacer paragraph
    pub groups: usize,
    /// Body paragraphs, one per non-blank line
    pub lines: usize,
}

/// Writes contract text as a Word document
#[derive(Debug, Clone, Default)]
pub struct DocxEmitter {
    config: DocxConfig,
}

impl DocxEmitter {
    pub fn new(config: DocxConfig) -> Self {
        Self { config }
    }

    /// Convert a text file into a DOCX file, overwriting the output
    pub fn emit<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<DocxReport> {
        let input = input.as_ref();
        let output = output.as_ref();

        if !input.exists() {
            return Err(ContractError::MissingInput(input.to_path_buf()));
        }

        let contract = ContractText::from_file(input)?;
        let bytes = self.render(&contract)?;
        fs::write(output, &bytes)?;

        info!("✓ Created DOCX: {} ({} bytes)", output.display(), bytes.len());
        Ok(report_for(&contract))
    }

    /// Build the DOCX package in memory
    pub fn render(&self, contract: &ContractText) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.write_package(contract, &mut buffer)?;
        Ok(buffer.into_inner())
    }

    fn write_package<W: Write + Seek>(&self, contract: &ContractText, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let parts = [
            ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
            ("_rels/.rels", PACKAGE_RELS_XML.to_string()),
            ("docProps/core.xml", core_properties_xml(&contract.title)),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML.to_string()),
            ("word/document.xml", document_xml(contract)),
            ("word/styles.xml", self.styles_xml()),
        ];

        for (path, xml) in parts {
            zip.start_file(path, options)?;
            zip.write_all(xml.as_bytes())?;
        }

        zip.finish()?;
        debug!(
            "Wrote DOCX package for '{}' with {} paragraph groups",
            contract.title,
            contract.paragraphs.len()
        );
        Ok(())
    }

    fn styles_xml(&self) -> String {
        let fonts = match &self.config.east_asia_font {
            Some(font) => format!(
                "<w:rFonts w:eastAsia=\"{}\"/>",
                escape_xml(font)
            ),
            None => String::new(),
        };

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="{WORD_NS}">
  <w:docDefaults>
    <w:rPrDefault><w:rPr>{fonts}<w:sz w:val="22"/><w:szCs w:val="22"/><w:lang w:eastAsia="zh-CN"/></w:rPr></w:rPrDefault>
  </w:docDefaults>
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Title">
    <w:name w:val="Title"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:pPr><w:spacing w:after="240"/><w:outlineLvl w:val="0"/></w:pPr>
    <w:rPr><w:b/><w:sz w:val="56"/><w:szCs w:val="56"/></w:rPr>
  </w:style>
</w:styles>"#
        )
    }
}

fn report_for(contract: &ContractText) -> DocxReport {
    DocxReport {
        groups: contract.paragraphs.len(),
        lines: contract.line_count(),
    }
}

/// Main document part: title, then each paragraph group followed by a spacer
fn document_xml(contract: &ContractText) -> String {
    let mut body = String::new();

    body.push_str("<w:p><w:pPr><w:pStyle w:val=\"Title\"/></w:pPr>");
    push_run(&mut body, &contract.title);
    body.push_str("</w:p>\n");

    for paragraph in &contract.paragraphs {
        for line in &paragraph.lines {
            body.push_str("<w:p>");
            push_run(&mut body, line);
            body.push_str("</w:p>\n");
        }
        body.push_str("<w:p/>\n");
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{WORD_NS}">
<w:body>
{body}<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr>
</w:body>
</w:document>"#
    )
}

fn push_run(out: &mut String, text: &str) {
    out.push_str("<w:r><w:t xml:space=\"preserve\">");
    out.push_str(&escape_xml(text));
    out.push_str("</w:t></w:r>");
}

fn core_properties_xml(title: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/">
<dc:title>{}</dc:title>
</cp:coreProperties>"#,
        escape_xml(title)
    )
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
