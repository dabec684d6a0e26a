//! Batch driver: runs both emitters over every configured contract.
//!
//! Per-file failures never escape the driver. They are logged and recorded
//! in the [`BatchReport`] so the caller can inspect the outcome of each
//! contract without parsing console output.

use crate::config::Config;
use crate::docx::{DocxEmitter, DocxReport};
use crate::error::Result;
use crate::font::FontHandle;
use crate::pdf::{PdfEmitter, PdfReport};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Outcome of one emitter call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EmitStatus<R> {
    Created { path: PathBuf, report: R },
    Failed { path: PathBuf, error: String },
}

impl<R> EmitStatus<R> {
    fn from_result(path: PathBuf, result: Result<R>) -> Self {
        match result {
            Ok(report) => EmitStatus::Created { path, report },
            Err(e) => EmitStatus::Failed {
                path,
                error: e.to_string(),
            },
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, EmitStatus::Created { .. })
    }
}

/// What happened to one contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ContractOutcome {
    /// The `.txt` input was missing; neither emitter ran
    Skipped { input: PathBuf },
    Processed {
        docx: EmitStatus<DocxReport>,
        pdf: EmitStatus<PdfReport>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractResult {
    pub name: String,
    #[serde(flatten)]
    pub outcome: ContractOutcome,
}

/// Structured summary of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub font: Option<PathBuf>,
    pub contracts: Vec<ContractResult>,
    /// Expected outputs found on disk after the run
    pub verified_outputs: Vec<PathBuf>,
}

impl BatchReport {
    pub fn skipped(&self) -> usize {
        self.contracts
            .iter()
            .filter(|c| matches!(c.outcome, ContractOutcome::Skipped { .. }))
            .count()
    }

    /// Number of emitter calls that failed
    pub fn failures(&self) -> usize {
        self.contracts
            .iter()
            .map(|c| match &c.outcome {
                ContractOutcome::Skipped { .. } => 0,
                ContractOutcome::Processed { docx, pdf } => {
                    usize::from(!docx.is_created()) + usize::from(!pdf.is_created())
                }
            })
            .sum()
    }

    /// Number of documents written
    pub fn created(&self) -> usize {
        self.contracts
            .iter()
            .map(|c| match &c.outcome {
                ContractOutcome::Skipped { .. } => 0,
                ContractOutcome::Processed { docx, pdf } => {
                    usize::from(docx.is_created()) + usize::from(pdf.is_created())
                }
            })
            .sum()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.font {
            Some(path) => writeln!(f, "Font: {}", path.display())?,
            None => writeln!(f, "Font: built-in Helvetica")?,
        }

        for contract in &self.contracts {
            match &contract.outcome {
                ContractOutcome::Skipped { input } => {
                    writeln!(f, "  ⚠️  {}: skipped, {} not found", contract.name, input.display())?;
                }
                ContractOutcome::Processed { docx, pdf } => {
                    write_status(f, &contract.name, "DOCX", docx)?;
                    write_status(f, &contract.name, "PDF", pdf)?;
                }
            }
        }

        writeln!(f)?;
        writeln!(f, "Generated files:")?;
        for path in &self.verified_outputs {
            writeln!(f, "  ✓ {}", path.display())?;
        }

        write!(
            f,
            "{} created, {} failed, {} skipped",
            self.created(),
            self.failures(),
            self.skipped()
        )
    }
}

fn write_status<R>(f: &mut fmt::Formatter<'_>, name: &str, kind: &str, status: &EmitStatus<R>) -> fmt::Result {
    match status {
        EmitStatus::Created { path, .. } => writeln!(f, "  ✓ {name}: {kind} {}", path.display()),
        EmitStatus::Failed { path, error } => {
            writeln!(f, "  ✗ {name}: {kind} {} failed: {error}", path.display())
        }
    }
}

/// Runs the DOCX and PDF emitters over the configured contracts
pub struct BatchDriver<'a> {
    config: &'a Config,
    font: Option<FontHandle>,
}

impl<'a> BatchDriver<'a> {
    pub fn new(config: &'a Config, font: Option<FontHandle>) -> Self {
        Self { config, font }
    }

    /// Process every contract, then verify which outputs exist
    pub fn run(&self) -> BatchReport {
        info!(
            "Generating contract fixtures in {}",
            self.config.work_dir.display()
        );

        let docx = DocxEmitter::new(self.config.docx.clone());
        let pdf = PdfEmitter::new(self.config.page.clone(), self.font.as_ref());

        let contracts = self
            .config
            .contracts
            .iter()
            .map(|name| ContractResult {
                name: name.clone(),
                outcome: self.process(name, &docx, &pdf),
            })
            .collect();

        let report = BatchReport {
            font: self.font.as_ref().map(|handle| handle.path.clone()),
            contracts,
            verified_outputs: self.verify_outputs(),
        };

        info!(
            "Generation finished: {} created, {} failed, {} skipped",
            report.created(),
            report.failures(),
            report.skipped()
        );
        report
    }

    fn process(&self, name: &str, docx: &DocxEmitter, pdf: &PdfEmitter<'_>) -> ContractOutcome {
        let input = self.config.input_path(name);
        if !input.exists() {
            warn!("⚠️  Input file not found, skipping: {}", input.display());
            return ContractOutcome::Skipped { input };
        }

        let docx_path = self.config.docx_path(name);
        let docx_result = docx.emit(&input, &docx_path);
        if let Err(e) = &docx_result {
            error!("✗ Failed to create DOCX ({}): {}", docx_path.display(), e);
        }

        let pdf_path = self.config.pdf_path(name);
        let pdf_result = pdf.emit(&input, &pdf_path);
        if let Err(e) = &pdf_result {
            error!("✗ Failed to create PDF ({}): {}", pdf_path.display(), e);
        }

        ContractOutcome::Processed {
            docx: EmitStatus::from_result(docx_path, docx_result),
            pdf: EmitStatus::from_result(pdf_path, pdf_result),
        }
    }

    /// Expected `.docx`/`.pdf` outputs currently present, in contract order
    pub fn verify_outputs(&self) -> Vec<PathBuf> {
        self.config
            .contracts
            .iter()
            .flat_map(|name| [self.config.docx_path(name), self.config.pdf_path(name)])
            .filter(|path| path.exists())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir, contracts: &[&str]) -> Config {
        Config {
            work_dir: dir.path().to_path_buf(),
            contracts: contracts.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_input_is_skipped() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir, &["保密协议"]);

        let report = BatchDriver::new(&config, None).run();

        assert_eq!(report.skipped(), 1);
        assert_eq!(report.created(), 0);
        assert!(report.verified_outputs.is_empty());
        assert!(!dir.path().join("保密协议.docx").exists());
        assert!(!dir.path().join("保密协议.pdf").exists());
    }

    #[test]
    fn test_present_input_yields_both_outputs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("劳动合同.txt"), "第一条\n甲方\n\n第二条\n乙方").unwrap();
        let config = config_in(&dir, &["劳动合同"]);

        let report = BatchDriver::new(&config, None).run();

        assert_eq!(report.created(), 2);
        assert_eq!(report.failures(), 0);
        assert_eq!(
            report.verified_outputs,
            vec![dir.path().join("劳动合同.docx"), dir.path().join("劳动合同.pdf")]
        );
    }

    #[test]
    fn test_docx_failure_does_not_block_pdf() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("销售合同.txt"), "第一条").unwrap();
        // a directory where the DOCX file should go makes the write fail
        fs::create_dir(dir.path().join("销售合同.docx")).unwrap();
        let config = config_in(&dir, &["销售合同"]);

        let report = BatchDriver::new(&config, None).run();

        match &report.contracts[0].outcome {
            ContractOutcome::Processed { docx, pdf } => {
                assert!(!docx.is_created());
                assert!(pdf.is_created());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(report.failures(), 1);
        assert!(dir.path().join("销售合同.pdf").is_file());
    }

    #[test]
    fn test_report_display_lists_markers() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("技术服务合同.txt"), "第一条").unwrap();
        let config = config_in(&dir, &["技术服务合同", "保密协议"]);

        let summary = BatchDriver::new(&config, None).run().to_string();

        assert!(summary.contains("Font: built-in Helvetica"));
        assert!(summary.contains("✓ 技术服务合同: DOCX"));
        assert!(summary.contains("⚠️  保密协议: skipped"));
        assert!(summary.ends_with("2 created, 0 failed, 1 skipped"));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("技术服务合同.txt"), "第一条\n\n第二条").unwrap();
        let config = config_in(&dir, &["技术服务合同", "保密协议"]);

        let report = BatchDriver::new(&config, None).run();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["contracts"][0]["name"], "技术服务合同");
        assert_eq!(json["contracts"][0]["outcome"], "processed");
        assert_eq!(json["contracts"][0]["docx"]["status"], "created");
        assert_eq!(json["contracts"][0]["docx"]["report"]["groups"], 2);
        assert_eq!(json["contracts"][0]["pdf"]["report"]["body_blocks"], 2);
        assert_eq!(json["contracts"][1]["outcome"], "skipped");
        assert!(json["font"].is_null());
    }
}
