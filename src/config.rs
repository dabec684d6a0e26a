use crate::error::{ContractError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration for a fixture generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the `.txt` inputs; outputs are written next to them
    pub work_dir: PathBuf,

    /// Contract base names, processed in order
    pub contracts: Vec<String>,

    /// Font discovery settings
    pub fonts: FontConfig,

    /// PDF page geometry and type sizes
    pub page: PageConfig,

    /// DOCX settings
    pub docx: DocxConfig,
}

/// Font discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Logical name the resolved font is registered under
    pub name: String,

    /// Absolute font paths, tried in order
    pub candidates: Vec<PathBuf>,
}

/// PDF layout configuration, all values in points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub title_size: f32,
    pub title_leading: f32,
    /// Space after the title block
    pub title_spacing: f32,
    pub body_size: f32,
    pub body_leading: f32,
    /// Space after each body block
    pub block_spacing: f32,
}

/// DOCX output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocxConfig {
    /// East Asian font named in the document's default run properties
    pub east_asia_font: Option<String>,
}

fn default_contracts() -> Vec<String> {
    ["技术服务合同", "保密协议", "劳动合同", "销售合同"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

fn default_font_candidates() -> Vec<PathBuf> {
    [
        // macOS
        "/System/Library/Fonts/STHeiti Light.ttc",
        "/System/Library/Fonts/PingFang.ttc",
        "/System/Library/Fonts/STSong.ttf",
        "/System/Library/Fonts/STKaiti.ttc",
        // Linux
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
        "/usr/share/fonts/wenquanyi/wqy-zenhei/wqy-zenhei.ttc",
        // Windows
        "C:\\Windows\\Fonts\\simhei.ttf",
        "C:\\Windows\\Fonts\\simsun.ttc",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            contracts: default_contracts(),
            fonts: FontConfig::default(),
            page: PageConfig::default(),
            docx: DocxConfig::default(),
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            name: "ChineseFont".to_string(),
            candidates: default_font_candidates(),
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        // A4 with one-inch margins
        Self {
            width: 595.28,
            height: 841.89,
            margin_top: 72.0,
            margin_right: 72.0,
            margin_bottom: 72.0,
            margin_left: 72.0,
            title_size: 16.0,
            title_leading: 20.0,
            title_spacing: 12.0,
            body_size: 11.0,
            body_leading: 16.0,
            block_spacing: 6.0,
        }
    }
}

impl Default for DocxConfig {
    fn default() -> Self {
        Self {
            east_asia_font: Some("SimSun".to_string()),
        }
    }
}

impl PageConfig {
    /// Width available to text between the left and right margins
    pub fn frame_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    /// Height available to text between the top and bottom margins
    pub fn frame_height(&self) -> f32 {
        self.height - self.margin_top - self.margin_bottom
    }
}

impl Config {
    /// Load configuration from a TOML file. Missing keys fall back to defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check values that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.contracts.is_empty() {
            return Err(ContractError::Config(
                "contract list is empty".to_string(),
            ));
        }

        if self.contracts.iter().any(|name| name.trim().is_empty()) {
            return Err(ContractError::Config(
                "contract names must not be blank".to_string(),
            ));
        }

        let page = &self.page;
        if page.frame_width() <= 0.0 || page.frame_height() <= 0.0 {
            return Err(ContractError::Config(format!(
                "margins leave no printable area on a {}x{} pt page",
                page.width, page.height
            )));
        }

        if page.body_leading <= 0.0 || page.title_leading <= 0.0 {
            return Err(ContractError::Config(
                "leading must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Path of the `.txt` input for a contract
    pub fn input_path(&self, contract: &str) -> PathBuf {
        self.work_dir.join(format!("{contract}.txt"))
    }

    /// Path of the `.docx` output for a contract
    pub fn docx_path(&self, contract: &str) -> PathBuf {
        self.work_dir.join(format!("{contract}.docx"))
    }

    /// Path of the `.pdf` output for a contract
    pub fn pdf_path(&self, contract: &str) -> PathBuf {
        self.work_dir.join(format!("{contract}.pdf"))
    }
}
