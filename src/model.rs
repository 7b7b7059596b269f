use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Product name recorded when no labeled value is found.
pub const PRODUCT_NAME_UNKNOWN: &str = "UNKNOWN";

/// Heading attached to records produced by the windowed fallback.
pub const FULL_SECTION_HEADING: &str = "FULL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Text,
    Pdf,
}

impl DocumentFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Pdf => "pdf",
        }
    }

    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        let extension = path.extension().and_then(|ext| ext.to_str())?;
        if extension.eq_ignore_ascii_case("txt") {
            Some(Self::Text)
        } else if extension.eq_ignore_ascii_case("pdf") {
            Some(Self::Pdf)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub enum DocumentContent {
    /// Concatenated text, possibly carrying form-feed or footer page markers.
    Text(String),
    /// Pages already split by the caller.
    Pages(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct RawDocument {
    pub path: PathBuf,
    pub file_name: String,
    pub format: DocumentFormat,
    pub content: DocumentContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub heading_text: String,
    pub section_id: Option<String>,
    pub section_title: Option<String>,
    pub parent_section_id: Option<String>,
    pub body_text: String,
}

impl SectionRecord {
    pub fn is_subsection(&self) -> bool {
        self.parent_section_id.is_some()
    }

    pub fn is_full_window(&self) -> bool {
        self.section_id.is_none() && self.heading_text == FULL_SECTION_HEADING
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub source: String,
    pub file_name: String,
    pub product_name: String,
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub section_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub section_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_section_id: Option<String>,
    pub format: DocumentFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievableRecord {
    pub page_content: String,
    pub metadata: RecordMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentProduct {
    pub source: String,
    pub file_name: String,
    pub product_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedSource {
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub filename: String,
    pub format: DocumentFormat,
    pub size_bytes: u64,
    pub modified_secs: i64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub corpus_signature: String,
    pub source_count: usize,
    pub sources: Vec<SourceEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestPaths {
    pub cache_root: String,
    pub source_directory: String,
    pub manifest_dir: String,
    pub db_path: String,
    pub records_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngestCounts {
    pub source_count: usize,
    pub processed_count: usize,
    pub skipped_count: usize,
    pub records_total: usize,
    pub top_level_sections: usize,
    pub subsections: usize,
    pub full_windows: usize,
    pub unknown_products: usize,
    pub boilerplate_lines_removed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub corpus_signature: String,
    pub previous_signature: Option<String>,
    #[serde(default)]
    pub config_fingerprint: String,
    #[serde(default)]
    pub previous_config_fingerprint: Option<String>,
    pub rebuilt: bool,
    pub command: String,
    pub paths: IngestPaths,
    pub counts: IngestCounts,
    pub products: Vec<DocumentProduct>,
    pub skipped: Vec<SkippedSource>,
    pub warnings: Vec<String>,
}
