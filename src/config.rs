use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DEFAULT_REPEAT_RATIO: f64 = 0.6;

/// Heuristic tables and thresholds driving the ingestion pipeline.
///
/// Every field has a default, so a JSON override file only needs the keys it
/// changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fraction of pages a line must appear on to count as a header/footer.
    pub repeat_ratio: f64,
    /// Collapsed lines shorter than this never enter frequency counting.
    pub min_repeat_line_chars: usize,
    /// Case-insensitive patterns that mark a line as boilerplate outright.
    pub boilerplate_patterns: Vec<String>,
    /// Labels introducing a product name, highest priority first.
    pub name_labels: Vec<String>,
    /// Line prefixes that must never be read as a product name source.
    pub ignored_labels: Vec<String>,
    /// Extracted name (case-insensitive) to canonical product name.
    pub product_aliases: BTreeMap<String, String>,
    /// Characters searched when no identification section is found.
    pub identification_fallback_chars: usize,
    pub fallback_window_chars: usize,
    pub fallback_window_overlap: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            repeat_ratio: DEFAULT_REPEAT_RATIO,
            min_repeat_line_chars: 5,
            boilerplate_patterns: [
                r"^Page\s+\d+\s+of\s+\d+",
                r"^Revision\s+date",
                r"^Date\s+of\s+print",
                r"^SAFETY\s+DATA\s+SHEET",
                r"according to Regulation",
                r"^Document\s+number",
            ]
            .into_iter()
            .map(ToOwned::to_owned)
            .collect(),
            name_labels: [
                "Product Name",
                "Product",
                "Trade Name",
                "Product Identifier",
                "Chemical Name",
                "Material Name",
                "Substance Name",
                "Name",
            ]
            .into_iter()
            .map(ToOwned::to_owned)
            .collect(),
            ignored_labels: [
                "Product Use",
                "Intended Use",
                "Recommended use",
                "Supplier",
                "Manufacturer",
                "Company",
                "Emergency",
                "Address",
                "Phone",
            ]
            .into_iter()
            .map(ToOwned::to_owned)
            .collect(),
            product_aliases: BTreeMap::new(),
            identification_fallback_chars: 2500,
            fallback_window_chars: 1200,
            fallback_window_overlap: 200,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = fs::read(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                serde_json::from_slice::<PipelineConfig>(&raw)
                    .with_context(|| format!("failed to parse {}", path.display()))?
            }
            None => PipelineConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn with_repeat_ratio(mut self, ratio: Option<f64>) -> Result<Self> {
        if let Some(ratio) = ratio {
            self.repeat_ratio = ratio;
        }
        self.validate()?;
        Ok(self)
    }

    /// SHA-256 of the serialized settings; records built under a different
    /// fingerprint are stale.
    pub fn fingerprint(&self) -> Result<String> {
        let encoded =
            serde_json::to_vec(self).context("failed to serialize pipeline config")?;
        Ok(format!("{:x}", Sha256::digest(&encoded)))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.repeat_ratio > 0.0 && self.repeat_ratio <= 1.0) {
            bail!(
                "repeat_ratio must be within (0, 1], got {}",
                self.repeat_ratio
            );
        }
        if self.fallback_window_chars == 0 {
            bail!("fallback_window_chars must be positive");
        }
        if self.fallback_window_overlap >= self.fallback_window_chars {
            bail!(
                "fallback_window_overlap ({}) must be smaller than fallback_window_chars ({})",
                self.fallback_window_overlap,
                self.fallback_window_chars
            );
        }
        if self.name_labels.is_empty() {
            bail!("name_labels must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"repeat_ratio": 0.7, "product_aliases": {"acme 500": "Acme Degreaser 500"}}"#)
                .expect("config should parse");

        assert_eq!(config.repeat_ratio, 0.7);
        assert_eq!(config.fallback_window_chars, 1200);
        assert_eq!(config.name_labels.last().map(String::as_str), Some("Name"));
        assert_eq!(config.product_aliases.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn fingerprint_tracks_effective_settings() {
        let base = PipelineConfig::default().fingerprint().expect("fingerprint");
        assert_eq!(base, PipelineConfig::default().fingerprint().expect("fingerprint"));
        assert_eq!(base.len(), 64);

        let stricter = PipelineConfig::default()
            .with_repeat_ratio(Some(0.7))
            .expect("config")
            .fingerprint()
            .expect("fingerprint");
        assert_ne!(base, stricter);
    }

    #[test]
    fn validate_rejects_out_of_range_ratio_and_overlap() {
        let ratio = PipelineConfig::default().with_repeat_ratio(Some(1.5));
        assert!(ratio.is_err());

        let overlap = PipelineConfig {
            fallback_window_overlap: 1200,
            ..PipelineConfig::default()
        };
        assert!(overlap.validate().is_err());
    }
}
