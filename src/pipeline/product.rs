use std::collections::HashMap;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::model::PRODUCT_NAME_UNKNOWN;
use crate::util::collapse_whitespace;

#[derive(Debug)]
struct BlockStartRule {
    name: &'static str,
    pattern: Regex,
}

/// Recovers the product name from the identification section of an SDS.
#[derive(Debug)]
pub struct ProductNameExtractor {
    block_starts: Vec<BlockStartRule>,
    block_ends: Vec<Regex>,
    name_labels: Vec<String>,
    ignored_labels: Vec<String>,
    aliases: HashMap<String, String>,
    fallback_chars: usize,
    use_prefix: Regex,
    noisy_tail: Regex,
}

impl ProductNameExtractor {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let block_starts = vec![
            BlockStartRule {
                name: "section_keyword",
                pattern: Regex::new(r"(?im)^[^\S\n]*sec(?:tion)?\.?[^\S\n]*0*1\b")
                    .context("failed to compile section 1 keyword regex")?,
            },
            BlockStartRule {
                name: "numbered_title",
                pattern: Regex::new(r"(?m)^[^\S\n]*0?1[^\S\n]*[.\-–][^\S\n]+[A-Z]")
                    .context("failed to compile section 1 numbered regex")?,
            },
            BlockStartRule {
                name: "all_caps_title",
                pattern: Regex::new(r"(?m)^[^\S\n]*0?1[^\S\n]+[A-Z][A-Z \-]{3,}")
                    .context("failed to compile section 1 all-caps regex")?,
            },
        ];

        let block_ends = vec![
            Regex::new(r"(?im)^[^\S\n]*sec(?:tion)?\.?[^\S\n]*0*2\b")
                .context("failed to compile section 2 keyword regex")?,
            Regex::new(r"(?m)^[^\S\n]*0?2(?:[^\S\n]*[.\-–][^\S\n]*|[^\S\n]+)[A-Z]")
                .context("failed to compile section 2 numbered regex")?,
        ];

        let aliases = config
            .product_aliases
            .iter()
            .map(|(alias, canonical)| (alias.to_lowercase(), canonical.clone()))
            .collect();

        Ok(Self {
            block_starts,
            block_ends,
            name_labels: config.name_labels.clone(),
            ignored_labels: config.ignored_labels.clone(),
            aliases,
            fallback_chars: config.identification_fallback_chars,
            use_prefix: Regex::new(r"(?i)^(?:use|intended)\b")
                .context("failed to compile use-prefix regex")?,
            noisy_tail: Regex::new(r"(?i)\b(?:SDS|CAS)\s*No\b\.?")
                .context("failed to compile SDS/CAS tail regex")?,
        })
    }

    /// Returns the product name, or `UNKNOWN` when no labeled value exists.
    /// `file_name` only feeds log fields.
    pub fn extract(&self, text: &str, file_name: &str) -> String {
        let block = self.identification_block(text, file_name);
        let lines = block
            .lines()
            .map(collapse_whitespace)
            .filter(|line| !line.is_empty())
            .collect::<Vec<String>>();

        match self.scan_lines(&lines) {
            Some(value) => {
                let canonical = self.canonicalize(value);
                info!(file = %file_name, product_name = %canonical, "extracted product name");
                canonical
            }
            None => {
                warn!(file = %file_name, "product name not found; using UNKNOWN");
                PRODUCT_NAME_UNKNOWN.to_string()
            }
        }
    }

    /// The span from the first section 1 heading up to the following section
    /// 2 heading, or the leading characters of the text when there is none.
    pub fn identification_block<'a>(&self, text: &'a str, file_name: &str) -> &'a str {
        for rule in &self.block_starts {
            let Some(start) = rule.pattern.find(text) else {
                continue;
            };

            let rest = &text[start.end()..];
            let end = self
                .block_ends
                .iter()
                .filter_map(|pattern| pattern.find(rest).map(|found| start.end() + found.start()))
                .min()
                .unwrap_or(text.len());

            debug!(file = %file_name, rule = rule.name, "identification block located");
            return &text[start.start()..end];
        }

        warn!(
            file = %file_name,
            chars = self.fallback_chars,
            "identification block not found; scanning leading text"
        );
        match text.char_indices().nth(self.fallback_chars) {
            Some((index, _)) => &text[..index],
            None => text,
        }
    }

    fn scan_lines(&self, lines: &[String]) -> Option<String> {
        for (index, line) in lines.iter().enumerate() {
            if let Some((left, right)) = line.split_once(':') {
                let left = left.trim();
                if self.is_ignored_label(left) || !self.is_name_label(left) {
                    continue;
                }

                let right = right.trim();
                if right.is_empty() {
                    if let Some(value) = self.value_from_next_line(lines, index) {
                        return Some(value);
                    }
                    continue;
                }

                let value = self.clean_value(right);
                if value.is_empty() || self.use_prefix.is_match(&value) {
                    continue;
                }
                return Some(value);
            }

            if self.is_name_label(line) && !self.is_ignored_label(line) {
                if let Some(value) = self.value_from_next_line(lines, index) {
                    return Some(value);
                }
            }
        }

        None
    }

    fn value_from_next_line(&self, lines: &[String], index: usize) -> Option<String> {
        let next = lines.get(index + 1)?;
        if self.looks_like_label(next) {
            return None;
        }

        let value = self.clean_value(next);
        if value.is_empty() || self.looks_like_label(&value) {
            return None;
        }
        Some(value)
    }

    fn looks_like_label(&self, line: &str) -> bool {
        if self.is_name_label(line) || self.is_ignored_label(line) {
            return true;
        }

        match line.split_once(':') {
            Some((left, _)) => self.is_name_label(left.trim()) || self.is_ignored_label(left.trim()),
            None => false,
        }
    }

    fn is_name_label(&self, candidate: &str) -> bool {
        self.name_labels
            .iter()
            .any(|label| label.eq_ignore_ascii_case(candidate))
    }

    fn is_ignored_label(&self, candidate: &str) -> bool {
        let lower = candidate.trim().to_lowercase();
        self.ignored_labels
            .iter()
            .any(|ignored| lower.starts_with(&ignored.to_lowercase()))
    }

    fn clean_value(&self, value: &str) -> String {
        let collapsed = collapse_whitespace(value);
        match self.noisy_tail.find(&collapsed) {
            Some(tail) => collapsed[..tail.start()].trim_end().to_string(),
            None => collapsed,
        }
    }

    fn canonicalize(&self, value: String) -> String {
        self.aliases
            .get(&value.to_lowercase())
            .cloned()
            .unwrap_or(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ProductNameExtractor {
        ProductNameExtractor::new(&PipelineConfig::default()).expect("extractor")
    }

    #[test]
    fn label_value_stops_before_sds_number() {
        let text = "Section 1: Identification\nProduct Name: Acme Degreaser\nSDS No. 1234\nSection 2: Hazards\nFlammable.";
        assert_eq!(extractor().extract(text, "acme.txt"), "Acme Degreaser");
    }

    #[test]
    fn inline_sds_and_cas_tails_are_truncated() {
        let text = "Section 1: Identification\nProduct Name:  Acme   Cleaner SDS No. 555 CAS No. 64-17-5\n";
        assert_eq!(extractor().extract(text, "cleaner.txt"), "Acme Cleaner");
    }

    #[test]
    fn names_starting_with_cas_or_sds_letters_are_kept_whole() {
        let text = "Section 1: Identification\nProduct Name: Casnova Cleaner\nSection 2: Hazards\n";
        assert_eq!(extractor().extract(text, "casnova.txt"), "Casnova Cleaner");

        let text = "Section 1: Identification\nTrade Name: SDSnow Melt CAS No 7647-14-5\nSection 2: Hazards\n";
        assert_eq!(extractor().extract(text, "melt.txt"), "SDSnow Melt");
    }

    #[test]
    fn label_on_its_own_line_takes_the_next_line() {
        let text = "Trade Name\nAcme Degreaser 500\nSection 2: Hazards\nFlammable.";
        assert_eq!(extractor().extract(text, "trade.txt"), "Acme Degreaser 500");
    }

    #[test]
    fn empty_colon_value_reads_the_next_line() {
        let text = "1. IDENTIFICATION\nProduct name :\n\n  Acme Rust Remover\n2. HAZARDS IDENTIFICATION\n";
        assert_eq!(extractor().extract(text, "remover.txt"), "Acme Rust Remover");
    }

    #[test]
    fn no_label_yields_unknown() {
        let text = "This document describes a cleaning solution.\nKeep away from children.";
        assert_eq!(extractor().extract(text, "none.txt"), PRODUCT_NAME_UNKNOWN);
    }

    #[test]
    fn ignored_labels_and_use_values_are_skipped() {
        let text = "Section 1 - Identification\nProduct Use: Degreasing\nSupplier Name: Acme Corp\nProduct: Use: Automotive degreaser\nProduct Name: Shiny Parts Wash\nSection 2 - Hazards\n";
        assert_eq!(extractor().extract(text, "shiny.txt"), "Shiny Parts Wash");
    }

    #[test]
    fn label_followed_by_another_label_is_not_a_value() {
        let text = "Section 1\nProduct Name\nManufacturer: Acme Industries\nName: Widget Polish\nSection 2\n";
        assert_eq!(extractor().extract(text, "widget.txt"), "Widget Polish");
    }

    #[test]
    fn search_is_confined_to_the_identification_block() {
        let text = "Section 1: Identification\nRecommended use: Cleaning\nSection 2: Hazards\nProduct Name: Not This One\n";
        assert_eq!(extractor().extract(text, "confined.txt"), PRODUCT_NAME_UNKNOWN);
    }

    #[test]
    fn numbered_and_all_caps_blocks_are_located() {
        let extractor = extractor();

        let numbered = "Preface\n1. Identification\nTrade name: Alpha\n2. Hazards identification\nProduct Name: Beta\n";
        let block = extractor.identification_block(numbered, "numbered.txt");
        assert!(block.starts_with("1. Identification"));
        assert!(!block.contains("Beta"));

        let caps = "1 IDENTIFICATION\nChemical Name: Gamma\n2 HAZARDS\n";
        assert_eq!(extractor.extract(caps, "caps.txt"), "Gamma");
    }

    #[test]
    fn fallback_window_is_limited_to_leading_characters() {
        let filler = "x".repeat(2600);
        let text = format!("{filler}\nProduct Name: Too Late\n");
        assert_eq!(extractor().extract(&text, "late.txt"), PRODUCT_NAME_UNKNOWN);
    }

    #[test]
    fn aliases_canonicalize_extracted_names() {
        let mut config = PipelineConfig::default();
        config
            .product_aliases
            .insert("ACME DEGREASER".to_string(), "Acme Degreaser 500".to_string());
        let extractor = ProductNameExtractor::new(&config).expect("extractor");

        let text = "Section 1\nProduct Name: acme degreaser\n";
        assert_eq!(extractor.extract(text, "alias.txt"), "Acme Degreaser 500");
    }
}
