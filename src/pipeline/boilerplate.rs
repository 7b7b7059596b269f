use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

use crate::config::PipelineConfig;
use crate::util::collapse_whitespace;

/// Collapsed header/footer lines found in one document.
pub type BoilerplateSet = HashSet<String>;

#[derive(Debug)]
pub struct BoilerplateDetector {
    repeat_ratio: f64,
    min_line_chars: usize,
    patterns: Vec<Regex>,
}

impl BoilerplateDetector {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let patterns = config
            .boilerplate_patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .with_context(|| format!("failed to compile boilerplate pattern: {pattern}"))
            })
            .collect::<Result<Vec<Regex>>>()?;

        Ok(Self {
            repeat_ratio: config.repeat_ratio,
            min_line_chars: config.min_repeat_line_chars,
            patterns,
        })
    }

    /// Minimum number of occurrences for a line to count as repeated.
    pub fn cutoff(&self, page_count: usize) -> usize {
        // The epsilon keeps products like 30 * 0.7 from flooring to 20.
        let scaled = (page_count as f64 * self.repeat_ratio + 1e-9).floor() as usize;
        scaled.max(2)
    }

    pub fn detect(&self, pages: &[String]) -> BoilerplateSet {
        let mut repeated = BoilerplateSet::new();
        if pages.is_empty() {
            return repeated;
        }

        let mut occurrences = HashMap::<String, usize>::new();
        for page in pages {
            for line in page.lines() {
                let normalized = collapse_whitespace(line);
                if normalized.is_empty() {
                    continue;
                }

                if self.matches_catalog(&normalized) {
                    repeated.insert(normalized.clone());
                }

                if normalized.chars().count() < self.min_line_chars {
                    continue;
                }
                *occurrences.entry(normalized).or_insert(0) += 1;
            }
        }

        let cutoff = self.cutoff(pages.len());
        repeated.extend(
            occurrences
                .into_iter()
                .filter_map(|(line, count)| if count >= cutoff { Some(line) } else { None }),
        );

        repeated
    }

    fn matches_catalog(&self, normalized: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.is_match(normalized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(ratio: f64) -> BoilerplateDetector {
        let config = PipelineConfig {
            repeat_ratio: ratio,
            ..PipelineConfig::default()
        };
        BoilerplateDetector::new(&config).expect("detector")
    }

    fn pages_with_repeats(total: usize, header_pages: usize, other_pages: usize) -> Vec<String> {
        (0..total)
            .map(|index| {
                let mut page = String::new();
                if index < header_pages {
                    page.push_str("Acme Chemical Corporation\n");
                }
                if index < other_pages {
                    page.push_str("Keep container tightly closed\n");
                }
                page.push_str(&format!("unique body text number {index}\n"));
                page
            })
            .collect()
    }

    #[test]
    fn cutoff_floors_ratio_with_minimum_of_two() {
        let seventy = detector(0.7);
        assert_eq!(seventy.cutoff(10), 7);
        assert_eq!(seventy.cutoff(30), 21);
        assert_eq!(seventy.cutoff(1), 2);

        let sixty = detector(0.6);
        assert_eq!(sixty.cutoff(10), 6);
        assert_eq!(sixty.cutoff(3), 2);
    }

    #[test]
    fn line_on_eight_of_ten_pages_is_boilerplate_but_six_is_not() {
        let pages = pages_with_repeats(10, 8, 6);
        let repeated = detector(0.7).detect(&pages);

        assert!(repeated.contains("Acme Chemical Corporation"));
        assert!(!repeated.contains("Keep container tightly closed"));
    }

    #[test]
    fn catalog_patterns_apply_to_short_and_unrepeated_lines() {
        let pages = vec![
            "SAFETY  DATA SHEET\nbody one\nPage 1 of 2\n".to_string(),
            "revision date: 2021-01-01\nbody two\n".to_string(),
        ];
        let repeated = detector(0.6).detect(&pages);

        assert!(repeated.contains("SAFETY DATA SHEET"));
        assert!(repeated.contains("Page 1 of 2"));
        assert!(repeated.contains("revision date: 2021-01-01"));
        assert!(!repeated.contains("body one"));
    }

    #[test]
    fn short_lines_are_not_frequency_counted() {
        let pages = vec!["N/A\nfirst\n".to_string(), "N/A\nsecond\n".to_string()];
        let repeated = detector(0.6).detect(&pages);

        assert!(!repeated.contains("N/A"));
    }

    #[test]
    fn repeats_within_a_single_page_are_counted() {
        let pages = vec!["Acme Chemical Corporation\nbody\nAcme Chemical Corporation\n".to_string()];
        let repeated = detector(0.6).detect(&pages);

        assert!(repeated.contains("Acme Chemical Corporation"));
        assert!(!repeated.contains("body"));
    }

    #[test]
    fn lines_seen_once_on_a_single_page_are_kept() {
        let pages = vec!["Keep away from heat\nStore in a cool place\n".to_string()];
        let repeated = detector(0.6).detect(&pages);

        assert!(repeated.is_empty());
    }
}
