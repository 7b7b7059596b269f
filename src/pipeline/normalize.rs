use anyhow::{Context, Result};
use regex::Regex;

use crate::pipeline::boilerplate::BoilerplateSet;
use crate::util::collapse_whitespace;

#[derive(Debug)]
pub struct TextNormalizer {
    horizontal_whitespace: Regex,
}

#[derive(Debug, Default)]
pub struct StrippedText {
    pub text: String,
    pub lines_removed: usize,
}

impl TextNormalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            horizontal_whitespace: Regex::new(r"[^\S\n]+")
                .context("failed to compile horizontal whitespace regex")?,
        })
    }

    /// Drops raw lines whose collapsed form is boilerplate and rejoins the
    /// pages in order. Blank lines survive so paragraph breaks stay visible.
    pub fn strip_boilerplate(&self, pages: &[String], boilerplate: &BoilerplateSet) -> StrippedText {
        let mut lines_removed = 0usize;
        let cleaned_pages = pages
            .iter()
            .map(|page| {
                page.lines()
                    .filter(|line| {
                        let normalized = collapse_whitespace(line);
                        let remove = !normalized.is_empty() && boilerplate.contains(&normalized);
                        if remove {
                            lines_removed += 1;
                        }
                        !remove
                    })
                    .collect::<Vec<&str>>()
                    .join("\n")
            })
            .collect::<Vec<String>>();

        StrippedText {
            text: cleaned_pages.join("\n"),
            lines_removed,
        }
    }

    /// Removes carriage returns and collapses runs of horizontal whitespace,
    /// keeping newlines.
    pub fn normalize_whitespace(&self, text: &str) -> String {
        let without_cr = text.replace('\r', "");
        self.horizontal_whitespace
            .replace_all(&without_cr, " ")
            .into_owned()
    }
}
