use anyhow::{Context, Result};
use regex::Regex;

use crate::model::DocumentContent;

pub const PAGE_BREAK: char = '\u{000C}';

#[derive(Debug)]
pub struct PageSplitter {
    page_footer: Regex,
}

impl PageSplitter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            page_footer: Regex::new(r"(?im)^[^\S\n]*Page[^\S\n]+\d+[^\S\n]+of[^\S\n]+\d+[^\S\n]*$")
                .context("failed to compile page footer regex")?,
        })
    }

    pub fn pages_for(&self, content: &DocumentContent) -> Vec<String> {
        match content {
            DocumentContent::Text(text) => self.split(text),
            DocumentContent::Pages(pages) => pages.clone(),
        }
    }

    /// Splits on form feeds when present, else after each "Page N of M"
    /// footer line; text with neither marker is a single page.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.contains(PAGE_BREAK) {
            let mut pages = text
                .split(PAGE_BREAK)
                .map(|page| page.replace('\u{0000}', ""))
                .collect::<Vec<String>>();
            while pages.len() > 1 && pages.last().is_some_and(|page| page.trim().is_empty()) {
                pages.pop();
            }
            return pages;
        }

        let mut pages = Vec::new();
        let mut start = 0usize;
        for footer in self.page_footer.find_iter(text) {
            pages.push(text[start..footer.end()].to_string());
            start = footer.end();
        }

        if pages.is_empty() {
            return vec![text.to_string()];
        }

        let rest = &text[start..];
        if !rest.trim().is_empty() {
            pages.push(rest.to_string());
        }

        pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_form_feed_and_drops_trailing_blank_pages() {
        let splitter = PageSplitter::new().expect("splitter");
        let pages = splitter.split("one\n\u{000C}two\n\u{000C}\n\u{000C}");

        assert_eq!(pages, vec!["one\n".to_string(), "two\n".to_string()]);
    }

    #[test]
    fn splits_after_page_footers_keeping_footer_on_its_page() {
        let splitter = PageSplitter::new().expect("splitter");
        let text = "alpha\nPage 1 of 2\nbeta\n  page 2 OF 2  \n";
        let pages = splitter.split(text);

        assert_eq!(pages.len(), 2);
        assert!(pages[0].ends_with("Page 1 of 2"));
        assert!(pages[1].contains("beta"));
        assert!(pages[1].trim_end().ends_with("page 2 OF 2"));
    }

    #[test]
    fn text_without_markers_is_one_page() {
        let splitter = PageSplitter::new().expect("splitter");
        let text = "Section 1: Identification\nProduct Name: Acme\n";

        assert_eq!(splitter.split(text), vec![text.to_string()]);
    }

    #[test]
    fn extracted_pdf_text_is_split_by_the_same_rules() {
        let splitter = PageSplitter::new().expect("splitter");
        let content = DocumentContent::Text(
            "Section 1: Identification\n\u{0000}\u{000C}Section 2: Hazards\n\u{000C}".to_string(),
        );

        assert_eq!(
            splitter.pages_for(&content),
            vec![
                "Section 1: Identification\n".to_string(),
                "Section 2: Hazards\n".to_string()
            ]
        );
    }

    #[test]
    fn pre_split_pages_pass_through() {
        let splitter = PageSplitter::new().expect("splitter");
        let content = DocumentContent::Pages(vec!["a".to_string(), "b".to_string()]);

        assert_eq!(splitter.pages_for(&content), vec!["a", "b"]);
    }
}
