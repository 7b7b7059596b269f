use anyhow::{Context, Result};
use regex::{Captures, Regex};
use tracing::debug;

use crate::config::PipelineConfig;
use crate::model::{FULL_SECTION_HEADING, SectionRecord};
use crate::pipeline::window::split_windows;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingRuleKind {
    /// `Section 7`, `SECTION 07:`, `Sec. 7.1 -`
    Keyword,
    /// `7. Handling and storage`, `7.1 Precautions for safe handling`
    Numbered,
    /// `7 HANDLING AND STORAGE`
    AllCaps,
}

impl HeadingRuleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Numbered => "numbered",
            Self::AllCaps => "all_caps",
        }
    }
}

#[derive(Debug)]
struct HeadingRule {
    kind: HeadingRuleKind,
    pattern: Regex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingMatch {
    pub rule: HeadingRuleKind,
    pub line_start: usize,
    pub line_end: usize,
    pub heading_text: String,
    pub major: u32,
    pub minor: Option<u32>,
    pub title: Option<String>,
}

impl HeadingMatch {
    pub fn section_id(&self) -> String {
        match self.minor {
            Some(minor) => format!("{}.{}", self.major, minor),
            None => self.major.to_string(),
        }
    }

    pub fn is_subsection(&self) -> bool {
        self.minor.is_some()
    }
}

/// Splits cleaned SDS text into top-level sections and their subsections.
///
/// Heading rules are tried in table order and the first match on a line
/// wins, so the explicit `Section` keyword form outranks the bare numeric
/// forms.
#[derive(Debug)]
pub struct SectionParser {
    rules: Vec<HeadingRule>,
    toc_line: Regex,
    window_chars: usize,
    window_overlap: usize,
}

impl SectionParser {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let rules = vec![
            HeadingRule {
                kind: HeadingRuleKind::Keyword,
                pattern: Regex::new(
                    r"(?i)^[ ]*(?:section|sec)\.?[ ]*0*(?P<major>\d{1,2})(?:\.0*(?P<minor>\d{1,2}))?(?:[ ]*[:.\-–][ ]*|[ ]+|[ ]*$)(?P<title>.*)$",
                )
                .context("failed to compile keyword heading regex")?,
            },
            HeadingRule {
                kind: HeadingRuleKind::Numbered,
                pattern: Regex::new(
                    r"^[ ]*(?P<major>\d{1,2})(?:\.(?P<minor>\d{1,2})\.?|[ ]*[.\-–])[ ]+(?P<title>[A-Z].*)$",
                )
                .context("failed to compile numbered heading regex")?,
            },
            HeadingRule {
                kind: HeadingRuleKind::AllCaps,
                pattern: Regex::new(
                    r"^[ ]*(?P<major>\d{1,2})(?:\.(?P<minor>\d{1,2}))?[ ]+(?P<title>[A-Z][A-Z \-/&,]{3,}.*)$",
                )
                .context("failed to compile all-caps heading regex")?,
            },
        ];

        Ok(Self {
            rules,
            toc_line: Regex::new(r"\.{3,}\s*\d+\s*$")
                .context("failed to compile table-of-contents line regex")?,
            window_chars: config.fallback_window_chars,
            window_overlap: config.fallback_window_overlap,
        })
    }

    /// Classifies a single line against the rule table.
    pub fn match_line(&self, line: &str) -> Option<(HeadingRuleKind, u32, Option<u32>, Option<String>)> {
        if self.toc_line.is_match(line) {
            return None;
        }

        self.rules.iter().find_map(|rule| {
            let captures = rule.pattern.captures(line)?;
            let (major, minor) = parse_section_number(&captures)?;
            let title = captures
                .name("title")
                .map(|value| value.as_str().trim())
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned);
            Some((rule.kind, major, minor, title))
        })
    }

    /// Locates every heading in one pass over the lines.
    ///
    /// A dotted id is only a heading while the most recent top-level heading
    /// shares its integer prefix; otherwise the line stays body text.
    pub fn find_headings(&self, text: &str) -> Vec<HeadingMatch> {
        let mut headings = Vec::<HeadingMatch>::new();
        let mut current_major: Option<u32> = None;
        let mut offset = 0usize;

        for line in text.split('\n') {
            let line_start = offset;
            let line_end = offset + line.len();
            offset = line_end + 1;

            let Some((rule, major, minor, title)) = self.match_line(line) else {
                continue;
            };

            if minor.is_some() {
                if current_major != Some(major) {
                    continue;
                }
            } else {
                current_major = Some(major);
            }

            let heading = HeadingMatch {
                rule,
                line_start,
                line_end,
                heading_text: line.trim().to_string(),
                major,
                minor,
                title,
            };
            debug!(
                rule = heading.rule.as_str(),
                section_id = %heading.section_id(),
                heading = %heading.heading_text,
                "heading found"
            );
            headings.push(heading);
        }

        headings
    }

    pub fn parse(&self, text: &str) -> Vec<SectionRecord> {
        let headings = self.find_headings(text);
        if headings.is_empty() {
            return self.fallback_windows(text);
        }

        let mut records = Vec::<SectionRecord>::new();

        if let Some(preamble) = preamble_record(&text[..headings[0].line_start]) {
            records.push(preamble);
        }

        for (index, heading) in headings.iter().enumerate() {
            if heading.is_subsection() {
                continue;
            }

            let next_top = headings[index + 1..]
                .iter()
                .position(|candidate| !candidate.is_subsection())
                .map(|position| index + 1 + position)
                .unwrap_or(headings.len());
            let span_end = headings
                .get(next_top)
                .map(|next| next.line_start)
                .unwrap_or(text.len());

            let parent_id = heading.section_id();
            records.push(SectionRecord {
                heading_text: heading.heading_text.clone(),
                section_id: Some(parent_id.clone()),
                section_title: heading.title.clone(),
                parent_section_id: None,
                body_text: body_between(text, heading.line_end, span_end),
            });

            for sub_index in index + 1..next_top {
                let subsection = &headings[sub_index];
                let sub_end = headings
                    .get(sub_index + 1)
                    .map(|next| next.line_start)
                    .unwrap_or(span_end)
                    .min(span_end);

                records.push(SectionRecord {
                    heading_text: subsection.heading_text.clone(),
                    section_id: Some(subsection.section_id()),
                    section_title: subsection.title.clone(),
                    parent_section_id: Some(parent_id.clone()),
                    body_text: body_between(text, subsection.line_end, sub_end),
                });
            }
        }

        records
    }

    fn fallback_windows(&self, text: &str) -> Vec<SectionRecord> {
        split_windows(text, self.window_chars, self.window_overlap)
            .into_iter()
            .map(|window| SectionRecord {
                heading_text: FULL_SECTION_HEADING.to_string(),
                section_id: None,
                section_title: None,
                parent_section_id: None,
                body_text: window,
            })
            .collect()
    }
}

fn parse_section_number(captures: &Captures<'_>) -> Option<(u32, Option<u32>)> {
    let major = captures.name("major")?.as_str().parse::<u32>().ok()?;
    let minor = match captures.name("minor") {
        Some(value) => Some(value.as_str().parse::<u32>().ok()?),
        None => None,
    };
    Some((major, minor))
}

fn body_between(text: &str, start: usize, end: usize) -> String {
    if start >= end {
        return String::new();
    }
    text[start..end].trim().to_string()
}

fn preamble_record(preamble: &str) -> Option<SectionRecord> {
    let trimmed = preamble.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (first_line, rest) = trimmed.split_once('\n').unwrap_or((trimmed, ""));
    Some(SectionRecord {
        heading_text: first_line.trim().to_string(),
        section_id: None,
        section_title: None,
        parent_section_id: None,
        body_text: rest.trim().to_string(),
    })
}
