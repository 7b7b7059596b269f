//! Verbatim answers: the retriever proposes candidate sections, a picker
//! names one heading, and the matching candidate's text is returned
//! unmodified.

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::model::{PRODUCT_NAME_UNKNOWN, RecordMetadata, RetrievableRecord};

pub const ANSWER_NOT_FOUND: &str = "ANSWER NOT FOUND IN SDS";

/// Picker reply meaning no candidate is relevant.
pub const NO_SECTION: &str = "NONE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductFilter {
    Any,
    Product(String),
}

impl ProductFilter {
    /// `UNKNOWN` (or no name at all) never narrows retrieval.
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some(name) if !name.is_empty() && !name.eq_ignore_ascii_case(PRODUCT_NAME_UNKNOWN) => {
                Self::Product(name.to_string())
            }
            _ => Self::Any,
        }
    }

    pub fn product(&self) -> Option<&str> {
        match self {
            Self::Any => None,
            Self::Product(name) => Some(name.as_str()),
        }
    }

    pub fn accepts(&self, record: &RetrievableRecord) -> bool {
        match self {
            Self::Any => true,
            Self::Product(name) => record.metadata.product_name.eq_ignore_ascii_case(name),
        }
    }
}

/// Similarity search over stored records.
pub trait SectionRetriever {
    fn retrieve(
        &self,
        query: &str,
        filter: &ProductFilter,
        limit: usize,
    ) -> Result<Vec<RetrievableRecord>>;
}

/// Chooses the candidate heading that answers a question, replying with the
/// heading exactly as given or [`NO_SECTION`].
pub trait SectionPicker {
    fn pick_section(&self, query: &str, candidates: &[RetrievableRecord]) -> Result<String>;
}

/// Always answers with one operator-supplied heading.
#[derive(Debug, Clone)]
pub struct FixedSectionPicker {
    pub heading: String,
}

impl SectionPicker for FixedSectionPicker {
    fn pick_section(&self, _query: &str, _candidates: &[RetrievableRecord]) -> Result<String> {
        Ok(self.heading.clone())
    }
}

/// Defers to retrieval order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopCandidatePicker;

impl SectionPicker for TopCandidatePicker {
    fn pick_section(&self, _query: &str, _candidates: &[RetrievableRecord]) -> Result<String> {
        Ok(NO_SECTION.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStrategy {
    PickedSection,
    TopCandidate,
    NotFound,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerbatimAnswer {
    pub answer: String,
    pub source: Option<RecordMetadata>,
    pub strategy: AnswerStrategy,
    pub candidate_count: usize,
}

/// First candidate whose `section` key equals `heading` exactly.
pub fn extract_section_verbatim<'a>(
    candidates: &'a [RetrievableRecord],
    heading: &str,
) -> Option<&'a RetrievableRecord> {
    candidates
        .iter()
        .find(|candidate| candidate.metadata.section == heading)
}

pub fn answer_question<R, P>(
    retriever: &R,
    picker: &P,
    query: &str,
    filter: &ProductFilter,
    limit: usize,
) -> Result<VerbatimAnswer>
where
    R: SectionRetriever + ?Sized,
    P: SectionPicker + ?Sized,
{
    let candidates = retriever.retrieve(query, filter, limit)?;
    info!(query = %query, candidates = candidates.len(), "retrieved candidates");

    for (rank, candidate) in candidates.iter().enumerate() {
        info!(
            rank = rank + 1,
            section = %candidate.metadata.section,
            source = %candidate.metadata.source,
            "candidate"
        );
    }

    let Some(top) = candidates.first() else {
        return Ok(VerbatimAnswer {
            answer: ANSWER_NOT_FOUND.to_string(),
            source: None,
            strategy: AnswerStrategy::NotFound,
            candidate_count: 0,
        });
    };

    let picked = match picker.pick_section(query, &candidates) {
        Ok(reply) => reply.trim().to_string(),
        Err(error) => {
            warn!(error = %format!("{error:#}"), "section picker failed; using top candidate");
            NO_SECTION.to_string()
        }
    };
    info!(section = %picked, "picked section");

    if picked != NO_SECTION {
        if let Some(record) = extract_section_verbatim(&candidates, &picked) {
            return Ok(VerbatimAnswer {
                answer: record.page_content.clone(),
                source: Some(record.metadata.clone()),
                strategy: AnswerStrategy::PickedSection,
                candidate_count: candidates.len(),
            });
        }
    }

    warn!(source = %top.metadata.source, "no section match found; returning top candidate verbatim");
    Ok(VerbatimAnswer {
        answer: top.page_content.clone(),
        source: Some(top.metadata.clone()),
        strategy: AnswerStrategy::TopCandidate,
        candidate_count: candidates.len(),
    })
}

#[cfg(test)]
mod tests {
    use anyhow::bail;

    use super::*;
    use crate::model::DocumentFormat;

    struct FixedRetriever(Vec<RetrievableRecord>);

    impl SectionRetriever for FixedRetriever {
        fn retrieve(
            &self,
            _query: &str,
            filter: &ProductFilter,
            limit: usize,
        ) -> Result<Vec<RetrievableRecord>> {
            Ok(self
                .0
                .iter()
                .filter(|record| filter.accepts(record))
                .take(limit)
                .cloned()
                .collect())
        }
    }

    struct FailingPicker;

    impl SectionPicker for FailingPicker {
        fn pick_section(&self, _query: &str, _candidates: &[RetrievableRecord]) -> Result<String> {
            bail!("model unavailable")
        }
    }

    fn record(section: &str, body: &str, product: &str) -> RetrievableRecord {
        RetrievableRecord {
            page_content: format!("{section}\n{body}"),
            metadata: RecordMetadata {
                source: format!("{product}.txt"),
                file_name: format!("{product}.txt"),
                product_name: product.to_string(),
                section: section.to_string(),
                section_id: None,
                section_title: None,
                parent_section: None,
                parent_section_id: None,
                format: DocumentFormat::Text,
            },
        }
    }

    fn retriever() -> FixedRetriever {
        FixedRetriever(vec![
            record("Section 2: Hazards", "Flammable.", "Acme"),
            record("Section 7: Handling and storage", "Store cool.", "Acme"),
            record("Section 7: Handling and storage", "Keep dry.", "Other"),
        ])
    }

    #[test]
    fn picked_heading_returns_that_section_verbatim() {
        let picker = FixedSectionPicker {
            heading: " Section 7: Handling and storage \n".to_string(),
        };
        let answer = answer_question(&retriever(), &picker, "how to store?", &ProductFilter::Any, 5)
            .expect("answer");

        assert_eq!(answer.strategy, AnswerStrategy::PickedSection);
        assert_eq!(answer.answer, "Section 7: Handling and storage\nStore cool.");
        assert_eq!(answer.candidate_count, 3);
    }

    #[test]
    fn none_unknown_heading_and_picker_errors_fall_back_to_top() {
        let retriever = retriever();
        for answer in [
            answer_question(&retriever, &TopCandidatePicker, "q", &ProductFilter::Any, 5),
            answer_question(
                &retriever,
                &FixedSectionPicker {
                    heading: "Section 99: Missing".to_string(),
                },
                "q",
                &ProductFilter::Any,
                5,
            ),
            answer_question(&retriever, &FailingPicker, "q", &ProductFilter::Any, 5),
        ] {
            let answer = answer.expect("answer");
            assert_eq!(answer.strategy, AnswerStrategy::TopCandidate);
            assert_eq!(answer.answer, "Section 2: Hazards\nFlammable.");
        }
    }

    #[test]
    fn no_candidates_is_not_found() {
        let answer = answer_question(
            &FixedRetriever(Vec::new()),
            &TopCandidatePicker,
            "q",
            &ProductFilter::Any,
            5,
        )
        .expect("answer");

        assert_eq!(answer.strategy, AnswerStrategy::NotFound);
        assert_eq!(answer.answer, ANSWER_NOT_FOUND);
        assert!(answer.source.is_none());
    }

    #[test]
    fn product_filter_narrows_and_unknown_means_any() {
        assert_eq!(ProductFilter::from_name(Some("UNKNOWN")), ProductFilter::Any);
        assert_eq!(ProductFilter::from_name(Some("  ")), ProductFilter::Any);
        assert_eq!(ProductFilter::from_name(None), ProductFilter::Any);

        let filter = ProductFilter::from_name(Some("other"));
        let picker = FixedSectionPicker {
            heading: "Section 7: Handling and storage".to_string(),
        };
        let answer = answer_question(&retriever(), &picker, "q", &filter, 5).expect("answer");

        assert_eq!(answer.answer, "Section 7: Handling and storage\nKeep dry.");
        assert_eq!(answer.candidate_count, 1);
    }
}
