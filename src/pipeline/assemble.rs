use crate::model::{RawDocument, RecordMetadata, RetrievableRecord, SectionRecord};

/// Attaches document metadata to parsed sections.
///
/// `page_content` is the heading line, a newline, then the body, so the
/// `section` key can later recover the exact text. Fallback windows carry
/// only their text.
pub fn assemble_records(
    document: &RawDocument,
    product_name: &str,
    sections: &[SectionRecord],
) -> Vec<RetrievableRecord> {
    let mut current_parent: Option<&SectionRecord> = None;

    sections
        .iter()
        .map(|section| {
            let page_content = if section.is_full_window() {
                section.body_text.clone()
            } else {
                format!("{}\n{}", section.heading_text, section.body_text)
            };

            // Subsections follow the top-level record they belong to.
            let parent_section = match section.parent_section_id.as_deref() {
                Some(parent_id) => current_parent
                    .filter(|parent| parent.section_id.as_deref() == Some(parent_id))
                    .map(|parent| parent.heading_text.clone()),
                None => {
                    current_parent = Some(section);
                    None
                }
            };

            RetrievableRecord {
                page_content,
                metadata: RecordMetadata {
                    source: document.path.display().to_string(),
                    file_name: document.file_name.clone(),
                    product_name: product_name.to_string(),
                    section: section.heading_text.clone(),
                    section_id: section.section_id.clone(),
                    section_title: section.section_title.clone(),
                    parent_section,
                    parent_section_id: section.parent_section_id.clone(),
                    format: document.format,
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::model::{DocumentContent, DocumentFormat, FULL_SECTION_HEADING};

    fn document() -> RawDocument {
        RawDocument {
            path: PathBuf::from("data/sds/acme.pdf"),
            file_name: "acme.pdf".to_string(),
            format: DocumentFormat::Pdf,
            content: DocumentContent::Text(String::new()),
        }
    }

    #[test]
    fn records_prepend_heading_and_link_parent_heading() {
        let sections = vec![
            SectionRecord {
                heading_text: "Section 7: Handling".to_string(),
                section_id: Some("7".to_string()),
                section_title: Some("Handling".to_string()),
                parent_section_id: None,
                body_text: "7.1 Precautions\nAvoid contact.".to_string(),
            },
            SectionRecord {
                heading_text: "7.1 Precautions".to_string(),
                section_id: Some("7.1".to_string()),
                section_title: Some("Precautions".to_string()),
                parent_section_id: Some("7".to_string()),
                body_text: "Avoid contact.".to_string(),
            },
        ];

        let records = assemble_records(&document(), "Acme Degreaser", &sections);

        assert_eq!(records[0].page_content, "Section 7: Handling\n7.1 Precautions\nAvoid contact.");
        assert_eq!(records[0].metadata.section, "Section 7: Handling");
        assert_eq!(records[0].metadata.parent_section, None);
        assert_eq!(records[1].metadata.parent_section.as_deref(), Some("Section 7: Handling"));
        assert_eq!(records[1].metadata.parent_section_id.as_deref(), Some("7"));
        assert_eq!(records[1].metadata.product_name, "Acme Degreaser");
        assert_eq!(records[1].metadata.format, DocumentFormat::Pdf);
        assert_eq!(records[1].metadata.source, "data/sds/acme.pdf");
    }

    #[test]
    fn repeated_top_level_ids_link_to_the_nearest_preceding_heading() {
        let top = |heading: &str| SectionRecord {
            heading_text: heading.to_string(),
            section_id: Some("7".to_string()),
            section_title: None,
            parent_section_id: None,
            body_text: String::new(),
        };
        let sections = vec![
            top("7. Handling and storage"),
            SectionRecord {
                heading_text: "7.1 Precautions".to_string(),
                section_id: Some("7.1".to_string()),
                section_title: Some("Precautions".to_string()),
                parent_section_id: Some("7".to_string()),
                body_text: "Avoid contact.".to_string(),
            },
            top("7 HANDLING AND STORAGE (continued)"),
        ];

        let records = assemble_records(&document(), "Acme Degreaser", &sections);

        assert_eq!(
            records[1].metadata.parent_section.as_deref(),
            Some("7. Handling and storage")
        );
    }

    #[test]
    fn full_windows_keep_only_their_text() {
        let sections = vec![SectionRecord {
            heading_text: FULL_SECTION_HEADING.to_string(),
            section_id: None,
            section_title: None,
            parent_section_id: None,
            body_text: "Keep away from heat.".to_string(),
        }];

        let records = assemble_records(&document(), "UNKNOWN", &sections);

        assert_eq!(records[0].page_content, "Keep away from heat.");
        assert_eq!(records[0].metadata.section, FULL_SECTION_HEADING);
    }
}
