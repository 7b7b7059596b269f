use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::model::{
    DocumentProduct, PRODUCT_NAME_UNKNOWN, RawDocument, RetrievableRecord, SkippedSource,
};

pub mod assemble;
pub mod boilerplate;
pub mod normalize;
pub mod pages;
pub mod product;
pub mod sections;
pub mod source;
pub mod window;


use assemble::assemble_records;
use boilerplate::BoilerplateDetector;
use normalize::TextNormalizer;
use pages::PageSplitter;
use product::ProductNameExtractor;
use sections::SectionParser;
use source::{discover_sources, read_document};

#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub product: DocumentProduct,
    pub records: Vec<RetrievableRecord>,
    pub page_count: usize,
    pub boilerplate_lines_removed: usize,
    pub used_fallback: bool,
}

#[derive(Debug, Clone)]
pub struct CleanedText {
    pub text: String,
    pub page_count: usize,
    pub lines_removed: usize,
}

#[derive(Debug, Default)]
pub struct CorpusLoad {
    pub source_count: usize,
    pub records: Vec<RetrievableRecord>,
    pub products: Vec<DocumentProduct>,
    pub skipped: Vec<SkippedSource>,
    pub boilerplate_lines_removed: usize,
}

/// Page splitting, boilerplate removal, section parsing and product name
/// extraction for one document at a time. Holds no per-document state, so a
/// single instance is shared across worker threads.
#[derive(Debug)]
pub struct DocumentPipeline {
    splitter: PageSplitter,
    detector: BoilerplateDetector,
    normalizer: TextNormalizer,
    parser: SectionParser,
    extractor: ProductNameExtractor,
}

impl DocumentPipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            splitter: PageSplitter::new()?,
            detector: BoilerplateDetector::new(config)?,
            normalizer: TextNormalizer::new()?,
            parser: SectionParser::new(config)?,
            extractor: ProductNameExtractor::new(config)?,
        })
    }

    /// Cleaned text fed to the section parser and product name extractor.
    pub fn clean_text(&self, document: &RawDocument) -> CleanedText {
        let pages = self.splitter.pages_for(&document.content);
        let boilerplate = self.detector.detect(&pages);
        let stripped = self.normalizer.strip_boilerplate(&pages, &boilerplate);
        let text = self.normalizer.normalize_whitespace(&stripped.text);

        CleanedText {
            text: text.trim().to_string(),
            page_count: pages.len(),
            lines_removed: stripped.lines_removed,
        }
    }

    pub fn process(&self, document: &RawDocument) -> Result<ProcessedDocument> {
        let CleanedText {
            text,
            page_count,
            lines_removed,
        } = self.clean_text(document);
        if text.is_empty() {
            bail!("no text extracted from {}", document.path.display());
        }

        let product_name = self.extractor.extract(&text, &document.file_name);
        let sections = self.parser.parse(&text);
        let used_fallback = sections.iter().all(|section| section.is_full_window());
        if used_fallback {
            warn!(
                file = %document.file_name,
                windows = sections.len(),
                "no section headings found; using windowed chunks"
            );
        }

        let records = assemble_records(document, &product_name, &sections);
        info!(
            file = %document.file_name,
            pages = page_count,
            boilerplate_removed = lines_removed,
            records = records.len(),
            product_name = %product_name,
            "processed document"
        );

        Ok(ProcessedDocument {
            product: DocumentProduct {
                source: document.path.display().to_string(),
                file_name: document.file_name.clone(),
                product_name,
            },
            records,
            page_count,
            boilerplate_lines_removed: lines_removed,
            used_fallback,
        })
    }

    pub fn process_path(&self, path: &Path) -> Result<ProcessedDocument> {
        let document = read_document(path)?;
        self.process(&document)
    }

    /// Processes every source file in `source_dir` in parallel. Output keeps
    /// sorted file-name order; files that fail are logged and skipped.
    pub fn load_corpus(&self, source_dir: &Path) -> Result<CorpusLoad> {
        let sources = discover_sources(source_dir)?;
        info!(
            source_dir = %source_dir.display(),
            sources = sources.len(),
            "loading corpus"
        );

        let outcomes = sources
            .par_iter()
            .map(|path| (path.clone(), self.process_path(path)))
            .collect::<Vec<(PathBuf, Result<ProcessedDocument>)>>();

        let mut load = CorpusLoad {
            source_count: sources.len(),
            ..CorpusLoad::default()
        };

        for (path, outcome) in outcomes {
            match outcome {
                Ok(processed) => {
                    load.boilerplate_lines_removed += processed.boilerplate_lines_removed;
                    load.products.push(processed.product);
                    load.records.extend(processed.records);
                }
                Err(error) => {
                    warn!(file = %path.display(), error = %format!("{error:#}"), "skipping source");
                    load.skipped.push(SkippedSource {
                        source: path.display().to_string(),
                        reason: format!("{error:#}"),
                    });
                }
            }
        }

        let unknown = load
            .products
            .iter()
            .filter(|product| product.product_name == PRODUCT_NAME_UNKNOWN)
            .count();
        info!(
            processed = load.products.len(),
            skipped = load.skipped.len(),
            records = load.records.len(),
            unknown_products = unknown,
            "corpus loaded"
        );

        Ok(load)
    }
}
