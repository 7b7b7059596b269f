use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};

use crate::model::{DocumentContent, DocumentFormat, RawDocument};

/// Lists `.txt` and `.pdf` files directly inside `source_dir`, sorted by
/// file name.
pub fn discover_sources(source_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();

    let entries = fs::read_dir(source_dir)
        .with_context(|| format!("failed to read {}", source_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", source_dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        if DocumentFormat::from_path(&path).is_some() {
            sources.push(path);
        }
    }

    sources.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(sources)
}

pub fn read_document(path: &Path) -> Result<RawDocument> {
    let format = DocumentFormat::from_path(path)
        .with_context(|| format!("unsupported source extension: {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
        .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

    let content = match format {
        DocumentFormat::Text => {
            let raw = fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let text = String::from_utf8(raw)
                .with_context(|| format!("file is not valid UTF-8 text: {}", path.display()))?;
            DocumentContent::Text(text)
        }
        DocumentFormat::Pdf => DocumentContent::Text(extract_text_with_pdftotext(path)?),
    };

    Ok(RawDocument {
        path: path.to_path_buf(),
        file_name,
        format,
        content,
    })
}

/// Raw `pdftotext` output; pages stay separated by form feeds for the
/// page splitter.
fn extract_text_with_pdftotext(pdf_path: &Path) -> Result<String> {
    let output = Command::new("pdftotext")
        .arg("-enc")
        .arg("UTF-8")
        .arg(pdf_path)
        .arg("-")
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
