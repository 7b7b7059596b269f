use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use sdsextract::model::{DocumentFormat, SourceEntry, SourceInventoryManifest};
use sdsextract::pipeline::source::discover_sources;
use sdsextract::signature::corpus_signature;
use sdsextract::util::{mtime_secs, now_utc_string, sha256_file, write_json_pretty};

use crate::cli::InventoryArgs;

pub fn run(args: InventoryArgs) -> Result<()> {
    let manifest = build_manifest(&args.source_dir)?;

    if args.dry_run {
        info!(
            source_count = manifest.source_count,
            source = %manifest.source_directory,
            corpus_signature = %manifest.corpus_signature,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| args.cache_root.join("manifests").join("source_inventory.json"));

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(source_count = manifest.source_count, "inventory completed");

    Ok(())
}

pub fn build_manifest(source_dir: &Path) -> Result<SourceInventoryManifest> {
    let source_paths = discover_sources(source_dir)?;

    if source_paths.is_empty() {
        bail!("no .txt or .pdf sources found in {}", source_dir.display());
    }

    let mut sources = Vec::with_capacity(source_paths.len());
    for path in source_paths {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;
        let format = DocumentFormat::from_path(&path)
            .with_context(|| format!("unsupported source extension: {}", path.display()))?;
        let metadata = fs::metadata(&path)
            .with_context(|| format!("failed to stat {}", path.display()))?;

        sources.push(SourceEntry {
            filename,
            format,
            size_bytes: metadata.len(),
            modified_secs: mtime_secs(&metadata),
            sha256: sha256_file(&path)?,
        });
    }

    Ok(SourceInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: source_dir.display().to_string(),
        corpus_signature: corpus_signature(source_dir)?,
        source_count: sources.len(),
        sources,
    })
}
