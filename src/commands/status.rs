use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use sdsextract::model::{IngestRunManifest, SourceInventoryManifest};
use sdsextract::signature::corpus_signature;
use sdsextract::store::RecordStore;

use crate::cli::StatusArgs;
use crate::commands::resolve_db_path;

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.cache_root.join("manifests");
    let inventory_path = manifest_dir.join("source_inventory.json");
    let db_path = resolve_db_path(&args.cache_root, args.db_path.as_deref());

    info!(cache_root = %args.cache_root.display(), "status requested");

    if inventory_path.exists() {
        let raw = fs::read(&inventory_path)
            .with_context(|| format!("failed to read {}", inventory_path.display()))?;
        let inventory: SourceInventoryManifest = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", inventory_path.display()))?;

        info!(
            generated_at = %inventory.generated_at,
            source_count = inventory.source_count,
            corpus_signature = %inventory.corpus_signature,
            "loaded inventory manifest"
        );
    } else {
        warn!(path = %inventory_path.display(), "inventory manifest missing");
    }

    match latest_ingest_manifest(&manifest_dir)? {
        Some(path) => {
            let raw =
                fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            let run: IngestRunManifest = serde_json::from_slice(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?;

            info!(
                run_id = %run.run_id,
                status = %run.status,
                updated_at = %run.updated_at,
                rebuilt = run.rebuilt,
                records = run.counts.records_total,
                skipped = run.counts.skipped_count,
                unknown_products = run.counts.unknown_products,
                "loaded latest ingest manifest"
            );
        }
        None => warn!(path = %manifest_dir.display(), "no ingest run manifest found"),
    }

    if db_path.exists() {
        let store = RecordStore::open(&db_path)?;
        let counts = store.counts()?;
        let stored_signature = store.corpus_signature()?;

        info!(
            path = %db_path.display(),
            documents = counts.documents,
            records = counts.records,
            unknown_products = counts.unknown_products,
            "database status"
        );

        if args.source_dir.is_dir() {
            let current = corpus_signature(&args.source_dir)?;
            if stored_signature.as_deref() == Some(current.as_str()) {
                info!(signature = %current, "stored records match the source directory");
            } else {
                warn!(
                    stored = %stored_signature.as_deref().unwrap_or("none"),
                    current = %current,
                    "source directory changed since last ingest"
                );
            }
        } else {
            warn!(path = %args.source_dir.display(), "source directory missing");
        }
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    Ok(())
}

fn latest_ingest_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.is_dir() {
        return Ok(None);
    }

    let mut latest: Option<PathBuf> = None;
    let entries = fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to read {}", manifest_dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to read entry in {}", manifest_dir.display()))?
            .path();
        let is_run_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with("ingest_run_") && name.ends_with(".json"))
            .unwrap_or(false);

        if is_run_manifest && latest.as_ref().is_none_or(|current| path > *current) {
            latest = Some(path);
        }
    }

    Ok(latest)
}
