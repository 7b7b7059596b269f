use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use sdsextract::config::PipelineConfig;
use sdsextract::model::{
    DocumentProduct, FULL_SECTION_HEADING, IngestCounts, IngestPaths, IngestRunManifest,
    PRODUCT_NAME_UNKNOWN, RetrievableRecord, SkippedSource,
};
use sdsextract::pipeline::DocumentPipeline;
use sdsextract::pipeline::source::discover_sources;
use sdsextract::signature::corpus_signature;
use sdsextract::store::{DB_SCHEMA_VERSION, RecordStore};
use sdsextract::util::{ensure_directory, now_utc_string, utc_compact_string, write_json_pretty};

use crate::cli::IngestArgs;
use crate::commands::resolve_db_path;

pub fn run(args: IngestArgs) -> Result<()> {
    let manifest = ingest(&args)?;
    info!(
        run_id = %manifest.run_id,
        rebuilt = manifest.rebuilt,
        records = manifest.counts.records_total,
        skipped = manifest.counts.skipped_count,
        "ingest completed"
    );
    Ok(())
}

pub fn ingest(args: &IngestArgs) -> Result<IngestRunManifest> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let manifest_dir = args.cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;

    let ingest_manifest_path = args.ingest_manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!(
            "ingest_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });
    let db_path = resolve_db_path(&args.cache_root, args.db_path.as_deref());

    info!(
        cache_root = %args.cache_root.display(),
        source_dir = %args.source_dir.display(),
        run_id = %run_id,
        "starting ingest"
    );

    let config =
        PipelineConfig::load(args.config.as_deref())?.with_repeat_ratio(args.repeat_ratio)?;
    let config_fingerprint = config.fingerprint()?;
    let signature = corpus_signature(&args.source_dir)?;

    let mut store = RecordStore::open(&db_path)?;
    let previous_signature = store.corpus_signature()?;
    let previous_config_fingerprint = store.config_fingerprint()?;
    let rebuilt = args.force
        || previous_signature.as_deref() != Some(signature.as_str())
        || previous_config_fingerprint.as_deref() != Some(config_fingerprint.as_str());

    let mut warnings = Vec::new();
    let (records, products, skipped, source_count, boilerplate_lines_removed) = if rebuilt {
        info!(
            previous = %previous_signature.as_deref().unwrap_or("none"),
            current = %signature,
            previous_config = %previous_config_fingerprint.as_deref().unwrap_or("none"),
            config = %config_fingerprint,
            force = args.force,
            "rebuilding records"
        );
        let pipeline = DocumentPipeline::new(&config)?;
        let load = pipeline.load_corpus(&args.source_dir)?;
        store.replace_all(&load.records, &load.products, &signature, &config_fingerprint)?;
        (
            load.records,
            load.products,
            load.skipped,
            load.source_count,
            load.boilerplate_lines_removed,
        )
    } else {
        info!(
            signature = %signature,
            config = %config_fingerprint,
            "corpus and config unchanged; reusing stored records"
        );
        (
            store.all_records()?,
            store.products()?,
            Vec::new(),
            discover_sources(&args.source_dir)?.len(),
            0,
        )
    };

    if records.is_empty() {
        let message = format!("no records produced from {}", args.source_dir.display());
        warn!("{message}");
        warnings.push(message);
    }
    for skip in &skipped {
        warnings.push(format!("skipped {}: {}", skip.source, skip.reason));
    }

    if let Some(records_out) = &args.records_out {
        write_json_pretty(records_out, &records)?;
        info!(path = %records_out.display(), records = records.len(), "wrote records");
    }

    let counts = summarize(
        &records,
        &products,
        &skipped,
        source_count,
        boilerplate_lines_removed,
    );

    let manifest = IngestRunManifest {
        manifest_version: 1,
        run_id,
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        corpus_signature: signature,
        previous_signature,
        config_fingerprint,
        previous_config_fingerprint,
        rebuilt,
        command: "ingest".to_string(),
        paths: IngestPaths {
            cache_root: args.cache_root.display().to_string(),
            source_directory: args.source_dir.display().to_string(),
            manifest_dir: manifest_dir.display().to_string(),
            db_path: db_path.display().to_string(),
            records_path: args
                .records_out
                .as_ref()
                .map(|path| path.display().to_string()),
        },
        counts,
        products,
        skipped,
        warnings,
    };

    write_json_pretty(&ingest_manifest_path, &manifest)?;
    info!(path = %ingest_manifest_path.display(), "wrote ingest run manifest");

    Ok(manifest)
}

fn summarize(
    records: &[RetrievableRecord],
    products: &[DocumentProduct],
    skipped: &[SkippedSource],
    source_count: usize,
    boilerplate_lines_removed: usize,
) -> IngestCounts {
    let mut counts = IngestCounts {
        source_count,
        processed_count: products.len(),
        skipped_count: skipped.len(),
        records_total: records.len(),
        unknown_products: products
            .iter()
            .filter(|product| product.product_name == PRODUCT_NAME_UNKNOWN)
            .count(),
        boilerplate_lines_removed,
        ..IngestCounts::default()
    };

    for record in records {
        let metadata = &record.metadata;
        if metadata.parent_section_id.is_some() {
            counts.subsections += 1;
        } else if metadata.section_id.is_none() && metadata.section == FULL_SECTION_HEADING {
            counts.full_windows += 1;
        } else {
            counts.top_level_sections += 1;
        }
    }

    counts
}
