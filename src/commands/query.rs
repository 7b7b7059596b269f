use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use tracing::info;

use sdsextract::answer::{
    FixedSectionPicker, ProductFilter, TopCandidatePicker, VerbatimAnswer, answer_question,
};
use sdsextract::store::RecordStore;

use crate::cli::QueryArgs;
use crate::commands::resolve_db_path;

pub fn run(args: QueryArgs) -> Result<()> {
    let db_path = resolve_db_path(&args.cache_root, args.db_path.as_deref());
    if !db_path.exists() {
        bail!(
            "record database not found at {}; run ingest first",
            db_path.display()
        );
    }

    let store = RecordStore::open(&db_path)?;
    let filter = ProductFilter::from_name(args.product.as_deref());
    info!(
        query = %args.query,
        product = %filter.product().unwrap_or("any"),
        limit = args.limit,
        "running query"
    );

    let answer = match args.section.clone() {
        Some(heading) => answer_question(
            &store,
            &FixedSectionPicker { heading },
            &args.query,
            &filter,
            args.limit,
        )?,
        None => answer_question(&store, &TopCandidatePicker, &args.query, &filter, args.limit)?,
    };

    if args.json {
        write_json(&answer)
    } else {
        write_text(&answer)
    }
}

fn write_json(answer: &VerbatimAnswer) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, answer)
        .context("failed to serialize query answer")?;
    writeln!(output)?;
    Ok(())
}

fn write_text(answer: &VerbatimAnswer) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    if let Some(source) = &answer.source {
        writeln!(output, "Source: {}", source.file_name)?;
        writeln!(output, "Product: {}", source.product_name)?;
        writeln!(output, "Section: {}", source.section)?;
        writeln!(output)?;
    }
    writeln!(output, "{}", answer.answer)?;
    Ok(())
}
