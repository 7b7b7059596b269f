use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "sdsextract",
    version,
    about = "Safety data sheet ingestion and verbatim section lookup"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Ingest(IngestArgs),
    Query(QueryArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = ".cache/sds")]
    pub cache_root: PathBuf,

    #[arg(long, default_value = "data/sds")]
    pub source_dir: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[arg(long, default_value = ".cache/sds")]
    pub cache_root: PathBuf,

    #[arg(long, default_value = "data/sds")]
    pub source_dir: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub ingest_manifest_path: Option<PathBuf>,

    /// JSON file overriding pipeline heuristics.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub repeat_ratio: Option<f64>,

    /// Rebuild even when the corpus signature is unchanged.
    #[arg(long, default_value_t = false)]
    pub force: bool,

    /// Also write every assembled record to this JSON file.
    #[arg(long)]
    pub records_out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[arg(long, default_value = ".cache/sds")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub query: String,

    /// Restrict candidates to one product; `UNKNOWN` means no restriction.
    #[arg(long)]
    pub product: Option<String>,

    /// Heading to return verbatim; without it the top candidate is used.
    #[arg(long)]
    pub section: Option<String>,

    #[arg(long, default_value_t = 5)]
    pub limit: usize,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/sds")]
    pub cache_root: PathBuf,

    #[arg(long, default_value = "data/sds")]
    pub source_dir: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}
