use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::info;

use recom_cli::init_tracing;
use recom_core::catalog::Catalog;
use recom_core::config::Config;
use recom_core::types::BackendKind;
use recom_embed::get_default_embedder;
use recom_ingest::{ingest_local, ingest_remote, IdPolicy, IngestMode, IngestOptions, LocalArtifacts};
use recom_remote::RemoteIndex;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Overwrite points by catalog position
    Replace,
    /// Delete the collection or snapshot first, then replace
    Drop,
    /// Add rows after the current point count (not idempotent)
    Append,
}

impl From<Mode> for IngestMode {
    fn from(m: Mode) -> Self {
        match m {
            Mode::Replace => IngestMode::Replace,
            Mode::Drop => IngestMode::Drop,
            Mode::Append => IngestMode::Append,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Target {
    Local,
    Remote,
}

/// Embed the product catalog and populate the local snapshot or a Qdrant collection
#[derive(Parser, Debug)]
#[command(name = "recom-ingest")]
struct Args {
    #[arg(long, value_enum)]
    mode: Mode,

    /// Backend to populate; defaults to the configured one
    #[arg(long, value_enum)]
    target: Option<Target>,

    /// Catalog CSV; defaults to `data.catalog`
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Derive point ids from product ids so re-runs never duplicate rows
    #[arg(long)]
    stable_ids: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();

    let settings = Config::load()?.settings()?;
    let target = match args.target {
        Some(Target::Local) => BackendKind::Local,
        Some(Target::Remote) => BackendKind::Remote,
        None => settings.backend,
    };
    let catalog_path = args.catalog.unwrap_or_else(|| settings.data.catalog_path());
    let catalog = Catalog::load(&catalog_path)?;
    let embedder = get_default_embedder(&settings.model)?;

    let opts = IngestOptions {
        id_policy: if args.stable_ids { IdPolicy::StableHash } else { IdPolicy::Positional },
        ..IngestOptions::new(args.mode.into())
    };
    info!(mode = %opts.mode, %target, rows = catalog.len(), "starting ingestion");

    let report = match target {
        BackendKind::Local => {
            ingest_local(embedder.as_ref(), &catalog, &LocalArtifacts::from_settings(&settings.data), opts)?
        }
        BackendKind::Remote => {
            let index = RemoteIndex::connect(&settings.qdrant)?;
            ingest_remote(&index, embedder.as_ref(), &catalog, &settings.data.remote_embeddings_path(), opts).await?
        }
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
