//! Reads one OpenLineage run event and runs it through the ingestion
//! pipeline against in-memory reference collaborators, printing the
//! resulting asset/edge/run-history state. A debugging aid, not the
//! product's API surface (out-of-process services own the real
//! `AssetService`/`LineageStore`).

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use catalog_core::ingest::{Ingestor, RunEvent};
use catalog_core::lineage::{Direction, InMemoryLineageStore, LineageService};
use catalog_core::testsupport::InMemoryAssetService;
use clap::Parser;

#[derive(Parser)]
#[command(name = "catalog-core-ingest-cli", version, about = "Run one OpenLineage event through the catalog-core ingestor")]
struct Cli {
    /// Path to a JSON file containing a single OpenLineage RunEvent. Reads
    /// from stdin when omitted.
    #[arg(long)]
    event: Option<PathBuf>,

    /// Value recorded as the job asset's `created_by`.
    #[arg(long)]
    created_by: Option<String>,
}

fn read_event_json(path: Option<&PathBuf>) -> String {
    match path {
        Some(path) => std::fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("failed to read {}: {e}", path.display());
            std::process::exit(1);
        }),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).unwrap_or_else(|e| {
                eprintln!("failed to read stdin: {e}");
                std::process::exit(1);
            });
            buf
        }
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let raw = read_event_json(cli.event.as_ref());
    let event: RunEvent = serde_json::from_str(&raw).unwrap_or_else(|e| {
        eprintln!("malformed run event: {e}");
        std::process::exit(1);
    });

    let assets = Arc::new(InMemoryAssetService::new());
    let lineage = Arc::new(LineageService::with_noop_observer(Arc::new(InMemoryLineageStore::new())));
    let ingestor = Ingestor::new(assets.clone(), lineage.clone());

    match ingestor.process_event(&event, cli.created_by.as_deref()) {
        Ok(outcome) => {
            let joined = |mrns: &[catalog_core::Mrn]| {
                mrns.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
            };
            println!("job asset: {} ({})", outcome.job_mrn, outcome.job_asset.id);
            println!("inputs:  {}", joined(&outcome.input_mrns));
            println!("outputs: {}", joined(&outcome.output_mrns));

            let traversal = lineage
                .traverse(&outcome.job_mrn, 500, Direction::Both)
                .expect("traversal over a just-populated in-memory store does not fail");
            println!("\nlineage graph around job asset ({} nodes, {} edges):", traversal.nodes.len(), traversal.edges.len());
            for node in &traversal.nodes {
                println!("  [{:>3}] {}", node.depth, node.mrn);
            }
        }
        Err(e) => {
            eprintln!("ingestion failed: {e}");
            std::process::exit(1);
        }
    }
}
