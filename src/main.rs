use anyhow::{Context, Result};
use clap::Parser;
use rel2graph::{Config, MemoryGraph, MigrationDriver, MigrationReport, Neo4jStore, SourceDb};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rel2graph")]
#[command(version)]
#[command(about = "Migrate relational join tables into a Neo4j graph (wipes the target graph first)")]
struct Args {
    /// Config file (.toml, .yml or .yaml); defaults to $REL2GRAPH_CONFIG, ./config.toml or ./config.yml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Migrate into an in-memory graph instead of Neo4j
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();

    log::info!("Starting rel2graph v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => Config::from_path(path)?,
        None => Config::load()?,
    };
    log::info!("Configuration loaded: {} mapping(s)", config.mappings.len());
    log::info!("Source database: {}", config.db_path().display());
    log::info!(
        "Intermediate tables: {}",
        config.intermediate_tables().into_iter().collect::<Vec<_>>().join(", ")
    );

    let source = SourceDb::connect(config.db_path())
        .await
        .context("Source database unavailable")?;

    let report = if args.dry_run {
        log::info!("Dry run: writing to an in-memory graph");
        let mut graph = MemoryGraph::new();
        MigrationDriver::new(&source, &mut graph)
            .run(&config.mappings)
            .await?
    } else {
        log::info!("Target graph: {} (database {})", config.target.url, config.target.database);
        let mut graph = Neo4jStore::connect(&config.target)
            .await
            .context("Graph database unavailable")?;
        MigrationDriver::new(&source, &mut graph)
            .run(&config.mappings)
            .await?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &MigrationReport) {
    println!("\n=== rel2graph migration ===\n");
    println!("{:-<72}", "");
    println!(
        "{:<32} {:<14} {:>8} {:>8} {:>8}",
        "Table", "Relation", "Rows", "Rels", "Nodes+"
    );
    println!("{:-<72}", "");
    for m in &report.mappings {
        println!(
            "{:<32} {:<14} {:>8} {:>8} {:>8}",
            m.table, m.relation, m.rows_read, m.relationships_created, m.nodes_created
        );
    }
    println!("{:-<72}", "");
    println!("Labels:        {}", report.labels.join(", "));
    println!("Nodes:         {}", report.nodes);
    println!("Relationships: {}", report.relationships);
    println!("Time:          {}ms", report.elapsed_ms);
    println!();
}
