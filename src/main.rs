//! Retail dataset generator.
//!
//! Synthesizes stores, customers, products, inventory, orders, and line
//! items with seasonal/growth-weighted demand, then bulk-loads the
//! documents into a target document store in dependency order.
//!
//! # Usage
//!
//! ```bash
//! # Default run against a local store:
//! cargo run --release -- run
//!
//! # Small reproducible dataset, nothing written:
//! cargo run --release -- run --customers 100 --orders 500 --seed 7 --dry-run
//!
//! # Inspect the demand plan without generating:
//! cargo run --release -- plan --start-date 2023-01-01 --end-date 2025-12-31
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use rand::SeedableRng;

use retail_datagen::config::RunConfig;
use retail_datagen::demand::DemandModel;
use retail_datagen::error::{GenError, Result};
use retail_datagen::store::{DocumentStore, HttpStore, MemoryStore};
use retail_datagen::writer::WriteReport;
use retail_datagen::{catalog, pipeline, setup};

/// Retail dataset generator: seasonal demand synthesis and bulk load.
#[derive(Parser)]
#[command(name = "retail-datagen")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the dataset and load it into the target store.
    Run(RunArgs),

    /// Print expected order volume per month without generating anything.
    Plan(PlanArgs),
}

#[derive(Parser)]
struct RunArgs {
    #[command(flatten)]
    config: RunConfig,

    /// Base URL of the target store's write API.
    #[arg(long, env = "STORE_URL", default_value = "http://localhost:8800")]
    store_url: String,

    /// Target database name.
    #[arg(long, env = "STORE_DATABASE", default_value = "retail-demo")]
    database: String,

    /// Generate and report, but write nothing to the target store.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Parser)]
struct PlanArgs {
    #[command(flatten)]
    config: RunConfig,
}

#[tokio::main]
async fn main() {
    setup::init_tracing();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Plan(args) => plan(args),
    };

    if let Err(err) = outcome {
        tracing::error!(%err, "run aborted");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(args: RunArgs) -> Result<()> {
    args.config.validate()?;
    let started = Instant::now();

    let dataset = pipeline::generate(&args.config)?;

    let store: Arc<dyn DocumentStore> = if args.dry_run {
        tracing::info!("Dry run: documents will not leave this process");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(
            HttpStore::new(&args.store_url, &args.database)
                .map_err(|e| GenError::config(format!("cannot build store client: {e}")))?,
        )
    };

    let reports = pipeline::persist(&dataset, &store, &args.config).await?;
    print_summary(&args, &reports, dataset.total_documents(), started);
    Ok(())
}

fn print_summary(args: &RunArgs, reports: &[WriteReport], total: usize, started: Instant) {
    eprintln!();
    eprintln!("=== Retail Datagen: Run ===");
    eprintln!();
    eprintln!("Config:");
    eprintln!("  Customers:        {}", args.config.customers);
    eprintln!("  Orders:           {}", args.config.orders);
    eprintln!(
        "  Date range:       {} .. {}",
        args.config.start_date, args.config.end_date
    );
    eprintln!("  Batch size:       {}", args.config.batch_size);
    eprintln!("  Concurrency:      {} in-flight", args.config.concurrency);
    eprintln!("  Seed:             {}", args.config.seed);
    eprintln!(
        "  Target:           {}",
        if args.dry_run {
            "dry run (nothing written)".to_string()
        } else {
            format!("{}/{}", args.store_url, args.database)
        }
    );
    eprintln!();
    eprintln!("Collections:");
    for r in reports {
        eprintln!(
            "  {:<20} {:>9} documents in {:>5} batches",
            r.collection, r.documents, r.batches
        );
    }
    eprintln!();
    eprintln!("  Total:            {} documents", total);
    eprintln!("  Elapsed:          {:.2}s", started.elapsed().as_secs_f64());
    eprintln!();
}

fn plan(args: PlanArgs) -> Result<()> {
    args.config.validate()?;

    let mut rng = rand::rngs::StdRng::seed_from_u64(args.config.seed);
    let catalog = catalog::Catalog::load(&args.config, &mut rng)?;
    let demand = DemandModel::build(&catalog, &args.config)?;

    // Collapse the (store, category) dimensions to per-month mass.
    let mut monthly: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for (cell, p) in demand.cells().iter().zip(demand.pmf()) {
        *monthly.entry((cell.year, cell.month)).or_insert(0.0) += p;
    }

    eprintln!();
    eprintln!("=== Retail Datagen: Demand Plan ===");
    eprintln!();
    eprintln!(
        "  {} orders over {} .. {}",
        args.config.orders, args.config.start_date, args.config.end_date
    );
    eprintln!();
    for ((year, month), p) in &monthly {
        let expected = p * args.config.orders as f64;
        eprintln!(
            "  {year}-{month:02}  {:>8.0} orders  ({:>5.2}%)",
            expected,
            p * 100.0
        );
    }
    eprintln!();
    Ok(())
}
