// Copyright 2026 Regcheck Contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use regcheck::config::Config;
use regcheck::fetch::HttpFetcher;
use regcheck::lookup::{LookupOutcome, LookupService};
use regcheck::record::{normalize_identifier, VehicleRecord};
use regcheck::store::VehicleStore;

#[derive(Parser)]
#[command(
    name = "regcheck",
    about = "Vehicle registration lookup with a local report cache",
    version
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress routine log output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a registration, served from the local store when fresh
    Lookup {
        /// Registration identifier (e.g. "AB12 CDE")
        registration: String,
        /// Fetch again even if a fresh record is stored
        #[arg(long)]
        force: bool,
    },
    /// Import a saved report page instead of fetching one
    Import {
        /// Registration the saved page belongs to
        registration: String,
        /// Path to the saved HTML file
        file: PathBuf,
    },
    /// Print the stored record for a registration, if any
    Show {
        /// Registration identifier
        registration: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = Config::from_env();
    let result = run(&cli, &config).await;

    if let Err(e) = &result {
        if cli.json {
            println!(
                "{}",
                serde_json::json!({ "error": true, "message": format!("{e:#}") })
            );
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }
    result
}

async fn run(cli: &Cli, config: &Config) -> Result<()> {
    let store = Arc::new(
        VehicleStore::open(&config.store_path).with_context(|| {
            format!("opening vehicle store at {}", config.store_path.display())
        })?,
    );

    match &cli.command {
        Commands::Lookup {
            registration,
            force,
        } => {
            let service = build_service(store, config)?;
            let outcome = service.lookup(registration, *force).await?;
            print_outcome(&outcome, cli.json)
        }
        Commands::Import { registration, file } => {
            let html = std::fs::read_to_string(file)
                .with_context(|| format!("reading {}", file.display()))?;
            let service = build_service(store, config)?;
            let record = service.import_html(registration, &html)?;
            print_record(&record, cli.json)
        }
        Commands::Show { registration } => {
            let identifier = normalize_identifier(registration);
            match store.get(&identifier)? {
                Some(record) => print_record(&record, cli.json),
                None => anyhow::bail!("no stored record for {identifier}"),
            }
        }
    }
}

fn build_service(store: Arc<VehicleStore>, config: &Config) -> Result<LookupService> {
    let fetcher = Arc::new(HttpFetcher::new(config).context("building report fetcher")?);
    Ok(LookupService::new(store, fetcher, config.freshness_window))
}

fn init_tracing(verbose: bool, quiet: bool) {
    let directive = if verbose {
        "regcheck=debug"
    } else if quiet {
        "regcheck=warn"
    } else {
        "regcheck=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(directive.parse().expect("log directive is valid")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_outcome(outcome: &LookupOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }
    print_record(&outcome.record, false)?;
    println!(
        "  source:      {}",
        if outcome.cached { "store" } else { "live fetch" }
    );
    Ok(())
}

fn print_record(record: &VehicleRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }
    let report = &record.report;
    let name = match (&report.make, &report.model) {
        (Some(make), Some(model)) => format!("{make} {model}"),
        (Some(make), None) => make.clone(),
        (None, Some(model)) => model.clone(),
        (None, None) => "unknown vehicle".to_string(),
    };
    println!("{}  {}", report.identifier, name);
    if let Some(year) = report.manufacture_year {
        println!("  year:        {year}");
    }
    if let Some(colour) = &report.colour {
        println!("  colour:      {colour}");
    }
    if let Some(engine) = &report.engine {
        if let Some(fuel) = &engine.fuel_type {
            println!("  fuel:        {fuel}");
        }
        if let Some(cc) = engine.capacity_cc {
            println!("  engine:      {cc} cc");
        }
    }
    if let Some(mot) = &report.mot_status {
        if let Some(expiry) = &mot.expiry_date {
            println!("  mot expires: {expiry}");
        }
    }
    if let Some(tax) = &report.tax_status {
        if let Some(status) = &tax.status {
            println!("  tax:         {status}");
        }
    }
    println!("  updated:     {}", record.last_updated.to_rfc3339());
    Ok(())
}
