//! DigitalBank test-data CLI
//!
//! Seeds, cleans and resets the per-environment SQLite databases used by
//! the UI and API suites.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use digitalbank_testdata::{
    close_all, DataSettings, DatabaseRegistry, Environment, StaticDataCache, TestDataManager,
};
use std::path::PathBuf;

const EXAMPLES: &str = "Examples:
  digitalbank-data seed --env dev
  digitalbank-data seed --env uat -v
  digitalbank-data cleanup --env dev
  digitalbank-data reset --env int -v
  digitalbank-data random --env dev --count 20 -v";

/// Manage DigitalBank test data
#[derive(Parser)]
#[command(name = "digitalbank-data")]
#[command(author, version, about, long_about = None, after_help = EXAMPLES)]
struct Cli {
    /// Command to run
    #[arg(value_enum)]
    command: Command,

    /// Target environment
    #[arg(long, value_enum, default_value_t = Environment::Dev)]
    env: Environment,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Records per entity for the `random` command
    #[arg(long, default_value_t = 10)]
    count: usize,

    /// Directory holding the test_data_<env>.db files [default: $DIGITALBANK_DB_DIR or data/db]
    #[arg(long)]
    db_dir: Option<PathBuf>,

    /// Static fixture document [default: $DIGITALBANK_STATIC_DATA or the built-in test_users.json]
    #[arg(long)]
    data_file: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Command {
    /// Insert the canonical fixtures
    Seed,
    /// Drop every table
    Cleanup,
    /// Drop, recreate and seed
    Reset,
    /// Insert random records
    Random,
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let outcome = run(&cli);
    close_all();

    if let Err(e) = outcome {
        eprintln!("[ERROR] {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let settings = DataSettings::from_env().with_overrides(cli.db_dir.clone(), cli.data_file.clone());
    settings.validate()?;

    let db = {
        let mut registry = DatabaseRegistry::global().lock();
        registry.set_db_dir(&settings.db_dir);
        registry.get_or_create(cli.env)
    };

    let cache = match &settings.static_data {
        Some(path) => StaticDataCache::from_path(path),
        None => StaticDataCache::embedded(),
    };
    let mut manager = TestDataManager::with_parts(cli.env, db, cache);

    if cli.verbose {
        println!(
            "🗄️  {} → {}",
            cli.env,
            manager.db().db_path().display()
        );
        let endpoints = settings
            .environment_config(cli.env)
            .with_context(|| format!("Reading {}", settings.environments_file.display()))?;
        if let Some(endpoints) = endpoints {
            println!("🌐 {} (api: {})", endpoints.base_url, endpoints.api_url);
        }
    }

    match cli.command {
        Command::Seed => {
            let summary = manager
                .seed_standard_data()
                .with_context(|| format!("Seeding '{}' failed", cli.env))?;
            println!("✓ Seeded '{}': {}", cli.env, summary);
        }
        Command::Cleanup => {
            manager
                .cleanup()
                .with_context(|| format!("Cleanup of '{}' failed", cli.env))?;
            println!("✓ Removed all test data from '{}'", cli.env);
        }
        Command::Reset => {
            let summary = manager
                .reset()
                .with_context(|| format!("Reset of '{}' failed", cli.env))?;
            println!("✓ Reset '{}': {}", cli.env, summary);
        }
        Command::Random => {
            let summary = manager
                .seed_random_data(cli.count)
                .with_context(|| format!("Random seeding of '{}' failed", cli.env))?;
            println!("✓ Inserted random data into '{}': {}", cli.env, summary);
        }
    }

    if cli.verbose {
        let counts = manager.table_counts()?;
        println!("\n📊 Rows now in '{}': {}", cli.env, counts);
        println!("\n[OK] Done");
    }

    Ok(())
}
