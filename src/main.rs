use anyhow::{Context, Result};
use rusqlite::Connection;
use std::env;
use std::process::ExitCode;

use character_api::{count_characters, gate_from_config, init_logging, setup_database, Config};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let config = Config::from_env()?;

    match args.get(1).map(String::as_str) {
        Some("migrate") => run_migrate(&config)?,
        Some("check-house") => {
            let house_id = args
                .get(2)
                .context("usage: character-api check-house <house-id>")?;
            if !run_check_house(&config, house_id).await? {
                return Ok(ExitCode::from(2));
            }
        }
        _ => print_usage(),
    }

    Ok(ExitCode::SUCCESS)
}

fn run_migrate(config: &Config) -> Result<()> {
    println!("🗄️  Setting up database at {:?}", config.database_path);

    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("Failed to open database at {:?}", config.database_path))?;
    setup_database(&conn)?;

    let count = count_characters(&conn)?;
    println!("✓ Database ready with WAL mode ({} characters)", count);

    Ok(())
}

/// Runs the same gate the API uses, so cache behaviour can be checked by hand.
/// `Ok(false)` means the house was rejected.
async fn run_check_house(config: &Config, house_id: &str) -> Result<bool> {
    let gate = gate_from_config(config)?;

    match gate.enforce(house_id).await {
        Ok(()) => {
            println!("✅ '{}' is a valid house", house_id.trim());
            Ok(true)
        }
        Err(e) => {
            println!("❌ '{}': {}", house_id.trim(), e);
            Ok(false)
        }
    }
}

fn print_usage() {
    println!("character-api {}", character_api::VERSION);
    println!();
    println!("Usage:");
    println!("  character-api migrate                 Create tables in DATABASE_PATH");
    println!("  character-api check-house <house-id>  Validate a house against the authority");
    println!();
    println!("Run the HTTP API with: cargo run --bin character-server");
}
