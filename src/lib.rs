// Character API - Core Library
// Exposes all modules for use in the CLI, the HTTP server, and tests

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod houses;
pub mod schema;

// Re-export commonly used types
pub use api::{router, AppState};
pub use config::{CacheBackend, Config};
pub use db::{
    Character, CharacterChanges, NewCharacter, Page,
    setup_database, insert_character, get_character, list_characters,
    update_character, delete_character, count_characters,
};
pub use error::ApiError;
pub use houses::{
    HouseAuthority, HouseCache, HouseRecord, HouseValidator, InMemoryHouseCache,
    InvalidHouseError, LookupOutcome, PotterApiAuthority, SqliteHouseCache, ValidationGate,
    gate_from_config,
};
pub use schema::{CharacterPayload, ValidationError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global `tracing` subscriber; `RUST_LOG` overrides the `info` default
pub fn init_logging() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // try_init: a second call keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
