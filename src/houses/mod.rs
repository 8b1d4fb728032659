// House validation - the gate in front of every character write
//
// cache      → remembers confirmed houses
// authority  → asks the external house service
// validator  → cache-then-authority yes/no decision
// gate       → turns "no" into a 400 rejection

pub mod authority;
pub mod cache;
pub mod gate;
pub mod validator;

pub use authority::{normalize_response, HouseAuthority, LookupOutcome, PotterApiAuthority};
pub use cache::{HouseCache, InMemoryHouseCache, SqliteHouseCache};
pub use gate::{InvalidHouseError, ValidationGate, INVALID_HOUSE_MESSAGE};
pub use validator::{cache_key, HouseValidator, CACHE_KEY_PREFIX};

use crate::config::{CacheBackend, Config};
use anyhow::Result;
use std::sync::Arc;

/// Opaque record returned by the authority; only its existence matters here
pub type HouseRecord = serde_json::Value;

/// Wire up cache + authority + validator + gate from process configuration
pub fn gate_from_config(config: &Config) -> Result<ValidationGate> {
    let cache: Arc<dyn HouseCache> = match config.house_cache {
        CacheBackend::Memory => Arc::new(InMemoryHouseCache::with_capacity(
            config.house_cache_capacity,
        )),
        CacheBackend::Sqlite => Arc::new(SqliteHouseCache::open(&config.database_path)?),
    };

    let authority = Arc::new(PotterApiAuthority::new(
        &config.house_api_url,
        config.house_api_key.clone(),
        config.house_api_timeout,
    )?);

    Ok(ValidationGate::new(HouseValidator::new(cache, authority)))
}
