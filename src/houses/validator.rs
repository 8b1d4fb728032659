// ✅ House Validator - cache first, authority second, always a plain yes/no

use super::authority::{HouseAuthority, LookupOutcome};
use super::cache::HouseCache;
use std::sync::Arc;

/// Namespace for validator entries so they never collide with other cached data
pub const CACHE_KEY_PREFIX: &str = "house:";

/// Cache key for an already-trimmed house identifier
pub fn cache_key(house_id: &str) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, house_id)
}

#[derive(Clone)]
pub struct HouseValidator {
    cache: Arc<dyn HouseCache>,
    authority: Arc<dyn HouseAuthority>,
}

impl HouseValidator {
    pub fn new(cache: Arc<dyn HouseCache>, authority: Arc<dyn HouseAuthority>) -> Self {
        HouseValidator { cache, authority }
    }

    /// Decide whether `house_id` names a real house.
    ///
    /// - Blank input is invalid without touching cache or authority
    /// - A cached entry is permanent proof of validity
    /// - On a miss, exactly one authority lookup; only `Found` is cached
    ///
    /// Authority outages and "no such house" both come back as `false`.
    pub async fn is_valid(&self, house_id: &str) -> bool {
        let house_id = house_id.trim();
        if house_id.is_empty() {
            return false;
        }

        let key = cache_key(house_id);
        if self.cache.get(&key).is_some() {
            tracing::debug!(house_id, "house validated from cache");
            return true;
        }

        match self.authority.lookup(house_id).await {
            LookupOutcome::Found(record) => {
                tracing::info!(house_id, "house confirmed by authority");
                self.cache.put(&key, record);
                true
            }
            LookupOutcome::NotFound => {
                tracing::debug!(house_id, "house not known to authority");
                false
            }
            LookupOutcome::Failed(reason) => {
                tracing::warn!(house_id, %reason, "house lookup failed, treating as invalid");
                false
            }
        }
    }
}
