use tracing::info;

use crate::api::AccountApi;
use crate::error::Result;
use crate::model::InventorySnapshot;
use crate::output::{self, Format};
use crate::store::cache::InventoryCache;

/// Cached inventory, if present and `refresh` is not requested.
pub fn cached(cache: &InventoryCache, refresh: bool) -> Option<InventorySnapshot> {
    if refresh { None } else { cache.load() }
}

/// Show the inventory, fetching it through `api` on a cache miss.
pub fn run<A: AccountApi + ?Sized>(
    api: &A,
    cache: &InventoryCache,
    refresh: bool,
    format: Format,
) -> Result<()> {
    let snapshot = cache.load_or_fetch(api, refresh);
    show(&snapshot, format)
}

pub fn show(snapshot: &InventorySnapshot, format: Format) -> Result<()> {
    if snapshot.is_empty() {
        info!("No spaces found");
    }
    output::print_inventory(snapshot, format)
}
