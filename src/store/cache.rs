use std::fs;
use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::api::{self, AccountApi, SPACE_LIST_LIMIT};
use crate::error::Result;
use crate::model::InventorySnapshot;

const SNAPSHOT_FILE: &str = "spaces.json";

/// On-disk copy of the last enumerated inventory.
///
/// Purely an optimization: every read failure is a cache miss.
pub struct InventoryCache {
    dir: PathBuf,
}

impl InventoryCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    /// Read the persisted snapshot. Missing, unreadable or malformed files yield `None`.
    pub fn load(&self) -> Option<InventorySnapshot> {
        let path = self.path();
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "no cached inventory");
                return None;
            }
        };
        match serde_json::from_str::<InventorySnapshot>(&data) {
            Ok(snapshot) => {
                info!(spaces = snapshot.len(), "Loaded spaces from local file");
                Some(snapshot)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring malformed inventory cache");
                None
            }
        }
    }

    /// Write `snapshot`, creating the cache directory if needed and replacing prior content.
    pub fn save(&self, snapshot: &InventorySnapshot) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
            debug!(dir = %self.dir.display(), "created cache directory");
        }
        fs::write(self.path(), serde_json::to_string_pretty(snapshot)?)?;
        info!(spaces = snapshot.len(), path = %self.path().display(), "Saved spaces to local file");
        Ok(())
    }

    /// Enumerate the account's spaces with a single listing call.
    pub fn fetch_live<A: AccountApi + ?Sized>(&self, api: &A) -> Result<InventorySnapshot> {
        let org_id = api::resolve_organization(api)?;
        let spaces = api.list_spaces(&org_id, SPACE_LIST_LIMIT)?;
        if spaces.len() >= SPACE_LIST_LIMIT {
            warn!(
                limit = SPACE_LIST_LIMIT,
                "space listing hit the page-size ceiling; later spaces are not included"
            );
        }
        info!(spaces = spaces.len(), org = %org_id, "fetched spaces from account");
        Ok(InventorySnapshot::new(spaces))
    }

    /// Cached inventory unless `refresh` is set; otherwise one live fetch.
    ///
    /// Enumeration errors recover to an empty inventory. Non-empty live results
    /// are persisted; a failed write is logged and otherwise ignored.
    pub fn load_or_fetch<A: AccountApi + ?Sized>(
        &self,
        api: &A,
        refresh: bool,
    ) -> InventorySnapshot {
        if !refresh && let Some(snapshot) = self.load() {
            return snapshot;
        }

        let snapshot = match self.fetch_live(api) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(error = %err, "Error fetching spaces");
                return InventorySnapshot::default();
            }
        };

        if !snapshot.is_empty()
            && let Err(err) = self.save(&snapshot)
        {
            warn!(error = %err, "could not persist inventory cache");
        }
        snapshot
    }
}
