//! # watchlist — recently active symbols
//!
//! A small persisted list of the symbols that fired entries most recently,
//! newest first, capped at a configured limit. Surfaced on `/ping` so a
//! glance at the health endpoint shows what the pipeline has been watching.
//!
//! An earlier incarnation also kept a per-symbol re-entry cooldown here; that
//! was retired — the same symbol may fire again immediately.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::store::write_json_atomic;

#[derive(Debug, Default, Serialize, Deserialize)]
struct WatchlistState {
    active_symbols: Vec<String>,
}

pub struct Watchlist {
    path:  PathBuf,
    limit: usize,
}

impl Watchlist {
    pub fn new(data_dir: &Path, limit: usize) -> Self {
        Self {
            path: data_dir.join("watchlist.json"),
            limit,
        }
    }

    /// Moves `symbol` to the front of the list, truncating to the cap.
    pub fn mark_active(&self, symbol: &str) -> anyhow::Result<()> {
        let mut state = self.load();
        state.active_symbols.retain(|s| s != symbol);
        state.active_symbols.insert(0, symbol.to_string());
        state.active_symbols.truncate(self.limit);
        write_json_atomic(&self.path, &state)
    }

    pub fn active_symbols(&self) -> Vec<String> {
        self.load().active_symbols
    }

    fn load(&self) -> WatchlistState {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return WatchlistState::default(),
        };
        serde_json::from_str(&raw).unwrap_or_default()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_most_recent_first_and_deduped() {
        let dir = TempDir::new().unwrap();
        let list = Watchlist::new(dir.path(), 10);

        list.mark_active("7203").unwrap();
        list.mark_active("6758").unwrap();
        list.mark_active("7203").unwrap();

        assert_eq!(list.active_symbols(), vec!["7203", "6758"]);
    }

    #[test]
    fn test_cap_is_enforced() {
        let dir = TempDir::new().unwrap();
        let list = Watchlist::new(dir.path(), 3);

        for sym in ["A", "B", "C", "D"] {
            list.mark_active(sym).unwrap();
        }
        assert_eq!(list.active_symbols(), vec!["D", "C", "B"]);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let list = Watchlist::new(dir.path(), 10);
        assert!(list.active_symbols().is_empty());
    }
}
