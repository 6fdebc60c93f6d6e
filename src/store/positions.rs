//! # store::positions
//!
//! The live position store: one JSON object keyed by symbol, holding the
//! current [`Position`] per symbol. Read and rewritten whole on every
//! lifecycle operation — the file is small (one entry per watched symbol)
//! and re-reading keeps a separately scheduled batch job's view coherent.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::models::Position;
use crate::store::{read_json_map, write_json_atomic};

pub struct PositionStore {
    path: PathBuf,
}

impl PositionStore {
    pub fn new(data_dir: &std::path::Path) -> Self {
        Self {
            path: data_dir.join("positions_live.json"),
        }
    }

    pub fn load_all(&self) -> HashMap<String, Position> {
        read_json_map(&self.path)
    }

    pub fn save_all(&self, state: &HashMap<String, Position>) -> anyhow::Result<()> {
        write_json_atomic(&self.path, state)
    }

    pub fn get(&self, symbol: &str) -> Option<Position> {
        self.load_all().remove(symbol)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Side;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let store = PositionStore::new(dir.path());

        let mut state = HashMap::new();
        state.insert("7203".to_string(), Position::new("7203", Side::Buy, 3000.0, true));
        store.save_all(&state).unwrap();

        let back = store.get("7203").expect("position should round-trip");
        assert_eq!(back.symbol, "7203");
        assert_eq!(back.entry_price, 3000.0);
        assert!(store.get("6758").is_none());
    }
}
