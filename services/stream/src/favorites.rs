//! Local favorites persistence.
//!
//! A JSON array of symbols in one file: loaded once at startup, written
//! through on every toggle. A missing or corrupt file degrades to an empty
//! set — favorites are a convenience, never a reason to fail startup.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use tracing::warn;

use crate::error::{Result, StreamError};

/// Persistent set of favorited symbols.
pub struct FavoritesStore {
    path: PathBuf,
    symbols: HashSet<String>,
}

impl FavoritesStore {
    /// Load the store from `path`. Missing or unreadable files start empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let symbols = match fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<Vec<String>>(&data) {
                Ok(list) => list.into_iter().collect(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt favorites file, starting empty");
                    HashSet::new()
                }
            },
            // First run.
            Err(_) => HashSet::new(),
        };

        Self { path, symbols }
    }

    /// True when `symbol` is favorited.
    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    /// All favorited symbols, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut list: Vec<String> = self.symbols.iter().cloned().collect();
        list.sort();
        list
    }

    /// Flip `symbol`'s membership and write through; returns the new
    /// membership. The in-memory set keeps the flip even when the write
    /// fails.
    pub fn toggle(&mut self, symbol: &str) -> Result<bool> {
        let now_favorite = if self.symbols.remove(symbol) {
            false
        } else {
            self.symbols.insert(symbol.to_string());
            true
        };
        self.persist()?;
        Ok(now_favorite)
    }

    fn persist(&self) -> Result<()> {
        let data = serde_json::to_string(&self.symbols())?;
        fs::write(&self.path, data).map_err(|source| StreamError::Persistence {
            path: self.path.display().to_string(),
            source,
        })
    }
}
