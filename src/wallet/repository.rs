use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::io::{read_table, write_table};
use crate::wallet::models::IdentityRecord;

/// JSON file backing one identity table
#[derive(Debug, Clone)]
pub struct IdentityTable {
    path: PathBuf,
}

impl IdentityTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every row. A missing or empty file is an empty table; anything
    /// unparsable is an error so the keys in it are never overwritten.
    pub fn load(&self) -> Result<Vec<IdentityRecord>, StoreError> {
        read_table(&self.path)
    }

    /// Replace the table on disk with `rows`
    pub fn save(&self, rows: &[IdentityRecord]) -> Result<(), StoreError> {
        write_table(&self.path, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: u8) -> IdentityRecord {
        IdentityRecord {
            private_key: format!("0x{:064x}", n),
            address: format!("0x{:040x}", n),
            balance: None,
            last_updated: None,
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let table = IdentityTable::new(dir.path().join("wallets").join("farming.json"));

        assert!(table.load().unwrap().is_empty());
        table.save(&[record(1), record(2)]).unwrap();

        let rows = table.load().unwrap();
        assert_eq!(rows, vec![record(1), record(2)]);
    }

    #[test]
    fn test_corrupt_table_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("funding.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            IdentityTable::new(&path).load(),
            Err(StoreError::Parse { .. })
        ));

        std::fs::write(&path, "  \n").unwrap();
        assert!(IdentityTable::new(&path).load().unwrap().is_empty());
    }
}
