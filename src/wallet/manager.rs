use alloy_primitives::Address;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult, StoreError};
use crate::execution::rpc::ChainClient;
use crate::execution::units::wei_to_ether;
use crate::wallet::keys::LocalKey;
use crate::wallet::models::{Identity, IdentityRecord, WalletRole};
use crate::wallet::repository::IdentityTable;

#[derive(Default)]
struct Rows {
    records: Vec<IdentityRecord>,
    /// Set while the table on disk cannot be parsed; blocks every write
    load_error: Option<String>,
}

/// Owns one identity table (funding or farming).
///
/// The in-memory rows never hold an identity that is not also on disk:
/// `create_and_persist` rewrites the table before it returns.
pub struct AccountManager {
    role: WalletRole,
    table: IdentityTable,
    rows: Mutex<Rows>,
    client: Arc<dyn ChainClient>,
}

impl AccountManager {
    /// `client` must point at the role's balance network
    pub fn new(role: WalletRole, table: IdentityTable, client: Arc<dyn ChainClient>) -> Self {
        let manager = Self {
            role,
            table,
            rows: Mutex::new(Rows::default()),
            client,
        };
        manager.load();
        manager
    }

    /// Reload the table from disk, discarding in-memory state.
    ///
    /// An unparsable table leaves no identities in memory and makes
    /// `create_and_persist` fail until a later load succeeds.
    pub fn load(&self) -> usize {
        let mut rows = self.rows.lock();
        match self.table.load() {
            Ok(records) => {
                debug!(
                    "Loaded {} {} identities from {}",
                    records.len(),
                    self.role,
                    self.table.path().display()
                );
                rows.records = records;
                rows.load_error = None;
            }
            Err(e) => {
                error!("❌ {} identities unavailable, writes disabled: {}", self.role, e);
                rows.records.clear();
                rows.load_error = Some(e.to_string());
            }
        }
        rows.records.len()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Generate a key pair, append it and persist the full table
    pub fn create_and_persist(&self) -> AppResult<Identity> {
        let key = LocalKey::random();
        let record = IdentityRecord::from_key(&key);

        let mut rows = self.rows.lock();
        if let Some(reason) = &rows.load_error {
            return Err(StoreError::WriteRefused {
                path: self.table.path().to_path_buf(),
                reason: reason.clone(),
            }
            .into());
        }
        rows.records.push(record);
        if let Err(e) = self.table.save(&rows.records) {
            rows.records.pop();
            return Err(e.into());
        }
        drop(rows);

        info!("🔑 Created {} identity {}", self.role, key.checksum_address());
        Ok(Identity::new(key))
    }

    /// Live balance in ether on the role's network; the cached column is ignored
    pub async fn get_balance(&self, address: Address) -> AppResult<Decimal> {
        let wei = self.client.balance(address).await?;
        let balance = wei_to_ether(wei)?;
        debug!(
            "Balance of {} on {}: {}",
            address.to_checksum(None),
            self.client.network(),
            balance
        );
        Ok(balance)
    }

    /// Every row whose key parses, in table order
    pub fn list_signing_identities(&self) -> Vec<Identity> {
        self.rows
            .lock()
            .records
            .iter()
            .filter_map(|record| match record.to_identity() {
                Ok(identity) => Some(identity),
                Err(e) => {
                    warn!(
                        "Skipping {} identity {}: {}",
                        self.role, record.address, e
                    );
                    None
                }
            })
            .collect()
    }

    /// First usable identity, the source of funding transfers
    pub fn first_identity(&self) -> AppResult<Identity> {
        self.list_signing_identities()
            .into_iter()
            .next()
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "No {} identity in {}",
                    self.role,
                    self.table.path().display()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::mock::MockChainClient;
    use crate::ledger::models::Network;
    use alloy_primitives::U256;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    fn manager(dir: &tempfile::TempDir, role: WalletRole) -> AccountManager {
        let table = IdentityTable::new(dir.path().join(format!("{}.json", role)));
        AccountManager::new(
            role,
            table,
            Arc::new(MockChainClient::new(role.balance_network())),
        )
    }

    #[test]
    fn test_create_and_persist_is_durable() {
        let dir = tempfile::tempdir().unwrap();
        let accounts = manager(&dir, WalletRole::Farming);
        assert!(accounts.is_empty());

        let identity = accounts.create_and_persist().unwrap();

        let on_disk = IdentityTable::new(dir.path().join("farming.json"))
            .load()
            .unwrap();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk[0].address, identity.checksum_address());
        assert!(!on_disk[0].private_key.is_empty());
        assert!(on_disk[0].balance.is_none());
    }

    #[test]
    fn test_created_identities_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let accounts = manager(&dir, WalletRole::Farming);

        let addresses: HashSet<_> = (0..3)
            .map(|_| accounts.create_and_persist().unwrap().address())
            .collect();
        assert_eq!(addresses.len(), 3);
        assert_eq!(accounts.list_signing_identities().len(), 3);
    }

    #[test]
    fn test_failed_persist_keeps_memory_consistent() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the table file should be makes the rename fail.
        let path = dir.path().join("funding.json");
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        let accounts = AccountManager::new(
            WalletRole::Funding,
            IdentityTable::new(&path),
            Arc::new(MockChainClient::new(Network::Base)),
        );

        assert!(accounts.create_and_persist().is_err());
        assert!(accounts.is_empty());
    }

    #[test]
    fn test_unparsable_table_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("farming.json");
        let a = IdentityRecord::from_key(&LocalKey::random());
        let b = IdentityRecord::from_key(&LocalKey::random());
        let mut rows = serde_json::to_value(vec![&a, &b]).unwrap();
        rows[1]["balance"] = serde_json::json!("n/a");
        let raw = serde_json::to_string(&rows).unwrap();
        std::fs::write(&path, &raw).unwrap();

        let accounts = AccountManager::new(
            WalletRole::Farming,
            IdentityTable::new(&path),
            Arc::new(MockChainClient::new(Network::Secondary)),
        );
        assert!(accounts.is_empty());

        let err = accounts.create_and_persist().unwrap_err();
        assert!(matches!(
            err,
            AppError::Store(StoreError::WriteRefused { .. })
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), raw);

        // Repaired on disk, the next load re-enables writes
        rows[1]["balance"] = serde_json::Value::Null;
        std::fs::write(&path, serde_json::to_string(&rows).unwrap()).unwrap();
        assert_eq!(accounts.load(), 2);
        accounts.create_and_persist().unwrap();
        assert_eq!(accounts.len(), 3);
    }

    #[test]
    fn test_load_picks_up_external_edits() {
        let dir = tempfile::tempdir().unwrap();
        let accounts = manager(&dir, WalletRole::Funding);

        let other = manager(&dir, WalletRole::Funding);
        other.create_and_persist().unwrap();

        assert_eq!(accounts.len(), 0);
        assert_eq!(accounts.load(), 1);
        assert!(accounts.first_identity().is_ok());
    }

    #[test]
    fn test_first_identity_requires_rows() {
        let dir = tempfile::tempdir().unwrap();
        let accounts = manager(&dir, WalletRole::Funding);
        assert!(accounts.first_identity().is_err());
    }

    #[tokio::test]
    async fn test_get_balance_queries_network() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(MockChainClient::new(Network::Secondary));
        *client.balance.lock() = U256::from(250_000_000_000_000_000u64);

        let accounts = AccountManager::new(
            WalletRole::Farming,
            IdentityTable::new(dir.path().join("farming.json")),
            client.clone(),
        );
        let identity = accounts.create_and_persist().unwrap();

        let balance = accounts.get_balance(identity.address()).await.unwrap();
        assert_eq!(balance, dec!(0.25));
        assert_eq!(client.calls(), 1);
    }
}
