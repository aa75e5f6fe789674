pub mod keys;
pub mod manager;
pub mod models;
pub mod repository;

pub use manager::AccountManager;
pub use models::{Identity, WalletRole};
pub use repository::IdentityTable;
