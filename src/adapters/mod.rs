pub mod dex;
pub mod traits;
