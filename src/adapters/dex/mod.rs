pub mod izumi;

pub use izumi::{IzumiSwapProvider, SwapConfig};
