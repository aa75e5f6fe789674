pub mod abi;
pub mod bridge;
pub mod native;
pub mod rpc;
pub mod tx;
pub mod units;

#[cfg(test)]
pub mod mock;
