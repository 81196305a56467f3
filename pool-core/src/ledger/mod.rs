//! Pool ledger and registry

pub mod pool;
pub mod registry;

pub use pool::{PoolLedger, Reservation};
pub use registry::{PoolRegistry, RegistryStats};
