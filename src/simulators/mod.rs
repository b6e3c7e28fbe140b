pub mod antminer;
pub mod envelope;
pub mod server;
pub mod whatsminer;

pub use server::{RpcDialect, RpcServer, RPC_PORT};

/// Round to two decimals, the precision the firmware reports hashrates with.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
