pub mod rpc;

pub use rpc::{AntminerCommand, AntminerRpcHandler};
