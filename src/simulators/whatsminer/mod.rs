pub mod crypto;
pub mod rpc;

pub use crypto::{AuthSecrets, CryptoError};
pub use rpc::{WhatsminerCommand, WhatsminerRpcHandler};
