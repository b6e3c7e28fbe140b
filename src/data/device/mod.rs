pub mod models;

use strum::Display;

/// Manufacturers with a simulated dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum MinerMake {
    Antminer,
    Whatsminer,
}
