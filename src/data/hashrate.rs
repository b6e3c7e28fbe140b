use std::fmt;

use strum::EnumIter;

/// Magnitude scale for hashrates, each step exactly 1000x the previous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter)]
pub enum HashRateUnit {
    Hash,
    KiloHash,
    MegaHash,
    GigaHash,
    TeraHash,
    PetaHash,
    ExaHash,
    ZettaHash,
}

impl HashRateUnit {
    /// Number of plain hashes per second represented by 1.0 in this unit.
    pub fn factor(&self) -> f64 {
        match self {
            HashRateUnit::Hash => 1.0,
            HashRateUnit::KiloHash => 1e3,
            HashRateUnit::MegaHash => 1e6,
            HashRateUnit::GigaHash => 1e9,
            HashRateUnit::TeraHash => 1e12,
            HashRateUnit::PetaHash => 1e15,
            HashRateUnit::ExaHash => 1e18,
            HashRateUnit::ZettaHash => 1e21,
        }
    }
}

impl fmt::Display for HashRateUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self {
            HashRateUnit::Hash => "H/s",
            HashRateUnit::KiloHash => "KH/s",
            HashRateUnit::MegaHash => "MH/s",
            HashRateUnit::GigaHash => "GH/s",
            HashRateUnit::TeraHash => "TH/s",
            HashRateUnit::PetaHash => "PH/s",
            HashRateUnit::ExaHash => "EH/s",
            HashRateUnit::ZettaHash => "ZH/s",
        };
        write!(f, "{suffix}")
    }
}

/// A measured hashrate: a value tied to the unit it was reported in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HashRate {
    /// The current amount of hashes being computed
    pub value: f64,
    /// The unit of the hashes in value
    pub unit: HashRateUnit,
}

impl HashRate {
    pub fn new(value: f64, unit: HashRateUnit) -> Self {
        HashRate { value, unit }
    }

    /// The same quantity expressed in `unit`.
    pub fn into_unit(self, unit: HashRateUnit) -> HashRate {
        HashRate {
            value: self.value * (self.unit.factor() / unit.factor()),
            unit,
        }
    }
}

impl fmt::Display for HashRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}
