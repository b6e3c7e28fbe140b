use strum::{Display, EnumIter, EnumString};

use crate::data::board::BoardInfo;
use crate::data::device::MinerMake;
use crate::data::fan::FanInfo;
use crate::data::hashrate::{HashRate, HashRateUnit};
use crate::data::miner::MinerInfo;

/// Stock Antminer models the simulator can present as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum AntminerModel {
    #[strum(serialize = "S19")]
    S19,
    #[strum(serialize = "S19L")]
    S19L,
    #[strum(serialize = "S19 Pro")]
    S19Pro,
    #[strum(serialize = "S19j")]
    S19j,
    #[strum(serialize = "S19j Pro")]
    S19jPro,
    #[strum(serialize = "S19Pro+")]
    S19ProPlus,
    #[strum(serialize = "S19 XP")]
    S19XP,
    #[strum(serialize = "S19a")]
    S19a,
    #[strum(serialize = "S19a Pro")]
    S19aPro,
    #[strum(serialize = "T19")]
    T19,
}

impl AntminerModel {
    fn chips_per_board(&self) -> u16 {
        match self {
            AntminerModel::S19 => 76,
            AntminerModel::S19L => 76,
            AntminerModel::S19Pro => 114,
            AntminerModel::S19j => 114,
            AntminerModel::S19jPro => 126,
            AntminerModel::S19ProPlus => 120,
            AntminerModel::S19XP => 110,
            AntminerModel::S19a => 72,
            AntminerModel::S19aPro => 100,
            AntminerModel::T19 => 76,
        }
    }

    /// Nameplate configuration for this model: 3 boards at 34 TH/s each,
    /// four fans.
    pub fn miner_info(&self) -> MinerInfo {
        let hashrate = HashRate::new(34.0, HashRateUnit::TeraHash);
        let board_info = BoardInfo {
            ideal_chips: self.chips_per_board(),
            chips: self.chips_per_board(),
            ideal_hashrate: hashrate,
            hashrate,
            ..BoardInfo::default()
        };
        MinerInfo::new(
            MinerMake::Antminer,
            self.to_string(),
            3,
            board_info,
            4,
            FanInfo::default(),
        )
    }
}
