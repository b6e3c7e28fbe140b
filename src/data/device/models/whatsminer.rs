use strum::{Display, EnumIter, EnumString};

use crate::data::board::BoardInfo;
use crate::data::device::MinerMake;
use crate::data::fan::FanInfo;
use crate::data::hashrate::{HashRate, HashRateUnit};
use crate::data::miner::MinerInfo;

/// Stock Whatsminer models the simulator can present as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum WhatsminerModel {
    #[strum(serialize = "M30SVG10")]
    M30SVG10,
}

impl WhatsminerModel {
    /// Nameplate configuration for this model: 3 boards at 28 TH/s each,
    /// one intake and one exhaust fan.
    pub fn miner_info(&self) -> MinerInfo {
        let hashrate = HashRate::new(28.0, HashRateUnit::TeraHash);
        let board_info = BoardInfo {
            ideal_chips: 66,
            chips: 66,
            ideal_hashrate: hashrate,
            hashrate,
            ..BoardInfo::default()
        };
        MinerInfo::new(
            MinerMake::Whatsminer,
            self.to_string(),
            3,
            board_info,
            2,
            FanInfo::default(),
        )
    }
}
