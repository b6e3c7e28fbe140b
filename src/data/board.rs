use measurements::Temperature;

use super::hashrate::{HashRate, HashRateUnit};

/// Factory nameplate data for one hashboard, immutable catalog material.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardInfo {
    /// The number of chips the board shipped with
    pub ideal_chips: u16,
    /// The number of chips the board currently reports
    pub chips: u16,
    /// The factory hashrate of the board
    pub ideal_hashrate: HashRate,
    /// The hashrate the board currently reports
    pub hashrate: HashRate,
    /// The PCB temperature
    pub board_temperature: Temperature,
    /// The chip temperature
    pub chip_temperature: Temperature,
}

impl Default for BoardInfo {
    fn default() -> Self {
        BoardInfo {
            ideal_chips: 63,
            chips: 63,
            ideal_hashrate: HashRate::new(4.0, HashRateUnit::TeraHash),
            hashrate: HashRate::new(4.0, HashRateUnit::TeraHash),
            board_temperature: Temperature::from_celsius(60.0),
            chip_temperature: Temperature::from_celsius(80.0),
        }
    }
}

/// Runtime state of one hashboard. Effective hashrate and chip count are
/// derived on read from the nameplate, the optional overrides, and the
/// `working`/`mining` gates.
#[derive(Debug, Clone)]
pub struct BoardSimulator {
    pub info: BoardInfo,
    hashrate_override: Option<HashRate>,
    chips_override: Option<u16>,
    /// Whether the firmware is currently hashing on this board
    pub mining: bool,
    /// Whether the board hardware is functional at all
    pub working: bool,
}

impl BoardSimulator {
    pub fn new(info: BoardInfo) -> Self {
        BoardSimulator {
            info,
            hashrate_override: None,
            chips_override: None,
            mining: true,
            working: true,
        }
    }

    /// Effective hashrate: zero unless the board is both working and mining,
    /// otherwise the override if one was set, else the nameplate ideal.
    pub fn hashrate(&self) -> HashRate {
        if self.mining && self.working {
            self.hashrate_override
                .unwrap_or(self.info.ideal_hashrate)
        } else {
            HashRate::new(0.0, self.info.ideal_hashrate.unit)
        }
    }

    /// Effective chip count: zero when the board is not working, otherwise
    /// the override if one was set, else the nameplate ideal.
    pub fn chips(&self) -> u16 {
        if self.working {
            self.chips_override.unwrap_or(self.info.ideal_chips)
        } else {
            0
        }
    }

    pub fn set_hashrate(&mut self, hashrate: HashRate) {
        self.hashrate_override = Some(hashrate);
    }

    pub fn set_chips(&mut self, chips: u16) {
        self.chips_override = Some(chips);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_nameplate_values() {
        let board = BoardSimulator::new(BoardInfo::default());
        assert_eq!(board.chips(), 63);
        assert_eq!(board.hashrate(), HashRate::new(4.0, HashRateUnit::TeraHash));
    }

    #[test]
    fn broken_board_reports_nothing() {
        let mut board = BoardSimulator::new(BoardInfo::default());
        board.set_chips(50);
        board.set_hashrate(HashRate::new(3.2, HashRateUnit::TeraHash));
        board.working = false;
        assert_eq!(board.chips(), 0);
        assert_eq!(board.hashrate().value, 0.0);
    }

    #[test]
    fn idle_board_keeps_chips_but_not_hashrate() {
        let mut board = BoardSimulator::new(BoardInfo::default());
        board.mining = false;
        assert_eq!(board.hashrate().value, 0.0);
        assert_eq!(board.chips(), 63);
    }

    #[test]
    fn overrides_shadow_the_nameplate() {
        let mut board = BoardSimulator::new(BoardInfo::default());
        board.set_chips(61);
        board.set_hashrate(HashRate::new(3.9, HashRateUnit::TeraHash));
        assert_eq!(board.chips(), 61);
        assert_eq!(board.hashrate().value, 3.9);
    }
}
