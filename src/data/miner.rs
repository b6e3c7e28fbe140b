use macaddr::MacAddr6;
use rand::Rng;

use super::board::BoardInfo;
use super::device::MinerMake;
use super::fan::FanInfo;

/// Catalog identity and nameplate configuration for one simulated miner.
///
/// The MAC address is generated once here and never regenerated; everything
/// else is static catalog data plus the fan-control policy knobs.
#[derive(Debug, Clone)]
pub struct MinerInfo {
    pub make: MinerMake,
    pub model: String,
    pub mac: MacAddr6,
    pub board_count: usize,
    pub board_info: BoardInfo,
    pub fan_count: usize,
    pub fan_info: FanInfo,
    /// Manual fan control; automatic control pins every fan to max speed
    pub fan_manual: bool,
    /// Target speed under manual control, in percent of max
    pub fan_speed_percent: f64,
}

impl MinerInfo {
    pub fn new(
        make: MinerMake,
        model: impl Into<String>,
        board_count: usize,
        board_info: BoardInfo,
        fan_count: usize,
        fan_info: FanInfo,
    ) -> Self {
        MinerInfo {
            make,
            model: model.into(),
            mac: random_mac(),
            board_count,
            board_info,
            fan_count,
            fan_info,
            fan_manual: false,
            fan_speed_percent: 100.0,
        }
    }
}

fn random_mac() -> MacAddr6 {
    let mut rng = rand::rng();
    MacAddr6::new(
        rng.random(),
        rng.random(),
        rng.random(),
        rng.random(),
        rng.random(),
        rng.random(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_fills_policy_defaults() {
        let info = MinerInfo::new(
            MinerMake::Antminer,
            "S19",
            3,
            BoardInfo::default(),
            4,
            FanInfo::default(),
        );
        assert!(!info.fan_manual);
        assert_eq!(info.fan_speed_percent, 100.0);
        assert_eq!(info.model, "S19");
    }

    #[test]
    fn mac_is_stable_once_generated() {
        let info = MinerInfo::new(
            MinerMake::Antminer,
            "S19",
            3,
            BoardInfo::default(),
            4,
            FanInfo::default(),
        );
        assert_eq!(info.mac, info.clone().mac);
    }
}
