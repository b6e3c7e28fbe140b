use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use measurements::{AngularVelocity, Temperature};
use tokio::sync::Mutex;

use crate::data::board::BoardSimulator;
use crate::data::fan::FanSimulator;
use crate::data::hashrate::HashRateUnit;
use crate::data::miner::MinerInfo;
use crate::data::pool::PoolInfo;

/// Backend handle shared between the RPC dialects and the web layer.
pub type SharedBackend = Arc<Mutex<SimulatorBackend>>;

/// Seconds of uptime a freshly constructed device pretends to already have.
const BASE_UPTIME_SECS: u64 = 10_000;

/// Current Unix time in whole seconds.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before Unix epoch")
        .as_secs()
}

/// Full state of one simulated device: catalog identity, pool slots, board
/// and fan collections, and the operator-facing toggles.
///
/// Telemetry is pull-based: callers run [`apply_policy`](Self::apply_policy)
/// once per request to push the fan policy and the mining flag down into the
/// per-device collections, then read through the plain accessors. Applying
/// policy twice for unchanged state is idempotent.
pub struct SimulatorBackend {
    pub miner_info: MinerInfo,
    pools: Vec<PoolInfo>,
    pub env_temperature: Temperature,
    init_time: u64,
    light: bool,
    mining: bool,
    boards: Vec<BoardSimulator>,
    fans: Vec<FanSimulator>,
}

impl SimulatorBackend {
    pub fn new(miner_info: MinerInfo) -> Self {
        Self::with_pools(miner_info, vec![PoolInfo::default(); 3])
    }

    pub fn with_pools(miner_info: MinerInfo, pools: Vec<PoolInfo>) -> Self {
        let boards = (0..miner_info.board_count)
            .map(|_| BoardSimulator::new(miner_info.board_info.clone()))
            .collect();
        let fans = (0..miner_info.fan_count)
            .map(|_| FanSimulator::new(miner_info.fan_info.clone()))
            .collect();
        SimulatorBackend {
            miner_info,
            pools,
            env_temperature: Temperature::from_celsius(35.0),
            init_time: unix_timestamp(),
            light: false,
            mining: true,
            boards,
            fans,
        }
    }

    /// Push current policy into the collections: every fan gets the speed the
    /// fan mode dictates, every board follows the device-wide mining flag.
    pub fn apply_policy(&mut self) {
        let speed = if self.miner_info.fan_manual {
            let max = self.miner_info.fan_info.max_speed.as_rpm();
            AngularVelocity::from_rpm((max * self.miner_info.fan_speed_percent / 100.0).round())
        } else {
            self.miner_info.fan_info.max_speed
        };
        for fan in &mut self.fans {
            fan.set_rpm(speed);
        }
        for board in &mut self.boards {
            board.mining = self.mining;
        }
    }

    pub fn boards(&self) -> &[BoardSimulator] {
        &self.boards
    }

    pub fn boards_mut(&mut self) -> &mut [BoardSimulator] {
        &mut self.boards
    }

    pub fn fans(&self) -> &[FanSimulator] {
        &self.fans
    }

    pub fn fans_mut(&mut self) -> &mut [FanSimulator] {
        &mut self.fans
    }

    pub fn pools(&self) -> &[PoolInfo] {
        &self.pools
    }

    /// Uptime in seconds; the device presents as already long-running.
    pub fn elapsed_seconds(&self) -> u64 {
        BASE_UPTIME_SECS + unix_timestamp().saturating_sub(self.init_time)
    }

    /// Sum of every board's effective hashrate, expressed in `unit`.
    pub fn total_hashrate(&self, unit: HashRateUnit) -> f64 {
        self.boards
            .iter()
            .map(|board| board.hashrate().into_unit(unit).value)
            .sum()
    }

    pub fn light(&self) -> bool {
        self.light
    }

    pub fn is_mining(&self) -> bool {
        self.mining
    }

    pub fn set_light(&mut self, on: bool) {
        self.light = on;
    }

    pub fn set_mining_enabled(&mut self, enabled: bool) {
        self.mining = enabled;
    }

    pub fn set_pools(&mut self, pools: Vec<PoolInfo>) {
        self.pools = pools;
    }

    pub fn set_fan_policy(&mut self, manual: bool, speed_percent: f64) {
        self.miner_info.fan_manual = manual;
        self.miner_info.fan_speed_percent = speed_percent;
    }
}
