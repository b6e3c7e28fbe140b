use std::str::FromStr;

use async_trait::async_trait;
use log::{info, warn};
use measurements::Temperature;
use serde_json::{json, Map, Value};
use strum::{AsRefStr, EnumIter, EnumString};

use crate::backend::{unix_timestamp, SharedBackend, SimulatorBackend};
use crate::data::hashrate::HashRateUnit;
use crate::simulators::envelope::{self, CommandReply, EnvelopeStyle};
use crate::simulators::round2;
use crate::simulators::server::RpcDialect;

const DESCRIPTION: &str = "cgminer 1.0.0";
const MINER_VERSION: &str = "uart_trans.1.3";
const BMMINER_VERSION: &str = "1.0.0";
const COMPILE_TIME: &str = "Fri Sep 15 14:39:20 CST 2023";

/// Number of board/fan slots the stats report always carries, populated or not.
const STATS_SLOTS: usize = 4;

/// Commands understood by the stock Antminer management API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum AntminerCommand {
    Devs,
    Pools,
    Stats,
    Summary,
    Version,
}

impl AntminerCommand {
    /// Every Antminer reply renders with the status-array shape.
    pub fn envelope_style(&self) -> EnvelopeStyle {
        EnvelopeStyle::StatusArray
    }
}

/// Plain JSON-over-TCP dialect: no authentication, one exchange per
/// connection.
pub struct AntminerRpcHandler {
    backend: SharedBackend,
    hash_unit: HashRateUnit,
}

impl AntminerRpcHandler {
    pub fn new(backend: SharedBackend) -> Self {
        AntminerRpcHandler {
            backend,
            hash_unit: HashRateUnit::GigaHash,
        }
    }

    pub fn with_hash_unit(mut self, unit: HashRateUnit) -> Self {
        self.hash_unit = unit;
        self
    }

    fn rate_unit_label(&self) -> String {
        self.hash_unit.to_string().trim_end_matches("/s").to_string()
    }

    fn dispatch(
        &self,
        command: AntminerCommand,
        backend: &SimulatorBackend,
        _params: &Map<String, Value>,
    ) -> CommandReply {
        match command {
            AntminerCommand::Devs => self.devs(backend),
            AntminerCommand::Pools => self.pools(backend),
            AntminerCommand::Stats => self.stats(backend),
            AntminerCommand::Summary => self.summary(backend),
            AntminerCommand::Version => self.version(backend),
        }
    }

    fn devs(&self, backend: &SimulatorBackend) -> CommandReply {
        let now = unix_timestamp();
        let mut body = Map::new();
        body.insert(
            String::from("DEVS"),
            json!([{
                "ASC": 0,
                "Accepted": 10000,
                "Device Elapsed": backend.elapsed_seconds(),
                "Device Hardware%": 1.0,
                "Device Rejected": 0.0,
                "Diff1 Work": 0,
                "Difficulty Accepted": 1_000_000_000u64,
                "Difficulty Rejected": 1_000_000,
                "Enabled": "Y",
                "Hardware Errors": 1,
                "ID": 0,
                // the firmware reports a timestamp here
                "Last Share Difficulty": now - 11,
                "Last Share Pool": 0,
                "Last Share Time": now - 10,
                "Last Valid Work": now - 11,
                "MHS 5s": 0.0,
                "MHS av": 0.0,
                "Name": "BTM_SOC",
                "Rejected": 100,
                "Status": "Alive",
                "Tenperature": 0.0,
                "Total MH": 0.0,
                "Utility": 0.0,
            }]),
        );
        CommandReply {
            code: 9,
            msg: String::from("1 ASC(s)"),
            body,
        }
    }

    fn pools(&self, backend: &SimulatorBackend) -> CommandReply {
        let pools: Vec<Value> = backend
            .pools()
            .iter()
            .enumerate()
            .map(|(index, pool)| {
                json!({
                    "Accepted": 10000,
                    "Best Share": 1_000_000_000.0,
                    "Diff": "100K",
                    "Diff1 Shares": 0,
                    "Difficulty Accepted": 1_000_000_000.0,
                    "Difficulty Rejected": 1_000_000.0,
                    "Difficulty Stale": 0.0,
                    "Discarded": 100_000,
                    "Get Failures": 3,
                    "Getworks": 9000,
                    "Has GBT": false,
                    "Has Stratum": true,
                    "Last Share Difficulty": 100_000.0,
                    "Last Share Time": "0:00:02",
                    "Long Poll": "N",
                    "POOL": index,
                    "Pool Rejected%": 0.0,
                    "Pool Stale%%": 0.0,
                    "Priority": 0,
                    "Proxy": "",
                    "Proxy Type": "",
                    "Quota": 1,
                    "Rejected": 100,
                    "Remote Failures": 0,
                    "Stale": 0,
                    "Status": if pool.active() { "Alive" } else { "Dead" },
                    "Stratum Active": true,
                    "Stratum URL": pool.url,
                    "URL": pool.full_url(),
                    "User": pool.user,
                })
            })
            .collect();
        let mut body = Map::new();
        body.insert(String::from("POOLS"), Value::Array(pools));
        CommandReply {
            code: 7,
            msg: format!("{} Pool(s)", backend.pools().len()),
            body,
        }
    }

    fn stats(&self, backend: &SimulatorBackend) -> CommandReply {
        let total_rate = round2(backend.total_hashrate(self.hash_unit));
        let ideal_rate = round2(
            backend
                .boards()
                .iter()
                .map(|board| board.info.ideal_hashrate.into_unit(self.hash_unit).value)
                .sum(),
        );
        let total_chips: u32 = backend.boards().iter().map(|b| u32::from(b.chips())).sum();

        let mut stats = Map::new();
        stats.insert(String::from("Calls"), json!(0));
        stats.insert(String::from("Elapsed"), json!(backend.elapsed_seconds()));
        stats.insert(String::from("GHS 5s"), json!(total_rate));
        stats.insert(String::from("GHS av"), json!(total_rate));
        stats.insert(String::from("ID"), json!("BTM_SOC0"));
        stats.insert(String::from("Max"), json!(0));
        stats.insert(String::from("Min"), json!(99_999_999));
        stats.insert(String::from("Mode"), json!(2));
        stats.insert(String::from("STATS"), json!(0));
        stats.insert(String::from("Wait"), json!(0));
        stats.insert(String::from("fan_num"), json!(backend.miner_info.fan_count));
        stats.insert(String::from("frequency"), json!(545));
        stats.insert(
            String::from("miner_count"),
            json!(backend.boards().len()),
        );
        stats.insert(String::from("miner_id"), json!("no miner id now"));
        stats.insert(String::from("miner_version"), json!(MINER_VERSION));
        stats.insert(String::from("no_matching_work"), json!(30));
        stats.insert(String::from("rate_30m"), json!(total_rate));
        stats.insert(String::from("rate_unit"), json!(self.rate_unit_label()));
        stats.insert(String::from("temp_max"), json!(0));
        stats.insert(String::from("temp_num"), json!(backend.boards().len()));
        stats.insert(String::from("total rate"), json!(total_rate));
        stats.insert(String::from("total_acn"), json!(total_chips));
        stats.insert(String::from("total_freqavg"), json!(545));
        stats.insert(String::from("total_rateideal"), json!(ideal_rate));

        for slot in 0..STATS_SLOTS {
            let fan_rpm = backend
                .fans()
                .get(slot)
                .map(|fan| fan.rpm().as_rpm().round() as u64)
                .unwrap_or(0);
            stats.insert(format!("fan{}", slot + 1), json!(fan_rpm));
        }

        for slot in 0..STATS_SLOTS {
            let n = slot + 1;
            match backend.boards().get(slot) {
                Some(board) => {
                    let board_temp = board.info.board_temperature;
                    let chip_temp = board.info.chip_temperature;
                    stats.insert(format!("chain_acn{n}"), json!(board.chips()));
                    stats.insert(format!("chain_acs{n}"), json!(chip_status(board.chips())));
                    stats.insert(format!("chain_hw{n}"), json!(10));
                    stats.insert(
                        format!("chain_rate{n}"),
                        json!(board.hashrate().into_unit(self.hash_unit).value.to_string()),
                    );
                    stats.insert(format!("freq{n}"), json!(545));
                    stats.insert(format!("temp{n}"), json!(board_temp.as_celsius()));
                    stats.insert(format!("temp2_{n}"), json!(chip_temp.as_celsius()));
                    stats.insert(format!("temp_chip{n}"), json!(sensor_string(chip_temp)));
                    stats.insert(format!("temp_pcb{n}"), json!(sensor_string(board_temp)));
                    stats.insert(format!("temp_pic{n}"), json!(sensor_string(board_temp)));
                }
                None => {
                    stats.insert(format!("chain_acn{n}"), json!(0));
                    stats.insert(format!("chain_acs{n}"), json!(""));
                    stats.insert(format!("chain_hw{n}"), json!(0));
                    stats.insert(format!("chain_rate{n}"), json!(""));
                    stats.insert(format!("freq{n}"), json!(0));
                    stats.insert(format!("temp{n}"), json!(0));
                    stats.insert(format!("temp2_{n}"), json!(0));
                    stats.insert(format!("temp_chip{n}"), json!("0-0-0-0"));
                    stats.insert(format!("temp_pcb{n}"), json!("0-0-0-0"));
                    stats.insert(format!("temp_pic{n}"), json!("0-0-0-0"));
                }
            }
        }

        let header = json!({
            "BMMiner": BMMINER_VERSION,
            "CompileTime": COMPILE_TIME,
            "Miner": MINER_VERSION,
            "Type": format!("{} {}", backend.miner_info.make, backend.miner_info.model),
        });
        let mut body = Map::new();
        body.insert(
            String::from("STATS"),
            json!([header, Value::Object(stats)]),
        );
        CommandReply {
            code: 70,
            msg: String::from("CGMiner stats"),
            body,
        }
    }

    fn summary(&self, backend: &SimulatorBackend) -> CommandReply {
        let total_rate = round2(backend.total_hashrate(self.hash_unit));
        let mut body = Map::new();
        body.insert(
            String::from("SUMMARY"),
            json!([{
                "Accepted": 1000,
                "Best Share": 1_000_000_000,
                "Device Hardware%": 1.0,
                "Device Rejected%": 0.0,
                "Difficulty Accepted": 1_000_000_000.0,
                "Difficulty Rejected": 1_000_000.0,
                "Difficulty Stale": 0.0,
                "Discarded": 100_000,
                "Elapsed": backend.elapsed_seconds(),
                "Found Blocks": 0,
                "GHS 30m": total_rate,
                "GHS 5s": total_rate,
                "GHS av": total_rate,
                "Get Failures": 3,
                "Getwork": 9000,
                "Hardware Errors": 1,
                "Last getwork": 1_000_000_000,
                "Local Work": 100_000,
                "Network Blocks": 400,
                "Pool Rejected%": 0.0,
                "Pool Stale%": 0.0,
                "Rejected": 100,
                "Remote Failures": 0,
                "Stale": 10,
                "Total MH": 10_000_000_000_000.0,
                "Utility": 10.0,
                "Work Utility": 1_000_000.0,
            }]),
        );
        CommandReply {
            code: 11,
            msg: String::from("Summary"),
            body,
        }
    }

    fn version(&self, backend: &SimulatorBackend) -> CommandReply {
        let mut body = Map::new();
        body.insert(
            String::from("VERSION"),
            json!([{
                "API": "3.1",
                "BMMiner": BMMINER_VERSION,
                "CompileTime": COMPILE_TIME,
                "Miner": MINER_VERSION,
                "Type": format!("{} {}", backend.miner_info.make, backend.miner_info.model),
            }]),
        );
        CommandReply {
            code: 22,
            msg: String::from("CGMiner versions"),
            body,
        }
    }
}

#[async_trait]
impl RpcDialect for AntminerRpcHandler {
    fn name(&self) -> &'static str {
        "antminer"
    }

    async fn handle_request(&self, request: Value) -> Value {
        let name = request
            .get("command")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let Ok(command) = AntminerCommand::from_str(name) else {
            warn!("antminer rpc: invalid command {name:?}");
            return envelope::failure(DESCRIPTION, "Invalid command");
        };

        // every key besides the command name is a named handler parameter
        let params: Map<String, Value> = request
            .as_object()
            .map(|object| {
                object
                    .iter()
                    .filter(|(key, _)| key.as_str() != "command")
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let mut backend = self.backend.lock().await;
        backend.apply_policy();
        info!("antminer rpc: {name}");
        let reply = self.dispatch(command, &backend, &params);
        envelope::success(command.envelope_style(), DESCRIPTION, reply)
    }

    fn malformed_response(&self) -> Value {
        envelope::failure(DESCRIPTION, "Invalid command")
    }
}

fn chip_status(chips: u16) -> String {
    let mut out = String::new();
    for index in 0..chips {
        if index > 0 && index % 3 == 0 {
            out.push(' ');
        }
        out.push('o');
    }
    out
}

fn sensor_string(temp: Temperature) -> String {
    vec![temp.as_celsius().to_string(); 4].join("-")
}
