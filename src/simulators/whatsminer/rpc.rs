use std::str::FromStr;

use async_trait::async_trait;
use log::{info, warn};
use serde_json::{json, Map, Value};
use strum::{AsRefStr, EnumIter, EnumString};

use crate::backend::{unix_timestamp, SharedBackend, SimulatorBackend};
use crate::data::hashrate::HashRateUnit;
use crate::simulators::envelope::{self, CommandReply, EnvelopeStyle};
use crate::simulators::round2;
use crate::simulators::server::RpcDialect;

use super::crypto::{AuthSecrets, CryptoError};

/// Password the device family ships with; the handshake digests derive from it.
const ADMIN_PASSWORD: &str = "admin";
const API_DESCRIPTION: &str = "whatsminer v1.4";
const CGMINER_DESCRIPTION: &str = "cgminer 4.9.2";
const FIRMWARE_VERSION: &str = "20230925.13.REL";

/// Epoch the fake chain height counts ten-minute blocks from.
const CHAIN_EPOCH: u64 = 0x29AB_5F49;

/// Commands understood by the Whatsminer management API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum WhatsminerCommand {
    GetToken,
    GetVersion,
    Devdetails,
    Devs,
    Edevs,
    GetPsu,
    Pools,
}

impl WhatsminerCommand {
    /// `get_`-prefixed commands render the flat `Msg` envelope; everything
    /// else uses the status-array shape. Kept as an explicit table rather
    /// than a prefix test at dispatch time.
    pub fn envelope_style(&self) -> EnvelopeStyle {
        match self {
            WhatsminerCommand::GetToken
            | WhatsminerCommand::GetVersion
            | WhatsminerCommand::GetPsu => EnvelopeStyle::FlatMsg,
            WhatsminerCommand::Devdetails
            | WhatsminerCommand::Devs
            | WhatsminerCommand::Edevs
            | WhatsminerCommand::Pools => EnvelopeStyle::StatusArray,
        }
    }

    fn description(&self) -> &'static str {
        match self.envelope_style() {
            EnvelopeStyle::FlatMsg => API_DESCRIPTION,
            EnvelopeStyle::StatusArray => CGMINER_DESCRIPTION,
        }
    }
}

/// Encrypted dialect: a salt-based handshake, MD5-crypt token validation,
/// and AES-ECB payloads over the same one-shot TCP exchange as the plain
/// dialect. Failure envelopes always go out unencrypted.
pub struct WhatsminerRpcHandler {
    backend: SharedBackend,
    hash_unit: HashRateUnit,
    secrets: AuthSecrets,
}

impl WhatsminerRpcHandler {
    pub fn new(backend: SharedBackend) -> Result<Self, CryptoError> {
        Ok(Self::with_secrets(
            backend,
            AuthSecrets::generate(ADMIN_PASSWORD)?,
        ))
    }

    pub fn with_secrets(backend: SharedBackend, secrets: AuthSecrets) -> Self {
        WhatsminerRpcHandler {
            backend,
            hash_unit: HashRateUnit::MegaHash,
            secrets,
        }
    }

    async fn handle_plain(&self, name: &str) -> Value {
        let Ok(command) = WhatsminerCommand::from_str(name) else {
            warn!("whatsminer rpc: invalid command {name:?}");
            return envelope::failure(API_DESCRIPTION, "invalid cmd");
        };
        info!("whatsminer rpc: {name}");
        self.dispatch_success(command).await
    }

    async fn handle_encrypted(&self, ciphertext: &str) -> Value {
        let inner = match self
            .secrets
            .decrypt(ciphertext)
            .ok()
            .and_then(|plaintext| serde_json::from_str::<Value>(&plaintext).ok())
        {
            Some(inner) => inner,
            None => {
                warn!("whatsminer rpc: encrypted payload did not decode");
                return envelope::failure(API_DESCRIPTION, "Invalid data");
            }
        };

        let token = inner.get("token").and_then(Value::as_str).unwrap_or_default();
        if token != self.secrets.host_sign() {
            warn!("whatsminer rpc: token check failed");
            return envelope::failure(API_DESCRIPTION, "Invalid token");
        }

        let name = inner.get("cmd").and_then(Value::as_str).unwrap_or_default();
        let Ok(command) = WhatsminerCommand::from_str(name) else {
            warn!("whatsminer rpc: invalid command {name:?}");
            return envelope::failure(API_DESCRIPTION, "invalid cmd");
        };
        info!("whatsminer rpc: {name}");
        let response = self.dispatch_success(command).await;
        json!({ "enc": self.secrets.encrypt(&response.to_string()) })
    }

    async fn dispatch_success(&self, command: WhatsminerCommand) -> Value {
        let mut backend = self.backend.lock().await;
        backend.apply_policy();
        let reply = match command {
            WhatsminerCommand::GetToken => self.get_token(),
            WhatsminerCommand::GetVersion => self.get_version(),
            WhatsminerCommand::Devdetails => self.devdetails(&backend),
            WhatsminerCommand::Devs | WhatsminerCommand::Edevs => self.devs(&backend),
            WhatsminerCommand::GetPsu => self.get_psu(),
            WhatsminerCommand::Pools => self.pools(&backend),
        };
        envelope::success(command.envelope_style(), command.description(), reply)
    }

    fn get_token(&self) -> CommandReply {
        let mut body = Map::new();
        body.insert(String::from("time"), json!(self.secrets.salt_time()));
        body.insert(String::from("salt"), json!(self.secrets.salt()));
        body.insert(String::from("newsalt"), json!(self.secrets.newsalt()));
        CommandReply {
            code: 134,
            msg: String::new(),
            body,
        }
    }

    fn get_version(&self) -> CommandReply {
        let mut body = Map::new();
        body.insert(String::from("api_ver"), json!(API_DESCRIPTION));
        body.insert(String::from("fw_ver"), json!(FIRMWARE_VERSION));
        CommandReply {
            code: 131,
            msg: String::new(),
            body,
        }
    }

    fn devdetails(&self, backend: &SimulatorBackend) -> CommandReply {
        let details: Vec<Value> = backend
            .boards()
            .iter()
            .enumerate()
            .map(|(index, _)| {
                json!({
                    "DEVDETAILS": index,
                    "Name": "SM",
                    "ID": index,
                    "Driver": "bitmicro",
                    "Kernel": "",
                    "Model": backend.miner_info.model,
                })
            })
            .collect();
        let mut body = Map::new();
        body.insert(String::from("DEVDETAILS"), Value::Array(details));
        CommandReply {
            code: 69,
            msg: String::from("Device Details"),
            body,
        }
    }

    fn devs(&self, backend: &SimulatorBackend) -> CommandReply {
        let now = unix_timestamp();
        let fan_in = backend
            .fans()
            .first()
            .map(|fan| fan.rpm().as_rpm().round() as u64)
            .unwrap_or(0);
        let fan_out = backend
            .fans()
            .get(1)
            .map(|fan| fan.rpm().as_rpm().round() as u64)
            .unwrap_or(0);
        let devs: Vec<Value> = backend
            .boards()
            .iter()
            .enumerate()
            .map(|(index, board)| {
                let nameplate_rate =
                    round2(board.info.hashrate.into_unit(self.hash_unit).value);
                let chip_temp = board.info.chip_temperature.as_celsius();
                json!({
                    "ASC": index,
                    "Name": "SM",
                    "ID": index,
                    "Slot": index,
                    "Enabled": "Y",
                    "Status": if board.hashrate().value > 0.0 { "Alive" } else { "Dead" },
                    "Temperature": board.info.board_temperature.as_celsius(),
                    "Chip Frequency": 734,
                    "Fan Speed In": fan_in,
                    "Fan Speed Out": fan_out,
                    "MHS av": nameplate_rate,
                    "MHS 5s": nameplate_rate,
                    "MHS 1m": nameplate_rate,
                    "MHS 5m": nameplate_rate,
                    "MHS 15m": nameplate_rate,
                    "Accepted": 10000,
                    "Rejected": 100,
                    "Hardware Errors": 100,
                    "Utility": 1.0,
                    "Last Share Pool": 0,
                    "Last Share Time": now - 10,
                    "Total MH": 1_000_000_000_000.0,
                    "Diff1 Work": 1_000_000,
                    "Difficulty Accepted": 100_000_000.0,
                    "Difficulty Rejected": 100_000.0,
                    "Last Share Difficulty": 100_000.0,
                    "Last Valid Work": now - 16,
                    "Device Hardware%": 0.01,
                    "Device Rejected%": 1.0,
                    "Device Elapsed": backend.elapsed_seconds(),
                    "Upfreq Complete": 1,
                    "Effective Chips": board.chips(),
                    "PCB SN": format!("FAKE12AB34CD56EF78{index}"),
                    "Chip Temp Min": chip_temp,
                    "Chip Temp Max": chip_temp,
                    "Chip Temp Avg": chip_temp,
                })
            })
            .collect();
        let mut body = Map::new();
        body.insert(String::from("DEVS"), Value::Array(devs));
        CommandReply {
            code: 69,
            msg: format!("{} ASC(s)", backend.boards().len()),
            body,
        }
    }

    fn get_psu(&self) -> CommandReply {
        let mut body = Map::new();
        body.insert(String::from("name"), json!("P21"));
        body.insert(String::from("hw_version"), json!(""));
        body.insert(String::from("model"), json!("P21-12-3600-E"));
        body.insert(String::from("sw_version"), json!("092523.009"));
        CommandReply {
            code: 131,
            msg: String::new(),
            body,
        }
    }

    fn pools(&self, backend: &SimulatorBackend) -> CommandReply {
        let now = unix_timestamp();
        let pools: Vec<Value> = backend
            .pools()
            .iter()
            .enumerate()
            .map(|(index, pool)| {
                json!({
                    "POOL": index,
                    "URL": pool.full_url(),
                    "Status": if pool.active() { "Alive" } else { "Dead" },
                    "Priority": 0,
                    "Quota": 1,
                    "Long Poll": "N",
                    "Getworks": 9000,
                    "Accepted": 10000,
                    "Rejected": 100,
                    "Works": 1_000_000_000,
                    "Discarded": 100_000,
                    "Stale": 0,
                    "Get Failures": 3,
                    "Remote Failures": 0,
                    "User": pool.user,
                    "Last Share Time": now - 2,
                    "Diff1 Shares": 0,
                    "Proxy Type": "",
                    "Proxy": "",
                    "Difficulty Accepted": 1_000_000_000.0,
                    "Difficulty Rejected": 1_000_000.0,
                    "Difficulty Stale": 0.0,
                    "Last Share Difficulty": 100_000.0,
                    "Work Difficulty": 0.0,
                    "Has Stratum": true,
                    "Stratum Active": true,
                    "Stratum URL": pool.url,
                    "Stratum Difficulty": 100_000.0,
                    "Has GBT": false,
                    "Best Share": 10_000_000_000u64,
                    "Pool Rejected%": 0.0,
                    "Pool Stale%": 0.0,
                    "Bad Work": 0,
                    "Current Block Height": now.saturating_sub(CHAIN_EPOCH) / 1200,
                    "Current Block Version": 536_870_912,
                })
            })
            .collect();
        let mut body = Map::new();
        body.insert(String::from("POOLS"), Value::Array(pools));
        CommandReply {
            code: 69,
            msg: format!("{} Pool(s)", backend.pools().len()),
            body,
        }
    }
}

#[async_trait]
impl RpcDialect for WhatsminerRpcHandler {
    fn name(&self) -> &'static str {
        "whatsminer"
    }

    async fn handle_request(&self, request: Value) -> Value {
        if request.get("enc").is_some() {
            // the device family sends {"enc": 1, "data": <base64>}; some
            // clients put the ciphertext under "enc" directly
            let ciphertext = request
                .get("data")
                .and_then(Value::as_str)
                .or_else(|| request.get("enc").and_then(Value::as_str));
            match ciphertext {
                Some(ciphertext) => self.handle_encrypted(ciphertext).await,
                None => envelope::failure(API_DESCRIPTION, "Invalid data"),
            }
        } else {
            let name = request
                .get("command")
                .and_then(Value::as_str)
                .unwrap_or_default();
            self.handle_plain(name).await
        }
    }

    fn malformed_response(&self) -> Value {
        envelope::failure(API_DESCRIPTION, "invalid cmd")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimulatorBackend;
    use crate::data::device::models::WhatsminerModel;
    use crate::simulators::whatsminer::crypto::{
        aes_ecb_encrypt, derive_aes_key, md5_crypt_hash,
    };
    use std::sync::Arc;
    use strum::IntoEnumIterator;
    use tokio::sync::Mutex;

    fn fixed_secrets() -> AuthSecrets {
        AuthSecrets::with_material(
            ADMIN_PASSWORD,
            String::from("aabbccdd00112233"),
            String::from("445566778899aabb"),
            String::from("1700000000.12"),
        )
        .expect("fixed auth material")
    }

    fn handler() -> WhatsminerRpcHandler {
        let backend = Arc::new(Mutex::new(SimulatorBackend::new(
            WhatsminerModel::M30SVG10.miner_info(),
        )));
        WhatsminerRpcHandler::with_secrets(backend, fixed_secrets())
    }

    /// The derivation a real client performs from the get_token reply.
    fn client_token_and_key(salt: &str, newsalt: &str, salt_time: &str) -> (String, [u8; 32]) {
        let md5_pwd = md5_crypt_hash(ADMIN_PASSWORD, salt).expect("client digest");
        let token = md5_crypt_hash(&format!("{md5_pwd}{salt_time}"), newsalt).expect("token");
        (token, derive_aes_key(&md5_pwd))
    }

    #[test]
    fn envelope_style_follows_the_get_prefix() {
        for command in WhatsminerCommand::iter() {
            let expected = if command.as_ref().starts_with("get_") {
                EnvelopeStyle::FlatMsg
            } else {
                EnvelopeStyle::StatusArray
            };
            assert_eq!(command.envelope_style(), expected, "{command:?}");
        }
    }

    #[tokio::test]
    async fn get_token_hands_out_the_handshake_material() {
        let handler = handler();
        let response = handler
            .handle_request(json!({"command": "get_token"}))
            .await;
        assert_eq!(response["STATUS"], "S");
        assert_eq!(response["Code"], 134);
        assert_eq!(response["Msg"]["salt"], "aabbccdd00112233");
        assert_eq!(response["Msg"]["newsalt"], "445566778899aabb");
        assert_eq!(response["Msg"]["time"], "1700000000.12");
        assert_eq!(response["Description"], API_DESCRIPTION);
    }

    #[tokio::test]
    async fn handshake_round_trip_reaches_the_psu() {
        let handler = handler();
        let token_reply = handler
            .handle_request(json!({"command": "get_token"}))
            .await;
        let msg = &token_reply["Msg"];
        let (token, key) = client_token_and_key(
            msg["salt"].as_str().unwrap(),
            msg["newsalt"].as_str().unwrap(),
            msg["time"].as_str().unwrap(),
        );

        let inner = json!({"cmd": "get_psu", "token": token}).to_string();
        let request = json!({"enc": 1, "data": aes_ecb_encrypt(&key, &inner)});
        let response = handler.handle_request(request).await;

        let ciphertext = response["enc"].as_str().expect("encrypted success");
        let plaintext = handler.secrets.decrypt(ciphertext).unwrap();
        let envelope: Value = serde_json::from_str(&plaintext).unwrap();
        assert_eq!(envelope["STATUS"], "S");
        assert_eq!(envelope["Code"], 131);
        assert_eq!(envelope["Msg"]["model"], "P21-12-3600-E");
    }

    #[tokio::test]
    async fn ciphertext_directly_under_enc_also_works() {
        let handler = handler();
        let (token, key) = client_token_and_key(
            handler.secrets.salt(),
            handler.secrets.newsalt(),
            handler.secrets.salt_time(),
        );
        let inner = json!({"cmd": "get_version", "token": token}).to_string();
        let response = handler
            .handle_request(json!({"enc": aes_ecb_encrypt(&key, &inner)}))
            .await;
        let plaintext = handler
            .secrets
            .decrypt(response["enc"].as_str().unwrap())
            .unwrap();
        let envelope: Value = serde_json::from_str(&plaintext).unwrap();
        assert_eq!(envelope["Msg"]["fw_ver"], FIRMWARE_VERSION);
    }

    #[tokio::test]
    async fn bad_token_is_refused_in_the_clear() {
        let handler = handler();
        let (_, key) = client_token_and_key(
            handler.secrets.salt(),
            handler.secrets.newsalt(),
            handler.secrets.salt_time(),
        );
        let inner = json!({"cmd": "get_psu", "token": "wrong"}).to_string();
        let response = handler
            .handle_request(json!({"enc": 1, "data": aes_ecb_encrypt(&key, &inner)}))
            .await;
        assert!(response.get("enc").is_none());
        assert_eq!(response["STATUS"][0]["STATUS"], "E");
        assert_eq!(response["STATUS"][0]["Msg"], "Invalid token");
    }

    #[tokio::test]
    async fn undecodable_payload_is_refused_in_the_clear() {
        let handler = handler();
        let response = handler
            .handle_request(json!({"enc": 1, "data": "definitely not ciphertext"}))
            .await;
        assert_eq!(response["STATUS"][0]["Msg"], "Invalid data");
    }

    #[tokio::test]
    async fn unknown_command_fails_with_code_14() {
        let handler = handler();
        let response = handler.handle_request(json!({"command": "reboot"})).await;
        assert_eq!(response["STATUS"][0]["Code"], 14);
        assert_eq!(response["STATUS"][0]["Msg"], "invalid cmd");
    }

    #[tokio::test]
    async fn devs_uses_the_array_envelope_and_runtime_state() {
        let handler = handler();
        let response = handler.handle_request(json!({"command": "devs"})).await;
        assert_eq!(response["STATUS"][0]["Description"], CGMINER_DESCRIPTION);
        let devs = response["DEVS"].as_array().unwrap();
        assert_eq!(devs.len(), 3);
        assert_eq!(devs[0]["Effective Chips"], 66);
        assert_eq!(devs[0]["Status"], "Alive");
        // automatic fan policy pins both fans to max
        assert_eq!(devs[0]["Fan Speed In"], 6000);
        assert_eq!(devs[0]["Fan Speed Out"], 6000);
        // 28 TH/s nameplate rendered in MH/s
        assert_eq!(devs[0]["MHS av"], 28_000_000.0);
    }

    #[tokio::test]
    async fn edevs_is_an_alias_for_devs() {
        let handler = handler();
        let devs = handler.handle_request(json!({"command": "devs"})).await;
        let edevs = handler.handle_request(json!({"command": "edevs"})).await;
        assert_eq!(
            devs["DEVS"].as_array().unwrap().len(),
            edevs["DEVS"].as_array().unwrap().len()
        );
        assert_eq!(edevs["STATUS"][0]["Code"], 69);
    }

    #[tokio::test]
    async fn stopping_mining_marks_boards_dead() {
        let handler = handler();
        handler.backend.lock().await.set_mining_enabled(false);
        let response = handler.handle_request(json!({"command": "devs"})).await;
        assert_eq!(response["DEVS"][0]["Status"], "Dead");
        // chips stay visible while the boards idle
        assert_eq!(response["DEVS"][0]["Effective Chips"], 66);
    }

    #[tokio::test]
    async fn pools_reports_block_height_and_slots() {
        let handler = handler();
        let response = handler.handle_request(json!({"command": "pools"})).await;
        let pools = response["POOLS"].as_array().unwrap();
        assert_eq!(pools.len(), 3);
        assert!(pools[0]["Current Block Height"].as_u64().unwrap() > 800_000);
        assert_eq!(pools[0]["Status"], "Alive");
    }
}
