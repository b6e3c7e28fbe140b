use std::env;
use std::sync::Arc;

use tokio::sync::Mutex;

use asic_sim::backend::SimulatorBackend;
use asic_sim::data::device::models::{AntminerModel, WhatsminerModel};
use asic_sim::simulators::antminer::AntminerRpcHandler;
use asic_sim::simulators::whatsminer::WhatsminerRpcHandler;
use asic_sim::simulators::RpcServer;

#[tokio::main]
async fn main() {
    env_logger::init();

    // both dialects share the management port, so one process simulates one
    // device family at a time
    let dialect = env::args().nth(1).unwrap_or_else(|| String::from("antminer"));
    let result = match dialect.as_str() {
        "whatsminer" => {
            let backend = Arc::new(Mutex::new(SimulatorBackend::new(
                WhatsminerModel::M30SVG10.miner_info(),
            )));
            match WhatsminerRpcHandler::new(backend) {
                Ok(handler) => RpcServer::new(handler).run().await,
                Err(err) => {
                    eprintln!("could not derive auth material: {err}");
                    return;
                }
            }
        }
        "antminer" => {
            let backend = Arc::new(Mutex::new(SimulatorBackend::new(
                AntminerModel::S19jPro.miner_info(),
            )));
            RpcServer::new(AntminerRpcHandler::new(backend)).run().await
        }
        other => {
            eprintln!("unknown dialect {other:?}, expected antminer or whatsminer");
            return;
        }
    };

    if let Err(err) = result {
        eprintln!("rpc server error: {err}");
    }
}
