//! Network-facing management API emulator for cryptocurrency ASIC miners.
//!
//! Serves the TCP RPC dialects of stock Antminer and Whatsminer firmware on
//! top of a simulated hardware backend, so fleet-management tooling can be
//! developed and tested without physical machines.

pub mod backend;
pub mod data;
pub mod simulators;
