//! Simulation of multi-tier service chain placement across geographically
//! distributed edge datacenters.
//!
//! A service chain is an ordered group of VMs (a user-anchor plus dependents)
//! deployed as one logical application. Each chain is driven by a per-request
//! state machine that places its VMs onto datacenter hosts using one of three
//! interchangeable strategies, reacting to asynchronous acknowledgements from
//! the simulated world.

pub mod core;
pub mod extensions;
pub mod simulation;

use std::io::Write;

/// Initializes env_logger with a terse single-line format.
pub fn init_logger() {
    let _ = env_logger::Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .try_init();
}
