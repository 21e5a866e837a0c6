//! Everything that drives the pipeline: configuration, the background
//! poller, frame analysis and the key bindings.
//!
//! This module provides:
//! - config.json loading (`init_config`, `get_config`)
//! - The single-slot background repeater (`PollingScheduler`)
//! - Window watching and frame analysis (`Companion`)
//! - The analysis summary text

pub mod companion;
pub mod config;
pub mod poller;
pub mod report;

pub use companion::{register_bindings, Companion, NOT_WATCHING};
pub use config::{get_config, init_config};
pub use poller::PollingScheduler;
