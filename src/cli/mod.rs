//! CLI command handlers

pub mod commands;

pub use commands::{expand, inspect, run, sync};
