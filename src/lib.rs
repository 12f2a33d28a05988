//! Monte Carlo availability simulator for a power-cycle block.
//!
//! Components fail according to per-mode life distributions, are repaired
//! under their repair policies and are taken down for planned maintenance,
//! all while the plant follows a dispatch schedule. Many independent
//! scenarios are run and averaged into capacity, efficiency and repair
//! labor figures.

pub mod components;
/// TOML scenario files and presets.
pub mod config;
pub mod error;
pub mod io;
/// Seeded random streams and failure/repair distributions.
pub mod random;
/// Dispatch loop, scenario orchestration and aggregation.
pub mod sim;
