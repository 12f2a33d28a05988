/// Capacity and efficiency aggregation.
pub mod capacity;
/// Simulation clock for timestep management.
pub mod clock;
pub mod engine;
/// Failure and maintenance events.
pub mod event;
pub mod kpi;
pub mod metrics;
pub mod orchestrator;
/// Dispatch schedules.
pub mod schedule;
pub mod types;
