//! File formats: dispatch import, telemetry and failure-log export,
//! checkpoint persistence.

pub mod checkpoint;
pub mod dispatch;
pub mod export;
