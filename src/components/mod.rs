//! Power-block equipment: failure modes, repairable components and the
//! default equipment catalog.

pub mod catalog;
pub mod component;
pub mod failure;

pub use catalog::{Topology, build_components, parse_component_table};
pub use component::{
    Component, ComponentKind, ComponentSpec, ComponentStatus, EventContext, RepairPolicy,
};
pub use failure::{FailureMode, FailureType, OperatingMode};
