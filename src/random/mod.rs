//! Random variate generation: the WELL512 generator and the distribution family.

pub mod distribution;
pub mod well512;

pub use distribution::{Distribution, JohnsonSb};
pub use well512::{RngSet, Well512};
