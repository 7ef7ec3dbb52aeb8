//! Shared primitives: value types, errors and scalar math.

pub mod core;
pub mod error;
pub(crate) mod math;
