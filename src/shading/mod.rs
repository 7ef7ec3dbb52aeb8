//! Per-fragment shading programs for the layer stack.
//!
//! Programs are described by a static uniform schema and compiled once per
//! [`program::ProgramRegistry`]; changing a layer's parameters only rewrites uniform values.

/// Base photo pass.
pub mod background;
/// Relit flat-color layers.
pub mod color;
/// Tunable constants.
pub mod constants;
/// User design layers.
pub mod design;
/// Program trait, uniforms, fragments and the registry.
pub mod program;
pub(crate) mod relit;
/// Shadow layers: the photo relit by itself.
pub mod shadow;
