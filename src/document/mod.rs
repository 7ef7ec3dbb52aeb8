//! Layer-stack data model and the persisted-document boundary.

/// Layers, groups and global settings.
pub mod model;
/// Versioned JSON schema, validation and repair.
pub mod schema;
