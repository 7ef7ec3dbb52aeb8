//! Session-oriented API: one live [`mockup_session::MockupSession`] per edited mockup.

/// Session options and environment overrides.
pub mod config;
/// Store, renderer and texture loads wired together.
pub mod mockup_session;
/// Persisting shading edits.
pub mod persist;
