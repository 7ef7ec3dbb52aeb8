//! Texture sources, decoding, configured textures and the async batch loader.
//!
//! Everything that touches bytes lives here; shading and rendering only ever see [`texture::Texture`]
//! handles that are already decoded and configured.

/// Cancellation token and loading flag.
pub mod cancel;
/// Raster / HDR decoding and design cropping.
pub mod decode;
/// Batch loader.
pub mod loader;
/// Byte sources (filesystem, memory, session blobs).
pub mod source;
/// Immutable sampled textures.
pub mod texture;
