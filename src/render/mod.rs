//! CPU compositing of the layer stack.
//!
//! [`renderer::FrameRenderer`] owns one [`unit::ShadingUnit`] per layer and draws them over the
//! base photo into a premultiplied [`framebuffer::Framebuffer`].

/// Premultiplied float render target and PNG capture.
pub mod framebuffer;
pub(crate) mod raster;
/// Frame renderer and its options.
pub mod renderer;
/// Per-layer draw state.
pub mod unit;
