//! A layered mockup compositor.
//!
//! A mockup is a base photo plus an ordered stack of layers. Each layer is either a user design,
//! remapped onto the photo through a UV texture or warped onto a perspective quad, or a flat color
//! relit by the photo's own luminance. The public API is session-oriented:
//!
//! - Load and validate a [`MockupDocument`]
//! - Create a [`MockupSession`] over a [`TextureSource`]
//! - [`MockupSession::sync`] the textures, then render or [`MockupSession::export_png`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Texture sources, decoding and the async loader.
pub mod assets;
/// Persisted document model and schema.
pub mod document;
mod foundation;
/// Homography and warp meshes.
pub mod geometry;
/// Frame rendering.
pub mod render;
/// Session-oriented API.
pub mod session;
/// Shading programs.
pub mod shading;
/// Layer stack state container.
pub mod store;

pub use crate::foundation::core::{Canvas, CropRect, HexColor, NormalizedBox, Point, Rgb, Rgba};
pub use crate::foundation::error::{MockupError, MockupResult};

pub use crate::assets::cancel::CancelToken;
pub use crate::assets::loader::{LoaderOpts, TextureLoader, TextureRequest, TextureRequests};
pub use crate::assets::source::{BlobRegistry, FsSource, MemorySource, TextureSource};
pub use crate::assets::texture::{Texture, TextureStats, TextureUsage};
pub use crate::document::model::{
    GlobalSettings, Group, GroupId, Layer, LayerId, LayerKind, LayerStack,
};
pub use crate::document::schema::{MockupDocument, load_document};
pub use crate::geometry::homography::{Homography, solve_homography};
pub use crate::geometry::warp::{WarpInterpolation, WarpMesh, WarpOpts, build_warp_mesh};
pub use crate::render::renderer::{FrameRenderer, FrameStats, RenderOpts};
pub use crate::session::config::SessionOpts;
pub use crate::session::mockup_session::{LoadKey, MockupSession};
pub use crate::session::persist::{EditSink, MemoryEditSink, ShadingUpdate};
pub use crate::shading::constants::ShadingConstants;
pub use crate::store::patch::{GlobalPatch, GroupPatch, LayerPatch};
pub use crate::store::state::{MockupStore, StoreEvent};
