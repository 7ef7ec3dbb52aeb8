use std::fmt;

use crate::foundation::core::{Canvas, CropRect, HexColor, NormalizedBox, Point};
use crate::foundation::error::MockupResult;

/// Upper bound of [`Layer::shadow_intensity`].
pub const SHADOW_INTENSITY_MAX: f32 = 5.0;
/// Upper bound of [`Layer::highlight_intensity`].
pub const HIGHLIGHT_INTENSITY_MAX: f32 = 5.0;
/// Upper bound of [`Layer::noise_threshold`].
pub const NOISE_THRESHOLD_MAX: f32 = 0.1;

/// Stable layer identifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct LayerId(pub u32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Stable group identifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

/// Which shading program composites a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// User design image, UV-remapped or warped onto the product.
    Design,
    /// Flat color relit by the base photo.
    Color,
    /// The base photo itself, deepened or lifted under the mask.
    #[serde(alias = "background")]
    Shadow,
}

/// One compositing unit of the layer stack.
///
/// Only the field matching [`Layer::kind`] is active: `design` for design layers, `color` for
/// color layers.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    /// Identifier, unique within a stack.
    pub id: LayerId,
    /// Program selector.
    pub kind: LayerKind,
    /// Display label.
    pub name: String,
    /// Placement plane width in canvas pixels.
    pub width: f32,
    /// Placement plane height in canvas pixels.
    pub height: f32,
    /// Draw order; ascending, ties broken by insertion order.
    pub z_index: i32,
    /// Mask URL. The red channel gates opacity.
    pub mask: String,
    /// Uploaded design URL (design layers).
    pub design: Option<String>,
    /// Flat color (color layers).
    pub color: HexColor,
    /// Shadow strength in `0..=5`.
    pub shadow_intensity: f32,
    /// Highlight strength in `0..=5`.
    pub highlight_intensity: f32,
    /// Noise amplitude in `0..=0.1`.
    pub noise_threshold: f32,
    /// Cropper pan offset.
    pub crop: Point,
    /// Cropper zoom factor.
    pub zoom: f64,
    /// Visible design area in percent of the image.
    pub cropped_area: Option<CropRect>,
    /// Visible design area in image pixels; applied before texture upload.
    pub cropped_area_pixels: Option<CropRect>,
    /// Weak group membership.
    pub group_id: Option<GroupId>,
    /// Perspective placement of the design. `None` uses UV remapping.
    pub placement: Option<NormalizedBox>,
}

impl Layer {
    fn new(id: LayerId, kind: LayerKind, width: f32, height: f32, mask: String) -> Self {
        Self {
            id,
            kind,
            name: String::new(),
            width,
            height,
            z_index: 0,
            mask,
            design: None,
            color: HexColor::WHITE,
            shadow_intensity: 0.0,
            highlight_intensity: 0.0,
            noise_threshold: 0.0,
            crop: Point::ZERO,
            zoom: 1.0,
            cropped_area: None,
            cropped_area_pixels: None,
            group_id: None,
            placement: None,
        }
    }

    /// New design layer with no design uploaded yet.
    pub fn design(id: LayerId, width: f32, height: f32, mask: impl Into<String>) -> Self {
        Self::new(id, LayerKind::Design, width, height, mask.into())
    }

    /// New color layer (white until changed).
    pub fn color(id: LayerId, width: f32, height: f32, mask: impl Into<String>) -> Self {
        Self::new(id, LayerKind::Color, width, height, mask.into())
    }

    /// New shadow layer (no effect until its intensities are raised).
    pub fn shadow(id: LayerId, width: f32, height: f32, mask: impl Into<String>) -> Self {
        Self::new(id, LayerKind::Shadow, width, height, mask.into())
    }

    /// Builder: display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder: draw order key.
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    /// Builder: flat color.
    pub fn with_color(mut self, color: HexColor) -> Self {
        self.color = color;
        self
    }

    /// Builder: design URL.
    pub fn with_design(mut self, url: impl Into<String>) -> Self {
        self.design = Some(url.into());
        self
    }

    /// Builder: shading intensities, clamped into range.
    pub fn with_shading(mut self, shadow: f32, highlight: f32, noise: f32) -> Self {
        self.shadow_intensity = shadow;
        self.highlight_intensity = highlight;
        self.noise_threshold = noise;
        self.clamp_shading();
        self
    }

    /// Builder: perspective placement.
    pub fn with_placement(mut self, placement: NormalizedBox) -> Self {
        self.placement = Some(placement);
        self
    }

    /// Clamp shading intensities into their bounds. Non-finite values become `0`.
    pub fn clamp_shading(&mut self) {
        self.shadow_intensity = clamp_param(self.shadow_intensity, SHADOW_INTENSITY_MAX);
        self.highlight_intensity = clamp_param(self.highlight_intensity, HIGHLIGHT_INTENSITY_MAX);
        self.noise_threshold = clamp_param(self.noise_threshold, NOISE_THRESHOLD_MAX);
    }

    /// Design URL when this is a design layer.
    pub fn active_design(&self) -> Option<&str> {
        match self.kind {
            LayerKind::Design => self.design.as_deref(),
            LayerKind::Color | LayerKind::Shadow => None,
        }
    }
}

pub(crate) fn clamp_param(v: f32, max: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, max) } else { 0.0 }
}

/// Organizational bucket; no rendering effect.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Group {
    /// Identifier.
    pub id: GroupId,
    /// Display label.
    pub name: String,
}

/// Shared rendering context.
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalSettings {
    /// Base product photo URL.
    pub base: Option<String>,
    /// UV remap texture URL.
    pub uv: Option<String>,
    /// Additive brightness offset.
    pub brightness: f32,
    /// Contrast multiplier around mid-gray.
    pub contrast: f32,
    /// Multiplier on every layer's highlight strength.
    pub highlights_intensity: f32,
    /// Render target width.
    pub canvas_width: u32,
    /// Render target height.
    pub canvas_height: u32,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            base: None,
            uv: None,
            brightness: 0.0,
            contrast: 1.0,
            highlights_intensity: 1.0,
            canvas_width: 1024,
            canvas_height: 1024,
        }
    }
}

impl GlobalSettings {
    /// Render target dimensions.
    pub fn canvas(&self) -> MockupResult<Canvas> {
        Canvas::new(self.canvas_width, self.canvas_height)
    }
}

/// Layers, groups and global settings as loaded from a document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerStack {
    /// Layers in insertion order.
    pub layers: Vec<Layer>,
    /// Groups in insertion order.
    pub groups: Vec<Group>,
    /// Global settings.
    pub global: GlobalSettings,
}
