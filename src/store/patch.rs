use crate::document::model::{GlobalSettings, GroupId, Layer, LayerKind};
use crate::foundation::core::{CropRect, HexColor, NormalizedBox, Point};

/// Partial update of a [`Layer`]. `None` leaves a field untouched; nullable fields use a nested
/// `Option` so they can be cleared.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerPatch {
    /// New program selector.
    pub kind: Option<LayerKind>,
    /// New display label.
    pub name: Option<String>,
    /// New plane width.
    pub width: Option<f32>,
    /// New plane height.
    pub height: Option<f32>,
    /// New draw order key.
    pub z_index: Option<i32>,
    /// New mask URL.
    pub mask: Option<String>,
    /// New or cleared design URL.
    pub design: Option<Option<String>>,
    /// New flat color.
    pub color: Option<HexColor>,
    /// New shadow strength (clamped).
    pub shadow_intensity: Option<f32>,
    /// New highlight strength (clamped).
    pub highlight_intensity: Option<f32>,
    /// New noise amplitude (clamped).
    pub noise_threshold: Option<f32>,
    /// New cropper offset.
    pub crop: Option<Point>,
    /// New cropper zoom.
    pub zoom: Option<f64>,
    /// New or cleared crop area in percent.
    pub cropped_area: Option<Option<CropRect>>,
    /// New or cleared crop area in pixels.
    pub cropped_area_pixels: Option<Option<CropRect>>,
    /// New or cleared group membership.
    pub group_id: Option<Option<GroupId>>,
    /// New or cleared perspective placement.
    pub placement: Option<Option<NormalizedBox>>,
}

impl LayerPatch {
    /// Patch that only changes shading intensities.
    pub fn shading(shadow: f32, highlight: f32, noise: f32) -> Self {
        Self {
            shadow_intensity: Some(shadow),
            highlight_intensity: Some(highlight),
            noise_threshold: Some(noise),
            ..Self::default()
        }
    }

    /// Merge into `layer`. Returns whether any texture source (mask, design, crop) changed.
    pub(crate) fn apply(self, layer: &mut Layer) -> bool {
        let before = (
            layer.mask.clone(),
            layer.active_design().map(str::to_owned),
            layer.cropped_area_pixels,
        );

        if let Some(v) = self.kind {
            layer.kind = v;
        }
        if let Some(v) = self.name {
            layer.name = v;
        }
        if let Some(v) = self.width.filter(|v| v.is_finite() && *v > 0.0) {
            layer.width = v;
        }
        if let Some(v) = self.height.filter(|v| v.is_finite() && *v > 0.0) {
            layer.height = v;
        }
        if let Some(v) = self.z_index {
            layer.z_index = v;
        }
        if let Some(v) = self.mask {
            layer.mask = v;
        }
        if let Some(v) = self.design {
            layer.design = v;
        }
        if let Some(v) = self.color {
            layer.color = v;
        }
        if let Some(v) = self.shadow_intensity {
            layer.shadow_intensity = v;
        }
        if let Some(v) = self.highlight_intensity {
            layer.highlight_intensity = v;
        }
        if let Some(v) = self.noise_threshold {
            layer.noise_threshold = v;
        }
        if let Some(v) = self.crop {
            layer.crop = v;
        }
        if let Some(v) = self.zoom.filter(|z| z.is_finite() && *z > 0.0) {
            layer.zoom = v;
        }
        if let Some(v) = self.cropped_area {
            layer.cropped_area = v.filter(CropRect::is_well_formed);
        }
        if let Some(v) = self.cropped_area_pixels {
            layer.cropped_area_pixels = v.filter(CropRect::is_well_formed);
        }
        if let Some(v) = self.group_id {
            layer.group_id = v;
        }
        if let Some(v) = self.placement {
            layer.placement = v.map(|b| b.clamped());
        }
        layer.clamp_shading();

        before
            != (
                layer.mask.clone(),
                layer.active_design().map(str::to_owned),
                layer.cropped_area_pixels,
            )
    }
}

/// Partial update of a group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupPatch {
    /// New display label.
    pub name: Option<String>,
}

/// Partial update of [`GlobalSettings`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlobalPatch {
    /// New or cleared base photo URL.
    pub base: Option<Option<String>>,
    /// New or cleared UV remap URL.
    pub uv: Option<Option<String>>,
    /// New brightness offset.
    pub brightness: Option<f32>,
    /// New contrast multiplier.
    pub contrast: Option<f32>,
    /// New highlight multiplier.
    pub highlights_intensity: Option<f32>,
    /// New canvas width (ignored when zero).
    pub canvas_width: Option<u32>,
    /// New canvas height (ignored when zero).
    pub canvas_height: Option<u32>,
}

impl GlobalPatch {
    /// Merge into `global`. Returns whether the base or UV URL changed.
    pub(crate) fn apply(self, global: &mut GlobalSettings) -> bool {
        let before = (global.base.clone(), global.uv.clone());
        if let Some(v) = self.base {
            global.base = v;
        }
        if let Some(v) = self.uv {
            global.uv = v;
        }
        if let Some(v) = self.brightness.filter(|v| v.is_finite()) {
            global.brightness = v;
        }
        if let Some(v) = self.contrast.filter(|v| v.is_finite()) {
            global.contrast = v;
        }
        if let Some(v) = self.highlights_intensity.filter(|v| v.is_finite()) {
            global.highlights_intensity = v;
        }
        if let Some(v) = self.canvas_width.filter(|v| *v > 0) {
            global.canvas_width = v;
        }
        if let Some(v) = self.canvas_height.filter(|v| *v > 0) {
            global.canvas_height = v;
        }
        before != (global.base.clone(), global.uv.clone())
    }
}
