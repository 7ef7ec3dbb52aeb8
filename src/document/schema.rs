//! Versioned persisted-document boundary.
//!
//! Raw JSON is parsed into permissive `*Def` structs, then validated and repaired in one pass.
//! Structural problems (unknown version, duplicate ids, missing masks) are collected as
//! [`SchemaErrors`]; recoverable problems (out-of-range intensities, malformed crop state) are
//! fixed in place and reported as repairs.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::model::{
    GlobalSettings, Group, GroupId, HIGHLIGHT_INTENSITY_MAX, Layer, LayerId, LayerKind, LayerStack,
    NOISE_THRESHOLD_MAX, SHADOW_INTENSITY_MAX,
};
use crate::foundation::core::{CropRect, HexColor, NormalizedBox, Point};
use crate::foundation::error::{MockupError, MockupResult};

/// Current document schema version.
pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DocumentDef {
    #[serde(default)]
    pub(crate) version: Option<u32>,
    #[serde(default)]
    pub(crate) base_url: Option<String>,
    #[serde(default)]
    pub(crate) layers: Vec<LayerDef>,
    #[serde(default)]
    pub(crate) groups: Vec<GroupDef>,
    #[serde(default)]
    pub(crate) global: GlobalDef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LayerDef {
    pub(crate) id: u32,
    #[serde(rename = "type")]
    pub(crate) kind: LayerKind,
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) width: Option<f32>,
    #[serde(default)]
    pub(crate) height: Option<f32>,
    #[serde(default)]
    pub(crate) z_index: Option<i32>,
    #[serde(default)]
    pub(crate) mask: Option<String>,
    #[serde(default)]
    pub(crate) design: Option<String>,
    #[serde(default)]
    pub(crate) color: Option<String>,
    #[serde(default)]
    pub(crate) shadow_intensity: Option<f32>,
    #[serde(default)]
    pub(crate) highlight_intensity: Option<f32>,
    #[serde(default)]
    pub(crate) noise_threshold: Option<f32>,
    #[serde(default)]
    pub(crate) crop: Option<Point>,
    #[serde(default)]
    pub(crate) zoom: Option<f64>,
    #[serde(default)]
    pub(crate) cropped_area: Option<CropRect>,
    #[serde(default)]
    pub(crate) cropped_area_pixels: Option<CropRect>,
    #[serde(default)]
    pub(crate) group_id: Option<u32>,
    #[serde(default)]
    pub(crate) placement: Option<NormalizedBox>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GroupDef {
    pub(crate) id: u32,
    #[serde(default)]
    pub(crate) name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GlobalDef {
    #[serde(default)]
    pub(crate) base: Option<String>,
    #[serde(default)]
    pub(crate) uv: Option<String>,
    #[serde(default)]
    pub(crate) brightness: Option<f32>,
    #[serde(default)]
    pub(crate) contrast: Option<f32>,
    #[serde(default)]
    pub(crate) highlights_intensity: Option<f32>,
    #[serde(default)]
    pub(crate) canvas_width: Option<u32>,
    #[serde(default)]
    pub(crate) canvas_height: Option<u32>,
}

/// One step of a JSON path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaPathElem {
    /// Object field.
    Field(&'static str),
    /// Array index.
    Index(usize),
}

/// Problem found at a JSON path (`$.layers[2].zoom`).
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    /// Location inside the document.
    pub path: Vec<SchemaPathElem>,
    /// Human-readable description.
    pub message: String,
}

impl SchemaError {
    fn at(path: &[SchemaPathElem], message: impl Into<String>) -> Self {
        Self {
            path: path.to_vec(),
            message: message.into(),
        }
    }

    /// `$`-rooted path string.
    pub fn path_string(&self) -> String {
        format_path(&self.path)
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return write!(f, "{}", self.message);
        }
        write!(f, "{}: {}", format_path(&self.path), self.message)
    }
}

fn format_path(path: &[SchemaPathElem]) -> String {
    let mut s = String::from("$");
    for p in path {
        match *p {
            SchemaPathElem::Field(name) => {
                s.push('.');
                s.push_str(name);
            }
            SchemaPathElem::Index(i) => {
                s.push('[');
                s.push_str(&i.to_string());
                s.push(']');
            }
        }
    }
    s
}

/// Every structural error of a rejected document.
#[derive(Debug, Clone)]
pub struct SchemaErrors {
    /// Errors in document order.
    pub errors: Vec<SchemaError>,
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaErrors {}

/// A validated layer-stack document with asset URLs resolved.
#[derive(Clone, Debug)]
pub struct MockupDocument {
    /// Base URL relative asset paths were resolved against.
    pub base_url: Option<url::Url>,
    /// Layers, groups and global settings.
    pub stack: LayerStack,
    /// Fixes applied while loading.
    pub repairs: Vec<SchemaError>,
}

impl MockupDocument {
    /// Parse and validate a document from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> MockupResult<Self> {
        let def: DocumentDef = serde_json::from_reader(r)
            .map_err(|e| MockupError::serde(format!("parse mockup document JSON: {e}")))?;
        build_document(def)
    }

    /// Parse and validate a document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> MockupResult<Self> {
        let path = path.as_ref();
        let f = std::fs::File::open(path).map_err(|e| {
            MockupError::validation(format!("open mockup document '{}': {e}", path.display()))
        })?;
        Self::from_reader(std::io::BufReader::new(f))
    }
}

/// Parse, validate and repair a document from a JSON string.
#[tracing::instrument(skip_all, fields(bytes = json.len()))]
pub fn load_document(json: &str) -> MockupResult<MockupDocument> {
    let def: DocumentDef = serde_json::from_str(json)
        .map_err(|e| MockupError::serde(format!("parse mockup document JSON: {e}")))?;
    build_document(def)
}

fn build_document(def: DocumentDef) -> MockupResult<MockupDocument> {
    let doc = validate_document(def)
        .map_err(|e| MockupError::validation(format!("mockup document rejected:\n{e}")))?;
    for repair in &doc.repairs {
        tracing::warn!(%repair, "repaired document field");
    }
    tracing::debug!(
        layers = doc.stack.layers.len(),
        groups = doc.stack.groups.len(),
        "document loaded"
    );
    Ok(doc)
}

pub(crate) fn validate_document(def: DocumentDef) -> Result<MockupDocument, SchemaErrors> {
    let mut errors = Vec::new();
    let mut repairs = Vec::new();

    match def.version {
        Some(DOCUMENT_VERSION) => {}
        Some(v) => errors.push(SchemaError::at(
            &[SchemaPathElem::Field("version")],
            format!("unsupported version {v}; expected {DOCUMENT_VERSION}"),
        )),
        None => repairs.push(SchemaError::at(
            &[SchemaPathElem::Field("version")],
            format!("missing version; assuming {DOCUMENT_VERSION}"),
        )),
    }

    let base_url = match def.base_url.as_deref() {
        None => None,
        Some(raw) => match url::Url::parse(raw) {
            Ok(u) if !u.cannot_be_a_base() => Some(u),
            _ => {
                errors.push(SchemaError::at(
                    &[SchemaPathElem::Field("baseUrl")],
                    format!("'{raw}' is not an absolute base URL"),
                ));
                None
            }
        },
    };

    let global = build_global(def.global, base_url.as_ref(), &mut errors, &mut repairs);

    let mut groups = Vec::with_capacity(def.groups.len());
    let mut group_ids = HashSet::new();
    for (i, g) in def.groups.into_iter().enumerate() {
        if !group_ids.insert(g.id) {
            errors.push(SchemaError::at(
                &[
                    SchemaPathElem::Field("groups"),
                    SchemaPathElem::Index(i),
                    SchemaPathElem::Field("id"),
                ],
                format!("duplicate group id {}", g.id),
            ));
            continue;
        }
        groups.push(Group {
            id: GroupId(g.id),
            name: g.name,
        });
    }

    let mut layers = Vec::with_capacity(def.layers.len());
    let mut layer_ids = HashSet::new();
    for (i, l) in def.layers.into_iter().enumerate() {
        let path = [SchemaPathElem::Field("layers"), SchemaPathElem::Index(i)];
        if !layer_ids.insert(l.id) {
            errors.push(SchemaError::at(
                &[path.as_slice(), &[SchemaPathElem::Field("id")]].concat(),
                format!("duplicate layer id {}", l.id),
            ));
            continue;
        }
        if let Some(layer) = build_layer(
            l,
            &path,
            &global,
            base_url.as_ref(),
            &mut errors,
            &mut repairs,
        ) {
            layers.push(layer);
        }
    }

    if !errors.is_empty() {
        return Err(SchemaErrors { errors });
    }
    Ok(MockupDocument {
        base_url,
        stack: LayerStack {
            layers,
            groups,
            global,
        },
        repairs,
    })
}

fn build_global(
    def: GlobalDef,
    base_url: Option<&url::Url>,
    errors: &mut Vec<SchemaError>,
    repairs: &mut Vec<SchemaError>,
) -> GlobalSettings {
    let defaults = GlobalSettings::default();
    let field = |name| [SchemaPathElem::Field("global"), SchemaPathElem::Field(name)];

    let mut resolve = |name, raw: Option<String>| {
        raw.and_then(|r| match resolve_asset_url(base_url, &r) {
            Ok(u) => Some(u),
            Err(msg) => {
                errors.push(SchemaError::at(&field(name), msg));
                None
            }
        })
    };
    let base = resolve("base", def.base);
    let uv = resolve("uv", def.uv);

    let mut finite_or = |name, v: Option<f32>, default: f32| match v {
        Some(v) if v.is_finite() => v,
        Some(v) => {
            repairs.push(SchemaError::at(
                &field(name),
                format!("non-finite value {v}; using {default}"),
            ));
            default
        }
        None => default,
    };
    let brightness = finite_or("brightness", def.brightness, defaults.brightness);
    let contrast = finite_or("contrast", def.contrast, defaults.contrast);
    let highlights_intensity = finite_or(
        "highlightsIntensity",
        def.highlights_intensity,
        defaults.highlights_intensity,
    );

    let canvas_width = def.canvas_width.unwrap_or(defaults.canvas_width);
    let canvas_height = def.canvas_height.unwrap_or(defaults.canvas_height);
    if canvas_width == 0 {
        errors.push(SchemaError::at(&field("canvasWidth"), "must be > 0"));
    }
    if canvas_height == 0 {
        errors.push(SchemaError::at(&field("canvasHeight"), "must be > 0"));
    }

    GlobalSettings {
        base,
        uv,
        brightness,
        contrast,
        highlights_intensity,
        canvas_width,
        canvas_height,
    }
}

fn build_layer(
    def: LayerDef,
    path: &[SchemaPathElem],
    global: &GlobalSettings,
    base_url: Option<&url::Url>,
    errors: &mut Vec<SchemaError>,
    repairs: &mut Vec<SchemaError>,
) -> Option<Layer> {
    let at = |name| [path, &[SchemaPathElem::Field(name)]].concat();
    let error_count = errors.len();

    let mask = match def.mask.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push(SchemaError::at(&at("mask"), "layer requires a mask"));
            String::new()
        }
        Some(raw) => resolve_asset_url(base_url, raw).unwrap_or_else(|msg| {
            errors.push(SchemaError::at(&at("mask"), msg));
            String::new()
        }),
    };

    let mut dimension = |name, v: Option<f32>, fallback: u32| match v {
        None => fallback as f32,
        Some(v) if v.is_finite() && v > 0.0 => v,
        Some(v) => {
            errors.push(SchemaError::at(
                &at(name),
                format!("must be finite and > 0, got {v}"),
            ));
            0.0
        }
    };
    let width = dimension("width", def.width, global.canvas_width);
    let height = dimension("height", def.height, global.canvas_height);

    let design = match (def.kind, def.design) {
        (LayerKind::Design, Some(raw)) if !raw.trim().is_empty() => {
            match resolve_asset_url(base_url, raw.trim()) {
                Ok(u) => Some(u),
                Err(msg) => {
                    errors.push(SchemaError::at(&at("design"), msg));
                    None
                }
            }
        }
        (kind @ (LayerKind::Color | LayerKind::Shadow), Some(_)) => {
            repairs.push(SchemaError::at(
                &at("design"),
                format!("ignored on a {kind:?} layer").to_lowercase(),
            ));
            None
        }
        _ => None,
    };

    let color = match def.color {
        None => HexColor::WHITE,
        Some(raw) => HexColor::parse(&raw).unwrap_or_else(|_| {
            repairs.push(SchemaError::at(
                &at("color"),
                format!("invalid color '{raw}'; using {}", HexColor::WHITE),
            ));
            HexColor::WHITE
        }),
    };

    let mut bounded = |name, v: Option<f32>, max: f32| {
        let v = v.unwrap_or(0.0);
        let clamped = crate::document::model::clamp_param(v, max);
        if clamped != v {
            repairs.push(SchemaError::at(
                &at(name),
                format!("{v} outside 0..={max}; clamped to {clamped}"),
            ));
        }
        clamped
    };
    let shadow_intensity = bounded("shadowIntensity", def.shadow_intensity, SHADOW_INTENSITY_MAX);
    let highlight_intensity = bounded(
        "highlightIntensity",
        def.highlight_intensity,
        HIGHLIGHT_INTENSITY_MAX,
    );
    let noise_threshold = bounded("noiseThreshold", def.noise_threshold, NOISE_THRESHOLD_MAX);

    let crop = match def.crop {
        Some(p) if p.x.is_finite() && p.y.is_finite() => p,
        Some(_) => {
            repairs.push(SchemaError::at(&at("crop"), "non-finite offset; reset"));
            Point::ZERO
        }
        None => Point::ZERO,
    };

    let zoom = match def.zoom {
        Some(z) if z.is_finite() && z > 0.0 => z,
        Some(z) => {
            repairs.push(SchemaError::at(
                &at("zoom"),
                format!("zoom {z} must be finite and > 0; reset to 1"),
            ));
            1.0
        }
        None => 1.0,
    };

    let mut crop_rect = |name, r: Option<CropRect>| match r {
        Some(r) if r.is_well_formed() => Some(r),
        Some(r) => {
            repairs.push(SchemaError::at(
                &at(name),
                format!("malformed rectangle {r:?}; dropped"),
            ));
            None
        }
        None => None,
    };
    let cropped_area = crop_rect("croppedArea", def.cropped_area);
    let cropped_area_pixels = crop_rect("croppedAreaPixels", def.cropped_area_pixels);

    let placement = def.placement.map(|b| {
        let clamped = b.clamped();
        if clamped != b {
            repairs.push(SchemaError::at(
                &at("placement"),
                "corners clamped into the unit square",
            ));
        }
        clamped
    });

    if errors.len() > error_count {
        return None;
    }

    Some(Layer {
        id: LayerId(def.id),
        kind: def.kind,
        name: def.name.unwrap_or_default(),
        width,
        height,
        z_index: def.z_index.unwrap_or(0),
        mask,
        design,
        color,
        shadow_intensity,
        highlight_intensity,
        noise_threshold,
        crop,
        zoom,
        cropped_area,
        cropped_area_pixels,
        group_id: def.group_id.map(GroupId),
        placement,
    })
}

/// Resolve a stored asset path against the document base URL.
///
/// Absolute URLs (including `blob:` URLs) pass through; relative paths are joined onto
/// `base` when present and kept relative otherwise.
pub fn resolve_asset_url(base: Option<&url::Url>, raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("asset URL must be non-empty".to_string());
    }
    if url::Url::parse(raw).is_ok() {
        return Ok(raw.to_string());
    }
    match base {
        Some(base) => base
            .join(raw)
            .map(String::from)
            .map_err(|e| format!("cannot resolve '{raw}' against '{base}': {e}")),
        None => Ok(raw.to_string()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/schema.rs"]
mod tests;
