use std::sync::Arc;

use crate::assets::texture::Texture;
use crate::document::model::{GlobalSettings, Layer, LayerId, LayerKind};
use crate::foundation::core::{CropRect, NormalizedBox};
use crate::geometry::warp::{WarpMesh, WarpOpts, build_warp_mesh};
use crate::shading::program::{CompiledProgram, TextureBindings, UniformValue, Uniforms};
use crate::shading::relit;
use crate::store::state::GlobalTextures;

/// URLs a layer's texture set is loaded from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerSources {
    /// Mask URL.
    pub mask: Option<String>,
    /// Design URL (design layers only).
    pub design: Option<String>,
    /// Pixel crop applied to the design.
    pub design_crop: Option<CropRect>,
    /// Whether the design is drawn through a warp mesh rather than the UV remap.
    pub warped: bool,
}

impl LayerSources {
    /// Sources the current state of `layer` asks for.
    pub fn of(layer: &Layer) -> Self {
        let design = layer.active_design().map(str::to_owned);
        Self {
            mask: Some(layer.mask.clone()).filter(|m| !m.is_empty()),
            design_crop: design.as_ref().and(layer.cropped_area_pixels),
            warped: design.is_some() && layer.placement.is_some(),
            design,
        }
    }
}

/// A layer's committed textures. Replaced as a whole, never slot by slot.
#[derive(Clone, Debug, Default)]
pub struct LayerTextures {
    /// Sources the handles were loaded from.
    pub sources: LayerSources,
    /// Mask texture.
    pub mask: Option<Texture>,
    /// Design texture.
    pub design: Option<Texture>,
}

#[derive(Clone, Debug, PartialEq)]
struct MeshKey {
    placement: Option<NormalizedBox>,
    size: [f32; 2],
    source_ready: bool,
    opts: WarpOpts,
}

/// Per-layer draw state: compiled program, uniform values, committed textures and mesh.
#[derive(Debug)]
pub struct ShadingUnit {
    layer: LayerId,
    kind: LayerKind,
    program: Arc<CompiledProgram>,
    uniforms: Uniforms,
    textures: LayerTextures,
    mesh: Option<(MeshKey, WarpMesh)>,
}

impl ShadingUnit {
    /// Unit for `layer` running `program`.
    pub fn new(layer: &Layer, program: Arc<CompiledProgram>) -> Self {
        Self {
            layer: layer.id,
            kind: layer.kind,
            uniforms: program.uniforms(),
            program,
            textures: LayerTextures::default(),
            mesh: None,
        }
    }

    /// Owning layer.
    pub fn layer_id(&self) -> LayerId {
        self.layer
    }

    /// Layer kind the program was chosen for.
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Current uniform values.
    pub fn uniforms(&self) -> &Uniforms {
        &self.uniforms
    }

    /// Committed textures.
    pub fn textures(&self) -> &LayerTextures {
        &self.textures
    }

    /// Copy layer and global parameters into the uniforms. Returns how many values changed.
    pub fn sync_uniforms(&mut self, layer: &Layer, global: &GlobalSettings) -> usize {
        let values = [
            (relit::COLOR, UniformValue::Vec3(layer.color.to_rgb())),
            (
                relit::SHADOW_INTENSITY,
                UniformValue::Float(layer.shadow_intensity),
            ),
            (
                relit::HIGHLIGHT_INTENSITY,
                UniformValue::Float(layer.highlight_intensity),
            ),
            (
                relit::NOISE_THRESHOLD,
                UniformValue::Float(layer.noise_threshold),
            ),
            (relit::WARPED, UniformValue::Flag(layer.placement.is_some())),
            (relit::BRIGHTNESS, UniformValue::Float(global.brightness)),
            (relit::CONTRAST, UniformValue::Float(global.contrast)),
            (
                relit::HIGHLIGHTS_INTENSITY,
                UniformValue::Float(global.highlights_intensity),
            ),
        ];
        let mut changed = 0;
        for (name, value) in values {
            if self.uniforms.declares(name) && self.uniforms.set(name, value).unwrap_or(false) {
                changed += 1;
            }
        }
        changed
    }

    /// Replace the committed texture set. The previous handles are released.
    pub fn commit_textures(&mut self, textures: LayerTextures) {
        let previous = std::mem::replace(&mut self.textures, textures);
        if let Some(t) = previous.mask {
            t.dispose();
        }
        if let Some(t) = previous.design {
            t.dispose();
        }
    }

    /// Textures bound for a draw, shared ones taken from `globals`.
    pub fn bindings<'a>(&'a self, globals: &'a GlobalTextures) -> TextureBindings<'a> {
        TextureBindings {
            base: globals.base.as_ref(),
            uv: globals.uv.as_ref(),
            mask: self.textures.mask.as_ref(),
            design: self.textures.design.as_ref(),
        }
    }

    /// Whether every texture the program requires is bound.
    pub fn is_ready(&self, globals: &GlobalTextures) -> bool {
        self.bindings(globals)
            .has_all(self.program.required_textures(&self.uniforms))
    }

    pub(crate) fn program(&self) -> &CompiledProgram {
        &self.program
    }

    /// Rebuild the cached mesh when the layer geometry or design readiness changed.
    pub(crate) fn prepare_mesh(&mut self, layer: &Layer, opts: WarpOpts) {
        let key = MeshKey {
            placement: layer.placement,
            size: [layer.width, layer.height],
            source_ready: self.textures.design.is_some(),
            opts,
        };
        if self.mesh.as_ref().is_some_and(|(k, _)| *k == key) {
            return;
        }
        let mesh = match &key.placement {
            None => WarpMesh::plane(layer.width, layer.height),
            Some(b) => build_warp_mesh(Some(b), key.source_ready, layer.width, layer.height, opts),
        };
        self.mesh = Some((key, mesh));
    }

    /// Mesh built by the last [`ShadingUnit::prepare_mesh`].
    pub fn mesh(&self) -> Option<&WarpMesh> {
        self.mesh.as_ref().map(|(_, m)| m)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/unit.rs"]
mod tests;
