use std::collections::HashMap;
use std::sync::Arc;

use crate::document::model::{Layer, LayerId};
use crate::foundation::core::Rgba;
use crate::foundation::error::{MockupError, MockupResult};
use crate::geometry::warp::{WarpMesh, WarpOpts};
use crate::render::framebuffer::Framebuffer;
use crate::render::raster::{DrawTarget, rasterize};
use crate::render::unit::{LayerTextures, ShadingUnit};
use crate::shading::constants::ShadingConstants;
use crate::shading::program::{
    CompiledProgram, ProgramKind, ProgramRegistry, TextureBindings, UniformValue, Uniforms,
};
use crate::shading::relit;
use crate::store::state::MockupStore;

/// Frame renderer options.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderOpts {
    /// Warp mesh options for placed designs.
    pub warp: WarpOpts,
    /// Keep the framebuffer contents after [`FrameRenderer::present`].
    pub preserve_drawing_buffer: bool,
    /// Shading tunables baked into compiled programs.
    pub shading: ShadingConstants,
    /// Straight-alpha clear color.
    pub clear_color: Rgba,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            warp: WarpOpts::default(),
            preserve_drawing_buffer: false,
            shading: ShadingConstants::default(),
            clear_color: [0.0; 4],
        }
    }
}

/// What a [`FrameRenderer::render`] call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Draws issued, including the base pass.
    pub draw_calls: usize,
    /// Layers skipped because their textures were not ready.
    pub skipped_layers: usize,
    /// Uniform values that changed since the previous frame.
    pub uniform_updates: usize,
    /// Fragments shaded.
    pub fragments: usize,
    /// Store revision the frame was drawn from.
    pub revision: u64,
}

/// Draws the base photo and the ordered layer stack into a [`Framebuffer`].
#[derive(Debug)]
pub struct FrameRenderer {
    opts: RenderOpts,
    registry: ProgramRegistry,
    units: HashMap<LayerId, ShadingUnit>,
    background: Option<(Arc<CompiledProgram>, Uniforms)>,
    framebuffer: Option<Framebuffer>,
    has_frame: bool,
}

impl FrameRenderer {
    /// Renderer with no compiled programs and no framebuffer yet.
    pub fn new(opts: RenderOpts) -> Self {
        Self {
            registry: ProgramRegistry::new(opts.shading),
            opts,
            units: HashMap::new(),
            background: None,
            framebuffer: None,
            has_frame: false,
        }
    }

    /// Options in effect.
    pub fn opts(&self) -> &RenderOpts {
        &self.opts
    }

    /// Program registry (exposes compile counts).
    pub fn registry(&self) -> &ProgramRegistry {
        &self.registry
    }

    /// Current framebuffer, if a frame has been set up.
    pub fn framebuffer(&self) -> Option<&Framebuffer> {
        self.framebuffer.as_ref()
    }

    /// Shading unit of layer `id`.
    pub fn unit(&self, id: LayerId) -> Option<&ShadingUnit> {
        self.units.get(&id)
    }

    /// Install a freshly loaded texture set for `layer`, creating its unit when needed.
    pub fn commit_layer_textures(&mut self, layer: &Layer, textures: LayerTextures) {
        self.unit_for(layer).commit_textures(textures);
    }

    /// Drop the unit (and its textures) of a removed layer.
    pub fn drop_unit(&mut self, id: LayerId) -> bool {
        self.units.remove(&id).is_some()
    }

    /// Draw one frame from `store`.
    ///
    /// The base pass draws first, then layers in ascending `z_index` with ties in insertion
    /// order. Layers whose textures are not all committed are skipped.
    #[tracing::instrument(skip_all, fields(revision = store.revision()))]
    pub fn render(&mut self, store: &MockupStore) -> FrameStats {
        let mut stats = FrameStats {
            revision: store.revision(),
            ..FrameStats::default()
        };
        let canvas = match store.global().canvas() {
            Ok(c) => c,
            Err(err) => {
                tracing::warn!(%err, "cannot render without a valid canvas");
                return stats;
            }
        };

        self.units.retain(|id, _| store.layer(*id).is_some());

        let mut fb = match self.framebuffer.take() {
            Some(fb) if fb.width() == canvas.width && fb.height() == canvas.height => fb,
            _ => Framebuffer::new(canvas),
        };
        fb.clear(self.opts.clear_color);

        let globals = store.global_textures();
        let global = store.global();

        let (program, uniforms) = self.background.get_or_insert_with(|| {
            let program = self.registry.get(ProgramKind::Background);
            let uniforms = program.uniforms();
            (program, uniforms)
        });
        let tone = [
            (relit::BRIGHTNESS, global.brightness),
            (relit::CONTRAST, global.contrast),
        ];
        for (name, value) in tone {
            if uniforms
                .set(name, UniformValue::Float(value))
                .unwrap_or(false)
            {
                stats.uniform_updates += 1;
            }
        }
        if let Some(base) = globals.base.as_ref() {
            let (w, h) = (canvas.width as f32, canvas.height as f32);
            let bindings = TextureBindings {
                base: Some(base),
                ..TextureBindings::default()
            };
            stats.fragments += draw(
                &mut fb,
                program,
                uniforms,
                &bindings,
                &WarpMesh::plane(w, h),
                [w, h],
            );
            stats.draw_calls += 1;
        }

        for layer in store.draw_order() {
            let warp = self.opts.warp;
            let unit = self.unit_for(layer);
            stats.uniform_updates += unit.sync_uniforms(layer, global);
            if !unit.is_ready(globals) {
                tracing::trace!(layer = %layer.id, "layer not ready; skipped");
                stats.skipped_layers += 1;
                continue;
            }
            unit.prepare_mesh(layer, warp);
            let Some(mesh) = unit.mesh() else {
                stats.skipped_layers += 1;
                continue;
            };
            stats.fragments += draw(
                &mut fb,
                unit.program(),
                unit.uniforms(),
                &unit.bindings(globals),
                mesh,
                [layer.width, layer.height],
            );
            stats.draw_calls += 1;
        }

        self.framebuffer = Some(fb);
        self.has_frame = true;
        tracing::debug!(
            draw_calls = stats.draw_calls,
            skipped = stats.skipped_layers,
            "frame rendered"
        );
        stats
    }

    /// Hand the frame to the display. Without `preserve_drawing_buffer` the contents are
    /// discarded afterwards.
    pub fn present(&mut self) {
        if self.opts.preserve_drawing_buffer {
            return;
        }
        if let Some(fb) = self.framebuffer.as_mut() {
            fb.clear([0.0; 4]);
        }
        self.has_frame = false;
    }

    /// PNG snapshot of the composited state.
    ///
    /// Without `preserve_drawing_buffer` the frame is redrawn right before capture so the
    /// snapshot is never blank.
    #[tracing::instrument(skip_all)]
    pub fn export_png(&mut self, store: &MockupStore) -> MockupResult<Vec<u8>> {
        if !(self.opts.preserve_drawing_buffer && self.has_frame) {
            self.render(store);
        }
        let fb = self
            .framebuffer
            .as_ref()
            .ok_or_else(|| MockupError::export("no framebuffer to capture"))?;
        fb.encode_png()
    }

    fn unit_for(&mut self, layer: &Layer) -> &mut ShadingUnit {
        let stale = self
            .units
            .get(&layer.id)
            .is_some_and(|u| u.kind() != layer.kind);
        if stale {
            // Kind changed: the old program and its textures no longer apply.
            self.units.remove(&layer.id);
        }
        let registry = &mut self.registry;
        self.units.entry(layer.id).or_insert_with(|| {
            ShadingUnit::new(layer, registry.get(ProgramKind::for_layer(layer.kind)))
        })
    }
}

fn draw(
    fb: &mut Framebuffer,
    program: &CompiledProgram,
    uniforms: &Uniforms,
    bindings: &TextureBindings<'_>,
    mesh: &WarpMesh,
    plane: [f32; 2],
) -> usize {
    let target = DrawTarget {
        width: fb.width(),
        height: fb.height(),
        plane,
    };
    let mut shaded = Vec::new();
    rasterize(mesh, target, |frag| {
        if let Some(color) = program.shade(frag, uniforms, bindings) {
            shaded.push((frag.pixel, color));
        }
    });
    let n = shaded.len();
    for ([x, y], color) in shaded {
        fb.blend(x, y, color);
    }
    n
}

#[cfg(test)]
#[path = "../../tests/unit/render/renderer.rs"]
mod tests;
