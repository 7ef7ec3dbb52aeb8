use std::collections::HashMap;
use std::sync::Arc;

use crate::assets::texture::Texture;
use crate::document::model::LayerKind;
use crate::foundation::core::Rgba;
use crate::foundation::error::{MockupError, MockupResult};
use crate::shading::constants::ShadingConstants;

/// Program selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// UV-remapped or warped user design.
    Design,
    /// Flat color relit by the base photo.
    Color,
    /// Base photo relit by itself under a mask.
    Shadow,
    /// Base photo pass.
    Background,
}

impl ProgramKind {
    /// Program used for a layer of the given kind.
    pub fn for_layer(kind: LayerKind) -> Self {
        match kind {
            LayerKind::Design => Self::Design,
            LayerKind::Color => Self::Color,
            LayerKind::Shadow => Self::Shadow,
        }
    }
}

/// Typed uniform value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    /// Scalar.
    Float(f32),
    /// RGB triple in `0..=1`.
    Vec3([f32; 3]),
    /// Boolean switch.
    Flag(bool),
}

impl UniformValue {
    fn same_type(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// One declared uniform with its default.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformDecl {
    /// Name used by [`Uniforms::set`].
    pub name: &'static str,
    /// Initial value; also fixes the type.
    pub default: UniformValue,
}

/// Uniform values laid out in schema order.
///
/// Programs read by index (their schema position); callers write by name.
#[derive(Clone, Debug, PartialEq)]
pub struct Uniforms {
    schema: &'static [UniformDecl],
    values: Vec<UniformValue>,
}

impl Uniforms {
    /// Values initialized from the schema defaults.
    pub fn new(schema: &'static [UniformDecl]) -> Self {
        Self {
            schema,
            values: schema.iter().map(|d| d.default).collect(),
        }
    }

    /// Whether `name` is declared.
    pub fn declares(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Current value of `name`.
    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.index_of(name).map(|i| self.values[i])
    }

    /// Write `value` to `name`. Returns whether the stored value changed.
    pub fn set(&mut self, name: &str, value: UniformValue) -> MockupResult<bool> {
        let i = self
            .index_of(name)
            .ok_or_else(|| MockupError::invalid_input(format!("unknown uniform '{name}'")))?;
        if !self.values[i].same_type(&value) {
            return Err(MockupError::invalid_input(format!(
                "uniform '{name}' expects {:?}, got {value:?}",
                self.schema[i].default
            )));
        }
        let changed = self.values[i] != value;
        self.values[i] = value;
        Ok(changed)
    }

    pub(crate) fn float_at(&self, i: usize) -> f32 {
        match self.values.get(i) {
            Some(UniformValue::Float(v)) => *v,
            _ => 0.0,
        }
    }

    pub(crate) fn vec3_at(&self, i: usize) -> [f32; 3] {
        match self.values.get(i) {
            Some(UniformValue::Vec3(v)) => *v,
            _ => [0.0; 3],
        }
    }

    pub(crate) fn flag_at(&self, i: usize) -> bool {
        matches!(self.values.get(i), Some(UniformValue::Flag(true)))
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.schema.iter().position(|d| d.name == name)
    }
}

/// Texture inputs a program may read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    /// Shared base photo.
    Base,
    /// Shared UV remap.
    Uv,
    /// Layer mask.
    Mask,
    /// Layer design image.
    Design,
}

/// Textures bound for one draw.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextureBindings<'a> {
    /// Base photo.
    pub base: Option<&'a Texture>,
    /// UV remap.
    pub uv: Option<&'a Texture>,
    /// Mask.
    pub mask: Option<&'a Texture>,
    /// Design image.
    pub design: Option<&'a Texture>,
}

impl<'a> TextureBindings<'a> {
    /// Texture bound to `slot`.
    pub fn get(&self, slot: TextureSlot) -> Option<&'a Texture> {
        match slot {
            TextureSlot::Base => self.base,
            TextureSlot::Uv => self.uv,
            TextureSlot::Mask => self.mask,
            TextureSlot::Design => self.design,
        }
    }

    /// Whether every slot in `slots` is bound.
    pub fn has_all(&self, slots: &[TextureSlot]) -> bool {
        slots.iter().all(|s| self.get(*s).is_some())
    }
}

/// Interpolated inputs of one rasterized pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fragment {
    /// Mesh texture coordinate (`v = 0` at the bottom).
    pub uv: [f32; 2],
    /// Position inside the layer plane, same convention as `uv`.
    pub plane_uv: [f32; 2],
    /// Position on the canvas, same convention as `uv`.
    pub screen_uv: [f32; 2],
    /// Framebuffer pixel, top-left origin.
    pub pixel: [u32; 2],
    /// Largest change of `uv` between neighboring pixels.
    pub footprint: f32,
    /// Canvas size in pixels.
    pub canvas: [f32; 2],
}

impl Fragment {
    /// Mip level for sampling `tex` at `uv`.
    pub fn lod(&self, tex: &Texture) -> f32 {
        let texels = self.footprint * tex.width().max(tex.height()) as f32;
        lod_from_texels(texels)
    }

    /// Mip level for sampling a canvas-covering `tex` at `screen_uv`.
    pub fn screen_lod(&self, tex: &Texture) -> f32 {
        let texels = (tex.width() as f32 / self.canvas[0].max(1.0))
            .max(tex.height() as f32 / self.canvas[1].max(1.0));
        lod_from_texels(texels)
    }
}

fn lod_from_texels(texels: f32) -> f32 {
    if texels.is_finite() && texels > 1.0 {
        texels.log2()
    } else {
        0.0
    }
}

/// A per-fragment shading program.
///
/// Output colors are straight-alpha and display-referred; `None` discards the fragment.
pub trait ShadingProgram: Send + Sync {
    /// Program selector.
    fn kind(&self) -> ProgramKind;

    /// Declared uniforms, in the order the program reads them.
    fn schema(&self) -> &'static [UniformDecl];

    /// Textures that must be bound before the program may draw.
    fn required_textures(&self, uniforms: &Uniforms) -> &'static [TextureSlot];

    /// Shade one fragment.
    fn shade(
        &self,
        frag: &Fragment,
        uniforms: &Uniforms,
        textures: &TextureBindings<'_>,
        constants: &ShadingConstants,
    ) -> Option<Rgba>;
}

/// A program instance bound to its constants, shared by every unit that uses it.
pub struct CompiledProgram {
    program: Box<dyn ShadingProgram>,
    constants: ShadingConstants,
}

impl std::fmt::Debug for CompiledProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledProgram")
            .field("kind", &self.program.kind())
            .finish_non_exhaustive()
    }
}

impl CompiledProgram {
    /// Program selector.
    pub fn kind(&self) -> ProgramKind {
        self.program.kind()
    }

    /// Fresh uniform values for this program.
    pub fn uniforms(&self) -> Uniforms {
        Uniforms::new(self.program.schema())
    }

    /// Required texture slots under `uniforms`.
    pub fn required_textures(&self, uniforms: &Uniforms) -> &'static [TextureSlot] {
        self.program.required_textures(uniforms)
    }

    /// Shade one fragment.
    pub fn shade(
        &self,
        frag: &Fragment,
        uniforms: &Uniforms,
        textures: &TextureBindings<'_>,
    ) -> Option<Rgba> {
        self.program.shade(frag, uniforms, textures, &self.constants)
    }
}

/// Compiles each program once and hands out shared instances.
#[derive(Debug)]
pub struct ProgramRegistry {
    constants: ShadingConstants,
    compiled: HashMap<ProgramKind, Arc<CompiledProgram>>,
    compile_count: usize,
}

impl ProgramRegistry {
    /// Empty registry using `constants` for every program.
    pub fn new(constants: ShadingConstants) -> Self {
        Self {
            constants,
            compiled: HashMap::new(),
            compile_count: 0,
        }
    }

    /// Shared program for `kind`, compiling it on first use.
    pub fn get(&mut self, kind: ProgramKind) -> Arc<CompiledProgram> {
        if let Some(p) = self.compiled.get(&kind) {
            return Arc::clone(p);
        }
        let program: Box<dyn ShadingProgram> = match kind {
            ProgramKind::Design => Box::new(crate::shading::design::DesignProgram),
            ProgramKind::Color => Box::new(crate::shading::color::ColorProgram),
            ProgramKind::Shadow => Box::new(crate::shading::shadow::ShadowProgram),
            ProgramKind::Background => Box::new(crate::shading::background::BackgroundProgram),
        };
        debug_assert!(schema_names_unique(program.schema()));
        self.compile_count += 1;
        tracing::debug!(?kind, "compiled shading program");
        let compiled = Arc::new(CompiledProgram {
            program,
            constants: self.constants,
        });
        self.compiled.insert(kind, Arc::clone(&compiled));
        compiled
    }

    /// How many programs have been compiled.
    pub fn compile_count(&self) -> usize {
        self.compile_count
    }

    /// Constants baked into compiled programs.
    pub fn constants(&self) -> &ShadingConstants {
        &self.constants
    }
}

fn schema_names_unique(schema: &[UniformDecl]) -> bool {
    schema
        .iter()
        .enumerate()
        .all(|(i, d)| schema[..i].iter().all(|o| o.name != d.name))
}

#[cfg(test)]
#[path = "../../tests/unit/shading/program.rs"]
mod tests;
