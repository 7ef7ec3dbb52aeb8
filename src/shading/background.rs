use crate::foundation::core::Rgba;
use crate::shading::constants::ShadingConstants;
use crate::shading::program::{
    Fragment, ProgramKind, ShadingProgram, TextureBindings, TextureSlot, UniformDecl,
    UniformValue, Uniforms,
};
use crate::shading::relit;

const SCHEMA: &[UniformDecl] = &[
    UniformDecl {
        name: relit::BRIGHTNESS,
        default: UniformValue::Float(0.0),
    },
    UniformDecl {
        name: relit::CONTRAST,
        default: UniformValue::Float(1.0),
    },
];

const U_BRIGHTNESS: usize = 0;
const U_CONTRAST: usize = 1;

const REQUIRED: &[TextureSlot] = &[TextureSlot::Base];

/// Base photo pass: the photo across the whole canvas with the global tone applied.
#[derive(Clone, Copy, Debug, Default)]
pub struct BackgroundProgram;

impl ShadingProgram for BackgroundProgram {
    fn kind(&self) -> ProgramKind {
        ProgramKind::Background
    }

    fn schema(&self) -> &'static [UniformDecl] {
        SCHEMA
    }

    fn required_textures(&self, _uniforms: &Uniforms) -> &'static [TextureSlot] {
        REQUIRED
    }

    fn shade(
        &self,
        frag: &Fragment,
        u: &Uniforms,
        textures: &TextureBindings<'_>,
        _k: &ShadingConstants,
    ) -> Option<Rgba> {
        let base = textures.base?;
        let b = base.sample_color(frag.screen_uv[0], frag.screen_uv[1], frag.screen_lod(base));
        let rgb = relit::global_tone(
            [b[0], b[1], b[2]],
            u.float_at(U_BRIGHTNESS),
            u.float_at(U_CONTRAST),
        );
        Some([rgb[0], rgb[1], rgb[2], b[3]])
    }
}

#[cfg(test)]
#[path = "../../tests/unit/shading/background.rs"]
mod tests;
