use crate::foundation::core::Rgba;
use crate::shading::constants::ShadingConstants;
use crate::shading::program::{
    Fragment, ProgramKind, ShadingProgram, TextureBindings, TextureSlot, UniformDecl,
    UniformValue, Uniforms,
};
use crate::shading::relit::{self, Relight};

const SCHEMA: &[UniformDecl] = &[
    UniformDecl {
        name: relit::COLOR,
        default: UniformValue::Vec3([1.0, 1.0, 1.0]),
    },
    UniformDecl {
        name: relit::SHADOW_INTENSITY,
        default: UniformValue::Float(0.0),
    },
    UniformDecl {
        name: relit::HIGHLIGHT_INTENSITY,
        default: UniformValue::Float(0.0),
    },
    UniformDecl {
        name: relit::NOISE_THRESHOLD,
        default: UniformValue::Float(0.0),
    },
    UniformDecl {
        name: relit::BRIGHTNESS,
        default: UniformValue::Float(0.0),
    },
    UniformDecl {
        name: relit::CONTRAST,
        default: UniformValue::Float(1.0),
    },
    UniformDecl {
        name: relit::HIGHLIGHTS_INTENSITY,
        default: UniformValue::Float(1.0),
    },
];

const U_COLOR: usize = 0;
const U_SHADOW: usize = 1;
const U_HIGHLIGHT: usize = 2;
const U_NOISE: usize = 3;
const U_BRIGHTNESS: usize = 4;
const U_CONTRAST: usize = 5;
const U_HIGHLIGHTS_GLOBAL: usize = 6;

const REQUIRED: &[TextureSlot] = &[TextureSlot::Mask, TextureSlot::Base];

/// Flat color relit by the base photo's luminance, gated by the layer mask.
#[derive(Clone, Copy, Debug, Default)]
pub struct ColorProgram;

impl ShadingProgram for ColorProgram {
    fn kind(&self) -> ProgramKind {
        ProgramKind::Color
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
        k: &ShadingConstants,
    ) -> Option<Rgba> {
        let mask = textures.mask?;
        let base = textures.base?;

        let m = mask.sample(frag.plane_uv[0], frag.plane_uv[1], frag.lod(mask));
        let alpha = relit::mask_alpha(m[0], k)?;

        let b = base.sample_color(frag.screen_uv[0], frag.screen_uv[1], frag.screen_lod(base));
        let lit = relit::relight(
            [b[0], b[1], b[2]],
            &Relight {
                color: u.vec3_at(U_COLOR),
                shadow_intensity: u.float_at(U_SHADOW),
                highlight_intensity: u.float_at(U_HIGHLIGHT),
                highlights_global: u.float_at(U_HIGHLIGHTS_GLOBAL),
            },
            k,
        );
        let g = relit::grain(frag.pixel, u.float_at(U_NOISE), k);
        let rgb = relit::global_tone(
            lit.map(|c| c + g),
            u.float_at(U_BRIGHTNESS),
            u.float_at(U_CONTRAST),
        );
        Some([rgb[0], rgb[1], rgb[2], alpha])
    }
}

#[cfg(test)]
#[path = "../../tests/unit/shading/color.rs"]
mod tests;
