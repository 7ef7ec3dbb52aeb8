use crate::foundation::core::Rgba;
use crate::shading::constants::ShadingConstants;
use crate::shading::program::{
    Fragment, ProgramKind, ShadingProgram, TextureBindings, TextureSlot, UniformDecl,
    UniformValue, Uniforms,
};
use crate::shading::relit::{self, Relight};

const SCHEMA: &[UniformDecl] = &[
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

const U_SHADOW: usize = 0;
const U_HIGHLIGHT: usize = 1;
const U_NOISE: usize = 2;
const U_BRIGHTNESS: usize = 3;
const U_CONTRAST: usize = 4;
const U_HIGHLIGHTS_GLOBAL: usize = 5;

const REQUIRED: &[TextureSlot] = &[TextureSlot::Mask, TextureSlot::Base];

/// The base photo relit by its own luminance under the layer mask.
///
/// Deepens shadows and lifts highlights of the photo itself, for folds and contact shadows that
/// no flat color should cover. Zero intensities reproduce the photo.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShadowProgram;

impl ShadingProgram for ShadowProgram {
    fn kind(&self) -> ProgramKind {
        ProgramKind::Shadow
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
        let rgb = [b[0], b[1], b[2]];
        let lit = relit::relight(
            rgb,
            &Relight {
                color: rgb,
                shadow_intensity: u.float_at(U_SHADOW),
                highlight_intensity: u.float_at(U_HIGHLIGHT),
                highlights_global: u.float_at(U_HIGHLIGHTS_GLOBAL),
            },
            k,
        );
        let g = relit::grain(frag.pixel, u.float_at(U_NOISE), k);
        let out = relit::global_tone(
            lit.map(|c| c + g),
            u.float_at(U_BRIGHTNESS),
            u.float_at(U_CONTRAST),
        );
        Some([out[0], out[1], out[2], alpha])
    }
}

#[cfg(test)]
#[path = "../../tests/unit/shading/shadow.rs"]
mod tests;
