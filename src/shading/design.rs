use crate::foundation::core::Rgba;
use crate::foundation::math::clamp01;
use crate::shading::constants::ShadingConstants;
use crate::shading::program::{
    Fragment, ProgramKind, ShadingProgram, TextureBindings, TextureSlot, UniformDecl,
    UniformValue, Uniforms,
};
use crate::shading::relit;

const SCHEMA: &[UniformDecl] = &[
    UniformDecl {
        name: relit::WARPED,
        default: UniformValue::Flag(false),
    },
    UniformDecl {
        name: relit::BRIGHTNESS,
        default: UniformValue::Float(0.0),
    },
    UniformDecl {
        name: relit::CONTRAST,
        default: UniformValue::Float(1.0),
    },
];

const U_WARPED: usize = 0;
const U_BRIGHTNESS: usize = 1;
const U_CONTRAST: usize = 2;

const REMAP_REQUIRED: &[TextureSlot] = &[
    TextureSlot::Base,
    TextureSlot::Uv,
    TextureSlot::Mask,
    TextureSlot::Design,
];
const WARPED_REQUIRED: &[TextureSlot] = &[TextureSlot::Base, TextureSlot::Mask, TextureSlot::Design];

/// User design compositing.
///
/// In remap mode the UV texture, sampled at the plane position, gives the design coordinate.
/// In warped mode the mesh already carries design coordinates. Either way
/// `alpha = design.a * mask.r`; the design is not relit. The layer waits for the base photo even
/// though it never samples it, so a design is never drawn over an empty canvas.
#[derive(Clone, Copy, Debug, Default)]
pub struct DesignProgram;

impl ShadingProgram for DesignProgram {
    fn kind(&self) -> ProgramKind {
        ProgramKind::Design
    }

    fn schema(&self) -> &'static [UniformDecl] {
        SCHEMA
    }

    fn required_textures(&self, uniforms: &Uniforms) -> &'static [TextureSlot] {
        if uniforms.flag_at(U_WARPED) {
            WARPED_REQUIRED
        } else {
            REMAP_REQUIRED
        }
    }

    fn shade(
        &self,
        frag: &Fragment,
        u: &Uniforms,
        textures: &TextureBindings<'_>,
        k: &ShadingConstants,
    ) -> Option<Rgba> {
        let mask = textures.mask?;
        let design = textures.design?;

        let m = mask.sample(frag.plane_uv[0], frag.plane_uv[1], frag.lod(mask));
        let d = if u.flag_at(U_WARPED) {
            design.sample_color(frag.uv[0], frag.uv[1], frag.lod(design))
        } else {
            let uv_tex = textures.uv?;
            let remap = uv_tex.sample(frag.plane_uv[0], frag.plane_uv[1], 0.0);
            design.sample_color(clamp01(remap[0]), clamp01(remap[1]), 0.0)
        };

        let mask_r = clamp01(m[0]);
        let alpha = clamp01(d[3]) * mask_r;
        if mask_r < k.discard_floor && alpha < k.discard_floor {
            return None;
        }
        let rgb = relit::global_tone(
            [d[0], d[1], d[2]],
            u.float_at(U_BRIGHTNESS),
            u.float_at(U_CONTRAST),
        );
        Some([rgb[0], rgb[1], rgb[2], alpha])
    }
}

#[cfg(test)]
#[path = "../../tests/unit/shading/design.rs"]
mod tests;
