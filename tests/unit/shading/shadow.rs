use super::*;
use crate::assets::texture::{SourceFormat, Texture, TextureDesc, TextureTracker, TextureUsage};

fn frag() -> Fragment {
    Fragment {
        uv: [0.5, 0.5],
        plane_uv: [0.5, 0.5],
        screen_uv: [0.5, 0.5],
        pixel: [1, 2],
        footprint: 0.0,
        canvas: [4.0, 4.0],
    }
}

fn solid(rgba: [f32; 4], usage: TextureUsage, tracker: &TextureTracker) -> Texture {
    Texture::solid(rgba, 4, 4, TextureDesc::for_usage(usage, SourceFormat::Raster), tracker)
}

fn shade(u: &Uniforms, mask_r: f32) -> Option<Rgba> {
    let tracker = TextureTracker::new();
    let mask = solid([mask_r, mask_r, mask_r, 1.0], TextureUsage::Mask, &tracker);
    let base = solid([0.5, 0.5, 0.5, 1.0], TextureUsage::Color, &tracker);
    let textures = TextureBindings {
        base: Some(&base),
        mask: Some(&mask),
        ..Default::default()
    };
    ShadowProgram.shade(&frag(), u, &textures, &ShadingConstants::default())
}

#[test]
fn zero_intensities_reproduce_the_photo() {
    let u = Uniforms::new(ShadowProgram.schema());
    let out = shade(&u, 1.0).unwrap();
    for c in &out[..3] {
        assert!((c - 0.5).abs() < 0.01, "{out:?}");
    }
    assert!((out[3] - 1.0).abs() < 1e-6);
}

#[test]
fn shadow_intensity_darkens_the_photo() {
    let mut u = Uniforms::new(ShadowProgram.schema());
    u.set("shadow_intensity", UniformValue::Float(5.0)).unwrap();
    let out = shade(&u, 1.0).unwrap();
    assert!(out[0] < 0.47, "{out:?}");
    assert!((out[0] - out[2]).abs() < 0.01, "gray stays gray: {out:?}");

    let mut lifted = Uniforms::new(ShadowProgram.schema());
    lifted.set("highlight_intensity", UniformValue::Float(5.0)).unwrap();
    assert!(shade(&lifted, 1.0).unwrap()[0] > 0.5);
}

#[test]
fn unmasked_pixels_are_discarded() {
    let u = Uniforms::new(ShadowProgram.schema());
    assert!(shade(&u, 0.0).is_none());
}

#[test]
fn needs_mask_and_base() {
    let u = Uniforms::new(ShadowProgram.schema());
    let required = ShadowProgram.required_textures(&u);
    assert!(required.contains(&TextureSlot::Mask));
    assert!(required.contains(&TextureSlot::Base));
    assert!(
        ShadowProgram
            .shade(&frag(), &u, &TextureBindings::default(), &ShadingConstants::default())
            .is_none()
    );
}
