use super::*;
use crate::assets::texture::{SourceFormat, Texture, TextureDesc, TextureTracker, TextureUsage};

fn frag() -> Fragment {
    Fragment {
        uv: [0.5, 0.5],
        plane_uv: [0.5, 0.5],
        screen_uv: [0.5, 0.5],
        pixel: [0, 0],
        footprint: 0.0,
        canvas: [2.0, 2.0],
    }
}

#[test]
fn photo_passes_through_with_global_tone() {
    let tracker = TextureTracker::new();
    let base = Texture::solid(
        [0.25, 0.5, 0.75, 1.0],
        2,
        2,
        TextureDesc::for_usage(TextureUsage::Color, SourceFormat::Raster),
        &tracker,
    );
    let textures = TextureBindings {
        base: Some(&base),
        ..Default::default()
    };
    let k = ShadingConstants::default();
    let mut u = Uniforms::new(BackgroundProgram.schema());

    let out = BackgroundProgram.shade(&frag(), &u, &textures, &k).unwrap();
    for (got, want) in out.iter().zip([0.25, 0.5, 0.75, 1.0]) {
        assert!((got - want).abs() < 1e-5, "{out:?}");
    }

    u.set("brightness", UniformValue::Float(0.1)).unwrap();
    let out = BackgroundProgram.shade(&frag(), &u, &textures, &k).unwrap();
    assert!((out[0] - 0.35).abs() < 1e-5);

    assert!(
        BackgroundProgram
            .shade(&frag(), &u, &TextureBindings::default(), &k)
            .is_none()
    );
}
