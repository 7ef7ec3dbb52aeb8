use super::*;

fn gray(v: f32) -> Rgba {
    [v, v, v, 1.0]
}

#[test]
fn format_is_detected_from_extension() {
    assert_eq!(SourceFormat::from_url("uv/map.EXR"), SourceFormat::OpenExr);
    assert_eq!(SourceFormat::from_url("a/b.hdr?v=2"), SourceFormat::Radiance);
    assert_eq!(SourceFormat::from_url("mask.png"), SourceFormat::Raster);
    assert_eq!(SourceFormat::from_url("blob:mockup/7"), SourceFormat::Raster);
}

#[test]
fn usage_drives_configuration() {
    let color = TextureDesc::for_usage(TextureUsage::Color, SourceFormat::Raster);
    assert_eq!(color.color_space, ColorSpace::Srgb);
    assert_eq!(color.filter, FilterMode::Trilinear);
    assert!(color.mipmaps);
    assert_eq!(color.wrap, WrapMode::ClampToEdge);

    let mask = TextureDesc::for_usage(TextureUsage::Mask, SourceFormat::Raster);
    assert_eq!(mask.color_space, ColorSpace::None);
    assert!(mask.mipmaps);

    let uv = TextureDesc::for_usage(TextureUsage::Data, SourceFormat::OpenExr);
    assert_eq!(uv.color_space, ColorSpace::Linear);
    assert_eq!(uv.filter, FilterMode::Nearest);
    assert!(!uv.mipmaps);

    let hdr_color = TextureDesc::for_usage(TextureUsage::Color, SourceFormat::Radiance);
    assert_eq!(hdr_color.color_space, ColorSpace::Linear);
    assert!(!hdr_color.mipmaps);
}

#[test]
fn mip_chain_reaches_one_pixel() {
    let tracker = TextureTracker::new();
    let desc = TextureDesc::for_usage(TextureUsage::Color, SourceFormat::Raster);
    let tex = Texture::solid(gray(0.5), 8, 4, desc, &tracker);
    // 8x4, 4x2, 2x1, 1x1
    assert_eq!(tex.mip_levels(), 4);
    let s = tex.sample(0.3, 0.7, 2.5);
    assert!((s[0] - 0.5).abs() < 1e-6);
}

#[test]
fn bottom_left_uv_origin_and_clamp() {
    let tracker = TextureTracker::new();
    let image = DecodedImage {
        width: 1,
        height: 2,
        // top row red, bottom row blue
        texels: vec![[1.0, 0.0, 0.0, 1.0], [0.0, 0.0, 1.0, 1.0]],
    };
    let desc = TextureDesc::for_usage(TextureUsage::Data, SourceFormat::Raster);
    let tex = Texture::upload(image, desc, &tracker);
    assert_eq!(tex.sample(0.5, 0.1, 0.0), [0.0, 0.0, 1.0, 1.0]);
    assert_eq!(tex.sample(0.5, 0.9, 0.0), [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(tex.sample(-3.0, 7.0, 0.0), [1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn bilinear_blends_neighbours() {
    let tracker = TextureTracker::new();
    let image = DecodedImage {
        width: 2,
        height: 1,
        texels: vec![gray(0.0), gray(1.0)],
    };
    let desc = TextureDesc::for_usage(TextureUsage::Warp, SourceFormat::Raster);
    let tex = Texture::upload(image, desc, &tracker);
    let mid = tex.sample(0.5, 0.5, 0.0);
    assert!((mid[0] - 0.5).abs() < 1e-6);
}

#[test]
fn linear_textures_are_encoded_for_display() {
    let tracker = TextureTracker::new();
    let desc = TextureDesc::for_usage(TextureUsage::Color, SourceFormat::OpenExr);
    let tex = Texture::solid(gray(0.214), 1, 1, desc, &tracker);
    let c = tex.sample_color(0.5, 0.5, 0.0);
    assert!((c[0] - 0.5).abs() < 0.01, "{c:?}");
}

#[test]
fn dropping_last_handle_disposes() {
    let tracker = TextureTracker::new();
    let desc = TextureDesc::for_usage(TextureUsage::Mask, SourceFormat::Raster);
    let a = Texture::solid(gray(1.0), 2, 2, desc, &tracker);
    let b = a.clone();
    assert_eq!(a, b);
    assert_eq!(tracker.stats().live(), 1);

    a.dispose();
    assert_eq!(tracker.stats().disposed, 0);
    b.dispose();
    assert_eq!(
        tracker.stats(),
        TextureStats {
            created: 1,
            disposed: 1
        }
    );
}
