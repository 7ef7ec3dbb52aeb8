use super::*;
use crate::assets::texture::{SourceFormat, Texture, TextureDesc, TextureTracker, TextureUsage};
use crate::document::model::GlobalSettings;
use crate::foundation::core::HexColor;
use crate::render::unit::LayerSources;

fn solid(rgba: Rgba, usage: TextureUsage, tracker: &TextureTracker) -> Texture {
    Texture::solid(rgba, 4, 4, TextureDesc::for_usage(usage, SourceFormat::Raster), tracker)
}

fn store_with_base(tracker: &TextureTracker) -> MockupStore {
    let mut store = MockupStore::new(GlobalSettings {
        base: Some("base.png".into()),
        canvas_width: 4,
        canvas_height: 4,
        ..GlobalSettings::default()
    });
    let base = solid([0.5, 0.5, 0.5, 1.0], TextureUsage::Color, tracker);
    assert!(store.set_global_textures((Some("base.png".into()), None), Some(base), None));
    store
}

fn color_layer(id: u32, z: i32, color: HexColor) -> Layer {
    Layer::color(LayerId(id), 4.0, 4.0, format!("mask{id}.png"))
        .with_z_index(z)
        .with_color(color)
}

fn commit_mask(r: &mut FrameRenderer, layer: &Layer, tracker: &TextureTracker) {
    r.commit_layer_textures(
        layer,
        LayerTextures {
            sources: LayerSources::of(layer),
            mask: Some(solid([1.0; 4], TextureUsage::Mask, tracker)),
            design: None,
        },
    );
}

fn approx(a: Rgba, b: Rgba) -> bool {
    (0..4).all(|i| (a[i] - b[i]).abs() < 0.02)
}

#[test]
fn empty_store_renders_a_blank_frame() {
    let mut r = FrameRenderer::new(RenderOpts::default());
    let stats = r.render(&MockupStore::default());
    assert_eq!(stats.draw_calls, 0);
    assert!(r.framebuffer().is_some_and(Framebuffer::is_blank));
}

#[test]
fn base_pass_passes_the_photo_through() {
    let tracker = TextureTracker::new();
    let store = store_with_base(&tracker);
    let mut r = FrameRenderer::new(RenderOpts::default());
    let stats = r.render(&store);
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.fragments, 16);
    let px = r.framebuffer().and_then(|fb| fb.pixel_straight(1, 2)).unwrap();
    assert!(approx(px, [0.5, 0.5, 0.5, 1.0]), "{px:?}");
}

#[test]
fn layers_without_textures_are_skipped() {
    let tracker = TextureTracker::new();
    let mut store = store_with_base(&tracker);
    store.add_layer(color_layer(1, 0, HexColor::rgb(255, 0, 0))).unwrap();
    let mut r = FrameRenderer::new(RenderOpts::default());

    let stats = r.render(&store);
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.skipped_layers, 1);
}

#[test]
fn higher_z_index_draws_on_top() {
    let tracker = TextureTracker::new();
    let mut store = store_with_base(&tracker);
    let red = color_layer(1, 5, HexColor::rgb(255, 0, 0));
    let green = color_layer(2, 1, HexColor::rgb(0, 255, 0));
    store.add_layer(red.clone()).unwrap();
    store.add_layer(green.clone()).unwrap();

    let mut r = FrameRenderer::new(RenderOpts::default());
    commit_mask(&mut r, &red, &tracker);
    commit_mask(&mut r, &green, &tracker);
    let stats = r.render(&store);
    assert_eq!(stats.draw_calls, 3);
    assert_eq!(stats.skipped_layers, 0);

    let px = r.framebuffer().and_then(|fb| fb.pixel_straight(0, 0)).unwrap();
    assert!(approx(px, [1.0, 0.0, 0.0, 1.0]), "{px:?}");
}

#[test]
fn programs_are_compiled_once_per_kind() {
    let tracker = TextureTracker::new();
    let mut store = store_with_base(&tracker);
    let mut r = FrameRenderer::new(RenderOpts::default());
    for id in 1..=3 {
        let layer = color_layer(id, 0, HexColor::WHITE);
        store.add_layer(layer.clone()).unwrap();
        commit_mask(&mut r, &layer, &tracker);
    }
    r.render(&store);
    r.render(&store);
    assert_eq!(r.registry().compile_count(), 2);
}

#[test]
fn unchanged_frames_upload_no_uniforms() {
    let tracker = TextureTracker::new();
    let mut store = store_with_base(&tracker);
    let layer = color_layer(1, 0, HexColor::rgb(0, 0, 255));
    store.add_layer(layer.clone()).unwrap();
    let mut r = FrameRenderer::new(RenderOpts::default());
    commit_mask(&mut r, &layer, &tracker);

    assert!(r.render(&store).uniform_updates > 0);
    assert_eq!(r.render(&store).uniform_updates, 0);
}

#[test]
fn removed_layers_lose_their_unit_and_textures() {
    let tracker = TextureTracker::new();
    let mut store = store_with_base(&tracker);
    let layer = color_layer(1, 0, HexColor::WHITE);
    store.add_layer(layer.clone()).unwrap();
    let mut r = FrameRenderer::new(RenderOpts::default());
    commit_mask(&mut r, &layer, &tracker);
    r.render(&store);
    assert!(r.unit(LayerId(1)).is_some());

    store.remove_layer(LayerId(1));
    r.render(&store);
    assert!(r.unit(LayerId(1)).is_none());
    // Only the base texture held by the store remains.
    assert_eq!(tracker.stats().live(), 1);
}

#[test]
fn present_discards_unless_preserved() {
    let tracker = TextureTracker::new();
    let store = store_with_base(&tracker);

    let mut r = FrameRenderer::new(RenderOpts::default());
    r.render(&store);
    r.present();
    assert!(r.framebuffer().is_some_and(Framebuffer::is_blank));

    let mut kept = FrameRenderer::new(RenderOpts {
        preserve_drawing_buffer: true,
        ..RenderOpts::default()
    });
    kept.render(&store);
    kept.present();
    assert!(kept.framebuffer().is_some_and(|fb| !fb.is_blank()));
}

#[test]
fn export_after_present_is_not_blank() {
    let tracker = TextureTracker::new();
    let store = store_with_base(&tracker);
    let mut r = FrameRenderer::new(RenderOpts::default());
    r.render(&store);
    r.present();

    let png = r.export_png(&store).unwrap();
    let img = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (4, 4));
    assert_eq!(img.get_pixel(2, 2).0[3], 255);
}

#[test]
fn invalid_canvas_draws_nothing() {
    let mut store = MockupStore::new(GlobalSettings {
        canvas_width: 0,
        ..GlobalSettings::default()
    });
    store.add_layer(color_layer(1, 0, HexColor::WHITE)).unwrap();
    let mut r = FrameRenderer::new(RenderOpts::default());
    let stats = r.render(&store);
    assert_eq!(stats.draw_calls, 0);
    assert_eq!(stats.skipped_layers, 0);
    assert!(r.framebuffer().is_none());
}
