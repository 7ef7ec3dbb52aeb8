use super::*;
use crate::assets::texture::{SourceFormat, TextureDesc, TextureTracker, TextureUsage};
use crate::foundation::core::HexColor;
use crate::shading::constants::ShadingConstants;
use crate::shading::program::{ProgramKind, ProgramRegistry};

fn unit_for(layer: &Layer) -> ShadingUnit {
    let mut registry = ProgramRegistry::new(ShadingConstants::default());
    ShadingUnit::new(layer, registry.get(ProgramKind::for_layer(layer.kind)))
}

fn tex(usage: TextureUsage, tracker: &TextureTracker) -> Texture {
    Texture::solid(
        [1.0; 4],
        2,
        2,
        TextureDesc::for_usage(usage, SourceFormat::Raster),
        tracker,
    )
}

fn placement() -> NormalizedBox {
    NormalizedBox {
        top_left: crate::foundation::core::Point::new(0.1, 0.1),
        ..NormalizedBox::UNIT
    }
}

#[test]
fn sources_follow_layer_kind() {
    let color = Layer::color(LayerId(1), 10.0, 10.0, "m.png").with_design("d.png");
    let s = LayerSources::of(&color);
    assert_eq!(s.mask.as_deref(), Some("m.png"));
    assert_eq!(s.design, None);

    let mut design = Layer::design(LayerId(2), 10.0, 10.0, "m.png").with_design("d.png");
    design.cropped_area_pixels = Some(CropRect {
        x: 1.0,
        y: 2.0,
        width: 3.0,
        height: 4.0,
    });
    let s = LayerSources::of(&design);
    assert_eq!(s.design.as_deref(), Some("d.png"));
    assert!(s.design_crop.is_some());
}

#[test]
fn sync_reports_only_changed_values() {
    let layer = Layer::color(LayerId(1), 10.0, 10.0, "m.png")
        .with_color(HexColor::rgb(0, 0, 255))
        .with_shading(1.0, 2.0, 0.0);
    let global = GlobalSettings::default();
    let mut unit = unit_for(&layer);

    assert_eq!(unit.sync_uniforms(&layer, &global), 3);
    assert_eq!(unit.sync_uniforms(&layer, &global), 0);

    let dimmer = layer.clone().with_shading(0.5, 2.0, 0.0);
    assert_eq!(unit.sync_uniforms(&dimmer, &global), 1);
    assert_eq!(
        unit.uniforms().get(relit::SHADOW_INTENSITY),
        Some(UniformValue::Float(0.5))
    );
}

#[test]
fn design_with_only_uv_is_not_ready() {
    let tracker = TextureTracker::new();
    let layer = Layer::design(LayerId(1), 10.0, 10.0, "m.png").with_design("d.png");
    let mut unit = unit_for(&layer);
    unit.sync_uniforms(&layer, &GlobalSettings::default());

    let globals = GlobalTextures {
        uv: Some(tex(TextureUsage::Data, &tracker)),
        ..GlobalTextures::default()
    };
    assert!(!unit.is_ready(&globals));

    unit.commit_textures(LayerTextures {
        sources: LayerSources::of(&layer),
        mask: Some(tex(TextureUsage::Mask, &tracker)),
        design: Some(tex(TextureUsage::Color, &tracker)),
    });
    // Own textures plus uv, but the base photo is still missing.
    assert!(!unit.is_ready(&globals));

    let globals = GlobalTextures {
        base: Some(tex(TextureUsage::Color, &tracker)),
        ..globals
    };
    assert!(unit.is_ready(&globals));
    assert!(!unit.is_ready(&GlobalTextures::default()));
}

#[test]
fn warped_design_does_not_need_uv() {
    let tracker = TextureTracker::new();
    let layer = Layer::design(LayerId(1), 10.0, 10.0, "m.png")
        .with_design("d.png")
        .with_placement(placement());
    let mut unit = unit_for(&layer);
    unit.sync_uniforms(&layer, &GlobalSettings::default());
    unit.commit_textures(LayerTextures {
        sources: LayerSources::of(&layer),
        mask: Some(tex(TextureUsage::Mask, &tracker)),
        design: Some(tex(TextureUsage::Warp, &tracker)),
    });
    assert!(!unit.is_ready(&GlobalTextures::default()));
    let globals = GlobalTextures {
        base: Some(tex(TextureUsage::Color, &tracker)),
        ..GlobalTextures::default()
    };
    assert!(unit.is_ready(&globals));
}

#[test]
fn committing_releases_the_previous_set() {
    let tracker = TextureTracker::new();
    let layer = Layer::color(LayerId(1), 10.0, 10.0, "m.png");
    let mut unit = unit_for(&layer);
    unit.commit_textures(LayerTextures {
        mask: Some(tex(TextureUsage::Mask, &tracker)),
        ..LayerTextures::default()
    });
    unit.commit_textures(LayerTextures {
        mask: Some(tex(TextureUsage::Mask, &tracker)),
        ..LayerTextures::default()
    });
    let stats = tracker.stats();
    assert_eq!(stats.created, 2);
    assert_eq!(stats.disposed, 1);
    assert_eq!(stats.live(), 1);

    drop(unit);
    assert_eq!(tracker.stats().live(), 0);
}

#[test]
fn mesh_follows_placement_and_design_readiness() {
    let tracker = TextureTracker::new();
    let opts = WarpOpts::default();
    let flat = Layer::design(LayerId(1), 10.0, 10.0, "m.png").with_design("d.png");
    let mut unit = unit_for(&flat);
    assert!(unit.mesh().is_none());

    unit.prepare_mesh(&flat, opts);
    assert_eq!(unit.mesh().map(WarpMesh::triangle_count), Some(2));

    let placed = flat.clone().with_placement(placement());
    unit.prepare_mesh(&placed, opts);
    assert!(unit.mesh().is_some_and(WarpMesh::is_placeholder));

    unit.commit_textures(LayerTextures {
        sources: LayerSources::of(&placed),
        mask: Some(tex(TextureUsage::Mask, &tracker)),
        design: Some(tex(TextureUsage::Warp, &tracker)),
    });
    unit.prepare_mesh(&placed, opts);
    assert_eq!(unit.mesh().map(WarpMesh::triangle_count), Some(512));
}
