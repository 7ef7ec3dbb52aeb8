use super::*;

#[test]
fn registry_compiles_each_program_once() {
    let mut reg = ProgramRegistry::new(ShadingConstants::default());
    let a = reg.get(ProgramKind::Color);
    let b = reg.get(ProgramKind::Color);
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(reg.compile_count(), 1);
    reg.get(ProgramKind::Design);
    reg.get(ProgramKind::Background);
    reg.get(ProgramKind::Design);
    assert_eq!(reg.compile_count(), 3);
}

#[test]
fn uniforms_start_from_schema_defaults() {
    let mut reg = ProgramRegistry::new(ShadingConstants::default());
    let u = reg.get(ProgramKind::Color).uniforms();
    assert_eq!(u.get("contrast"), Some(UniformValue::Float(1.0)));
    assert_eq!(u.get("color"), Some(UniformValue::Vec3([1.0; 3])));
    assert!(!u.declares("warped"));
}

#[test]
fn set_reports_changes_and_checks_types() {
    let mut reg = ProgramRegistry::new(ShadingConstants::default());
    let mut u = reg.get(ProgramKind::Color).uniforms();
    assert!(u.set("shadow_intensity", UniformValue::Float(2.0)).unwrap());
    assert!(!u.set("shadow_intensity", UniformValue::Float(2.0)).unwrap());
    assert!(matches!(
        u.set("shadow_intensity", UniformValue::Flag(true)),
        Err(MockupError::InvalidInput(_))
    ));
    assert!(u.set("nope", UniformValue::Float(0.0)).is_err());
}

#[test]
fn design_requirements_follow_warp_mode() {
    let mut reg = ProgramRegistry::new(ShadingConstants::default());
    let p = reg.get(ProgramKind::Design);
    let mut u = p.uniforms();
    assert!(p.required_textures(&u).contains(&TextureSlot::Uv));
    assert!(p.required_textures(&u).contains(&TextureSlot::Base));
    u.set("warped", UniformValue::Flag(true)).unwrap();
    assert!(!p.required_textures(&u).contains(&TextureSlot::Uv));
    assert!(p.required_textures(&u).contains(&TextureSlot::Design));
    assert!(p.required_textures(&u).contains(&TextureSlot::Base));
}

#[test]
fn program_kind_matches_layer_kind() {
    assert_eq!(ProgramKind::for_layer(LayerKind::Design), ProgramKind::Design);
    assert_eq!(ProgramKind::for_layer(LayerKind::Color), ProgramKind::Color);
}

#[test]
fn bindings_report_missing_slots() {
    let b = TextureBindings::default();
    assert!(b.has_all(&[]));
    assert!(!b.has_all(&[TextureSlot::Mask]));
}
