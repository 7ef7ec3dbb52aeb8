use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        MockupError::invalid_input("x")
            .to_string()
            .contains("invalid input:")
    );
    assert!(
        MockupError::singular("x")
            .to_string()
            .contains("singular matrix:")
    );
    assert!(
        MockupError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(MockupError::load("x").to_string().contains("load error:"));
    assert!(MockupError::export("x").to_string().contains("export error:"));
    assert!(
        MockupError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = MockupError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
