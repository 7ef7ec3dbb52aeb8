use super::*;

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "mockup_source_test_{tag}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn normalize_path_slash_normalization() {
    assert_eq!(normalize_rel_path("a/b.png").unwrap(), "a/b.png");
    assert_eq!(normalize_rel_path("a\\b.png").unwrap(), "a/b.png");
    assert_eq!(normalize_rel_path("./a//b.png").unwrap(), "a/b.png");
    assert!(normalize_rel_path("../x.png").is_err());
    assert!(normalize_rel_path("/abs.png").is_err());
    assert!(normalize_rel_path("./").is_err());
}

#[test]
fn fs_source_reads_relative_and_file_urls() {
    let dir = temp_dir("fs");
    std::fs::create_dir_all(dir.join("masks")).unwrap();
    std::fs::write(dir.join("masks/m.png"), b"abc").unwrap();

    let src = FsSource::new(&dir);
    assert_eq!(src.fetch("masks/m.png").unwrap(), b"abc");

    let file_url = url::Url::from_file_path(dir.join("masks/m.png")).unwrap();
    assert_eq!(src.fetch(file_url.as_str()).unwrap(), b"abc");

    assert!(src.fetch("https://cdn.example.com/m.png").is_err());
    assert!(src.fetch("missing.png").is_err());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn blob_registry_mints_and_revokes_urls() {
    let blobs = BlobRegistry::new();
    let a = blobs.create_url(vec![1, 2, 3]);
    let b = blobs.create_url(vec![4]);
    assert_ne!(a, b);
    assert!(BlobRegistry::is_blob_url(&a));
    assert_eq!(blobs.len(), 2);

    let source = BlobSource::new(
        blobs.clone(),
        Arc::new(MemorySource::new().with("plain.png", vec![9])),
    );
    assert_eq!(source.fetch(&a).unwrap(), vec![1, 2, 3]);
    assert_eq!(source.fetch("plain.png").unwrap(), vec![9]);

    assert!(blobs.revoke(&a));
    assert!(!blobs.revoke(&a));
    assert!(source.fetch(&a).is_err());

    blobs.revoke_all();
    assert!(blobs.is_empty());
}
