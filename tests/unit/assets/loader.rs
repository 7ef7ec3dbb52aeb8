use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::assets::source::MemorySource;

fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let raw: Vec<u8> = rgba
        .iter()
        .copied()
        .cycle()
        .take((width * height * 4) as usize)
        .collect();
    let img = image::RgbaImage::from_raw(width, height, raw).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// Counts fetches and optionally cancels a token from inside the fetch.
struct CountingSource {
    inner: MemorySource,
    fetches: Arc<AtomicUsize>,
    cancel_on_fetch: Option<CancelToken>,
}

impl TextureSource for CountingSource {
    fn fetch(&self, url: &str) -> MockupResult<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = &self.cancel_on_fetch {
            token.cancel();
        }
        self.inner.fetch(url)
    }
}

#[tokio::test]
async fn partial_failure_keeps_valid_slots() {
    let source = MemorySource::new().with("good.png", png_bytes(2, 2, [10, 20, 30, 255]));
    let loader = TextureLoader::new(Arc::new(source));

    let requests = TextureRequests::new()
        .with(
            "mask",
            Some(TextureRequest::new("good.png", TextureUsage::Mask)),
        )
        .with(
            "design",
            Some(TextureRequest::new("missing.png", TextureUsage::Color)),
        )
        .with("uv", None);

    let batch = loader
        .load_batch(&requests, &CancelToken::new())
        .await
        .into_batch()
        .expect("not cancelled");

    assert!(batch.get("mask").is_some());
    assert!(batch.get("design").is_none());
    assert!(batch.get("uv").is_none());
    assert!(batch.contains_slot("uv"));
    assert_eq!(batch.loaded_count(), 1);
    assert!(!batch.has_all(&["mask", "design"]));
    assert!(!loader.loading_flag().is_loading());
}

#[tokio::test]
async fn slot_configuration_follows_usage() {
    let source = MemorySource::new()
        .with("base.png", png_bytes(4, 4, [128, 128, 128, 255]))
        .with("mask.png", png_bytes(4, 4, [255, 255, 255, 255]));
    let loader = TextureLoader::new(Arc::new(source));
    let requests = TextureRequests::new()
        .with(
            "base",
            Some(TextureRequest::new("base.png", TextureUsage::Color)),
        )
        .with(
            "mask",
            Some(TextureRequest::new("mask.png", TextureUsage::Mask)),
        );

    let batch = loader
        .load_batch(&requests, &CancelToken::new())
        .await
        .into_batch()
        .unwrap();
    let base = batch.get("base").unwrap();
    assert_eq!(base.desc().color_space, crate::assets::texture::ColorSpace::Srgb);
    assert!(base.mip_levels() > 1);
    let mask = batch.get("mask").unwrap();
    assert_eq!(mask.desc().color_space, crate::assets::texture::ColorSpace::None);
}

#[tokio::test]
async fn identical_requests_are_fetched_once() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let source = CountingSource {
        inner: MemorySource::new().with("same.png", png_bytes(1, 1, [0, 0, 0, 255])),
        fetches: Arc::clone(&fetches),
        cancel_on_fetch: None,
    };
    let loader = TextureLoader::new(Arc::new(source));
    let requests = TextureRequests::new()
        .with("a", Some(TextureRequest::new("same.png", TextureUsage::Mask)))
        .with("b", Some(TextureRequest::new("same.png", TextureUsage::Mask)));

    let batch = loader
        .load_batch(&requests, &CancelToken::new())
        .await
        .into_batch()
        .unwrap();
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(batch.get("a"), batch.get("b"));
    assert_eq!(loader.tracker().stats().created, 1);
}

#[tokio::test]
async fn cancellation_after_fetch_disposes_result() {
    let token = CancelToken::new();
    let source = CountingSource {
        inner: MemorySource::new().with("late.png", png_bytes(2, 2, [255, 0, 0, 255])),
        fetches: Arc::new(AtomicUsize::new(0)),
        cancel_on_fetch: Some(token.clone()),
    };
    let loader = TextureLoader::new(Arc::new(source));
    let requests = TextureRequests::new().with(
        "design",
        Some(TextureRequest::new("late.png", TextureUsage::Color)),
    );

    let outcome = loader.load_batch(&requests, &token).await;
    assert!(outcome.is_canceled());

    let stats = loader.tracker().stats();
    assert_eq!(stats.created, 1);
    assert_eq!(stats.disposed, 1);
    assert_eq!(stats.live(), 0);
    assert!(!loader.loading_flag().is_loading());
}

#[tokio::test]
async fn pre_cancelled_batch_does_not_fetch() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let source = CountingSource {
        inner: MemorySource::new(),
        fetches: Arc::clone(&fetches),
        cancel_on_fetch: None,
    };
    let loader = TextureLoader::new(Arc::new(source));
    let token = CancelToken::new();
    token.cancel();
    let requests = TextureRequests::new().with(
        "mask",
        Some(TextureRequest::new("x.png", TextureUsage::Mask)),
    );
    assert!(loader.load_batch(&requests, &token).await.is_canceled());
    assert_eq!(fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn oversized_images_fail_their_slot() {
    let source = MemorySource::new().with("big.png", png_bytes(16, 4, [0, 0, 0, 255]));
    let loader = TextureLoader::with_opts(Arc::new(source), LoaderOpts { max_dimension: 8 });
    let requests = TextureRequests::new().with(
        "base",
        Some(TextureRequest::new("big.png", TextureUsage::Color)),
    );
    let batch = loader
        .load_batch(&requests, &CancelToken::new())
        .await
        .into_batch()
        .unwrap();
    assert!(batch.get("base").is_none());

    // The limit applies to the source image, before any crop.
    let cropped = TextureRequests::new().with(
        "design",
        Some(
            TextureRequest::new("big.png", TextureUsage::Color).with_crop(Some(CropRect {
                x: 0.0,
                y: 0.0,
                width: 2.0,
                height: 2.0,
            })),
        ),
    );
    let batch = loader
        .load_batch(&cropped, &CancelToken::new())
        .await
        .into_batch()
        .unwrap();
    assert!(batch.get("design").is_none());
    assert_eq!(loader.tracker().stats().created, 0);
}

#[tokio::test]
async fn crop_is_applied_before_upload() {
    let source = MemorySource::new().with("design.png", png_bytes(8, 6, [1, 2, 3, 255]));
    let loader = TextureLoader::new(Arc::new(source));
    let crop = CropRect {
        x: 2.0,
        y: 1.0,
        width: 4.0,
        height: 3.0,
    };
    let requests = TextureRequests::new().with(
        "design",
        Some(TextureRequest::new("design.png", TextureUsage::Color).with_crop(Some(crop))),
    );
    let batch = loader
        .load_batch(&requests, &CancelToken::new())
        .await
        .into_batch()
        .unwrap();
    let tex = batch.get("design").unwrap();
    assert_eq!((tex.width(), tex.height()), (4, 3));
}
