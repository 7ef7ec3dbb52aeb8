use std::{collections::BTreeMap, sync::Arc};

use tokio::task::JoinSet;

use crate::{
    assets::cancel::{CancelToken, LoadingFlag},
    assets::decode::{crop_decoded, decode_texels, read_dimensions},
    assets::source::TextureSource,
    assets::texture::{SourceFormat, Texture, TextureDesc, TextureTracker, TextureUsage},
    foundation::core::CropRect,
    foundation::error::{MockupError, MockupResult},
};

/// One slot's load request.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureRequest {
    /// Resolved URL handed to the [`TextureSource`].
    pub url: String,
    /// Slot semantics; selects color space, filtering and mipmaps.
    pub usage: TextureUsage,
    /// Explicit source format. `None` guesses from the URL extension.
    pub format: Option<SourceFormat>,
    /// Pixel rectangle cut out of the decoded image before upload.
    pub crop: Option<CropRect>,
}

impl TextureRequest {
    /// Request `url` for `usage` with format detection and no crop.
    pub fn new(url: impl Into<String>, usage: TextureUsage) -> Self {
        Self {
            url: url.into(),
            usage,
            format: None,
            crop: None,
        }
    }

    /// Attach a crop rectangle.
    pub fn with_crop(mut self, crop: Option<CropRect>) -> Self {
        self.crop = crop;
        self
    }

    /// Effective source format.
    pub fn source_format(&self) -> SourceFormat {
        self.format
            .unwrap_or_else(|| SourceFormat::from_url(&self.url))
    }

    // Requests with equal keys share one fetch and one texture.
    fn dedupe_key(&self) -> String {
        let crop = self
            .crop
            .map(|c| {
                format!(
                    "{:x}:{:x}:{:x}:{:x}",
                    c.x.to_bits(),
                    c.y.to_bits(),
                    c.width.to_bits(),
                    c.height.to_bits()
                )
            })
            .unwrap_or_default();
        format!(
            "{}\u{0}{:?}\u{0}{:?}\u{0}{crop}",
            self.url,
            self.usage,
            self.source_format()
        )
    }
}

/// Named slots to load; any slot may be absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextureRequests {
    slots: BTreeMap<String, Option<TextureRequest>>,
}

impl TextureRequests {
    /// No slots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or clear, with `None`) a slot.
    pub fn insert(&mut self, slot: impl Into<String>, request: Option<TextureRequest>) {
        self.slots.insert(slot.into(), request);
    }

    /// Builder-style [`TextureRequests::insert`].
    pub fn with(mut self, slot: impl Into<String>, request: Option<TextureRequest>) -> Self {
        self.insert(slot, request);
        self
    }

    /// Number of slots, present or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether there are no slots at all.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate slots in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&TextureRequest>)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

/// Best-effort result of a batch: each slot holds a texture or `None` (absent or failed).
#[derive(Debug, Default)]
pub struct TextureBatch {
    slots: BTreeMap<String, Option<Texture>>,
}

impl TextureBatch {
    /// Texture loaded for `slot`, if any.
    pub fn get(&self, slot: &str) -> Option<&Texture> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Move the texture for `slot` out of the batch.
    pub fn take(&mut self, slot: &str) -> Option<Texture> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    /// Whether `slot` was part of the request.
    pub fn contains_slot(&self, slot: &str) -> bool {
        self.slots.contains_key(slot)
    }

    /// Number of slots that resolved to a texture.
    pub fn loaded_count(&self) -> usize {
        self.slots.values().filter(|t| t.is_some()).count()
    }

    /// Whether every listed slot holds a texture.
    pub fn has_all(&self, slots: &[&str]) -> bool {
        slots.iter().all(|s| self.get(s).is_some())
    }

    /// Drop every texture in the batch.
    pub fn dispose(self) {
        for tex in self.slots.into_values().flatten() {
            tex.dispose();
        }
    }
}

/// Outcome of [`TextureLoader::load_batch`].
#[derive(Debug)]
pub enum LoadOutcome {
    /// Every slot resolved (successfully or to `None`).
    Loaded(TextureBatch),
    /// The token was cancelled; every arriving texture was disposed.
    Canceled,
}

impl LoadOutcome {
    /// Return the batch, or `None` when cancelled.
    pub fn into_batch(self) -> Option<TextureBatch> {
        match self {
            Self::Loaded(batch) => Some(batch),
            Self::Canceled => None,
        }
    }

    /// Whether the batch was cancelled.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

/// Loader configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoaderOpts {
    /// Largest accepted width or height; bigger images fail their slot.
    pub max_dimension: u32,
}

impl Default for LoaderOpts {
    fn default() -> Self {
        Self {
            max_dimension: 8192,
        }
    }
}

/// Asynchronous batch loader turning URLs into configured textures.
#[derive(Clone)]
pub struct TextureLoader {
    source: Arc<dyn TextureSource>,
    tracker: TextureTracker,
    loading: LoadingFlag,
    opts: LoaderOpts,
}

impl TextureLoader {
    /// Loader over `source` with default options.
    pub fn new(source: Arc<dyn TextureSource>) -> Self {
        Self::with_opts(source, LoaderOpts::default())
    }

    /// Loader over `source` with explicit options.
    pub fn with_opts(source: Arc<dyn TextureSource>, opts: LoaderOpts) -> Self {
        Self {
            source,
            tracker: TextureTracker::new(),
            loading: LoadingFlag::new(),
            opts,
        }
    }

    /// Counters for every texture this loader created.
    pub fn tracker(&self) -> &TextureTracker {
        &self.tracker
    }

    /// Shared loading indicator, set while any batch is in flight.
    pub fn loading_flag(&self) -> &LoadingFlag {
        &self.loading
    }

    /// Load every present slot concurrently.
    ///
    /// Failures are isolated per slot. Identical requests are fetched once and share a texture.
    /// If `cancel` fires, textures are disposed as they arrive and the outcome is
    /// [`LoadOutcome::Canceled`].
    #[tracing::instrument(skip_all, fields(slots = requests.len()))]
    pub async fn load_batch(
        &self,
        requests: &TextureRequests,
        cancel: &CancelToken,
    ) -> LoadOutcome {
        let _loading = self.loading.begin();
        if cancel.is_cancelled() {
            tracing::debug!("batch cancelled before start");
            return LoadOutcome::Canceled;
        }

        let mut unique: Vec<TextureRequest> = Vec::new();
        let mut key_index: BTreeMap<String, usize> = BTreeMap::new();
        let mut slot_index: Vec<(String, Option<usize>)> = Vec::with_capacity(requests.len());
        for (slot, request) in requests.iter() {
            let idx = request.map(|req| {
                *key_index.entry(req.dedupe_key()).or_insert_with(|| {
                    unique.push(req.clone());
                    unique.len() - 1
                })
            });
            slot_index.push((slot.to_string(), idx));
        }

        let mut tasks = JoinSet::new();
        for (idx, request) in unique.iter().cloned().enumerate() {
            let source = Arc::clone(&self.source);
            let tracker = self.tracker.clone();
            let max_dimension = self.opts.max_dimension;
            tasks.spawn_blocking(move || {
                let result = load_one(source.as_ref(), &request, &tracker, max_dimension);
                (idx, request.url, result)
            });
        }

        let mut loaded: Vec<Option<Texture>> = vec![None; unique.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, url, Ok(texture))) => {
                    if cancel.is_cancelled() {
                        tracing::debug!(%url, "disposing texture that arrived after cancellation");
                        texture.dispose();
                    } else {
                        loaded[idx] = Some(texture);
                    }
                }
                Ok((_, url, Err(err))) => {
                    tracing::warn!(%url, %err, "texture load failed");
                }
                Err(err) => {
                    tracing::warn!(%err, "texture load task did not complete");
                }
            }
        }

        if cancel.is_cancelled() {
            tracing::debug!("batch cancelled; dropping loaded textures");
            return LoadOutcome::Canceled;
        }

        let slots = slot_index
            .into_iter()
            .map(|(slot, idx)| (slot, idx.and_then(|i| loaded[i].clone())))
            .collect();
        LoadOutcome::Loaded(TextureBatch { slots })
    }
}

fn load_one(
    source: &dyn TextureSource,
    request: &TextureRequest,
    tracker: &TextureTracker,
    max_dimension: u32,
) -> MockupResult<Texture> {
    let format = request.source_format();
    let bytes = source.fetch(&request.url)?;
    let (width, height) = read_dimensions(&bytes, format)?;
    if width > max_dimension || height > max_dimension {
        return Err(MockupError::load(format!(
            "{width}x{height} exceeds the {max_dimension}px texture limit"
        )));
    }
    let mut image = decode_texels(&bytes, format)?;
    if let Some(crop) = &request.crop {
        image = crop_decoded(&image, crop)?;
    }
    let desc = TextureDesc::for_usage(request.usage, format);
    Ok(Texture::upload(image, desc, tracker))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
