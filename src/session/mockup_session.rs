use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::assets::cancel::{CancelOnDrop, CancelToken};
use crate::assets::loader::{LoadOutcome, TextureLoader, TextureRequest, TextureRequests};
use crate::assets::source::{BlobRegistry, BlobSource, TextureSource};
use crate::assets::texture::{Texture, TextureStats, TextureUsage};
use crate::document::model::{LayerId, LayerKind};
use crate::document::schema::MockupDocument;
use crate::foundation::error::{MockupError, MockupResult};
use crate::render::renderer::{FrameRenderer, FrameStats};
use crate::render::unit::{LayerSources, LayerTextures};
use crate::session::config::SessionOpts;
use crate::session::persist::{EditSink, ShadingUpdate};
use crate::store::patch::LayerPatch;
use crate::store::state::MockupStore;

const SLOT_BASE: &str = "base";
const SLOT_UV: &str = "uv";
const SLOT_MASK: &str = "mask";
const SLOT_DESIGN: &str = "design";

/// Texture set a load belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadKey {
    /// Shared base photo and UV remap.
    Global,
    /// Mask and design of one layer.
    Layer(LayerId),
}

#[derive(Clone, Debug, PartialEq)]
enum LoadSources {
    Global(Option<String>, Option<String>),
    Layer(LayerSources),
}

#[derive(Debug)]
struct InFlight {
    token: CancelToken,
    generation: u64,
    sources: LoadSources,
}

/// A planned texture batch, detached from the session so it can run on another task.
#[derive(Debug)]
pub struct LoadJob {
    key: LoadKey,
    generation: u64,
    sources: LoadSources,
    requests: TextureRequests,
    token: CancelToken,
    abandon: CancelOnDrop,
}

impl LoadJob {
    /// Texture set this job fills.
    pub fn key(&self) -> LoadKey {
        self.key
    }

    /// Token that aborts the job; also cancelled by the session when the job goes stale.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Fetch and decode every requested texture.
    ///
    /// Dropping the job, or the future, before it finishes cancels it; the session then plans
    /// the set again on its next pass.
    pub async fn run(self, loader: TextureLoader) -> LoadResult {
        let LoadJob {
            key,
            generation,
            sources,
            requests,
            token,
            abandon,
        } = self;
        let outcome = loader.load_batch(&requests, &token).await;
        abandon.disarm();
        LoadResult {
            key,
            generation,
            sources,
            outcome,
        }
    }
}

/// Finished [`LoadJob`], to be handed to [`MockupSession::commit`].
#[derive(Debug)]
pub struct LoadResult {
    key: LoadKey,
    generation: u64,
    sources: LoadSources,
    outcome: LoadOutcome,
}

impl LoadResult {
    /// Texture set this result fills.
    pub fn key(&self) -> LoadKey {
        self.key
    }

    /// Whether the batch was cancelled before it finished.
    pub fn is_canceled(&self) -> bool {
        self.outcome.is_canceled()
    }
}

/// Live editing session: the layer store, its renderer and the texture loads that feed it.
///
/// The session is the only writer. Loads are planned from the store, run concurrently and
/// committed back one texture set at a time; a set whose inputs changed meanwhile is disposed
/// instead of committed.
pub struct MockupSession {
    store: MockupStore,
    renderer: FrameRenderer,
    loader: TextureLoader,
    blobs: BlobRegistry,
    in_flight: HashMap<LoadKey, InFlight>,
    failed: HashMap<LoadKey, LoadSources>,
    uploads: HashMap<LayerId, String>,
    generation: u64,
}

impl std::fmt::Debug for MockupSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockupSession")
            .field("store", &self.store)
            .field("in_flight", &self.in_flight.len())
            .field("uploads", &self.uploads.len())
            .finish_non_exhaustive()
    }
}

impl MockupSession {
    /// Session over `store`, fetching bytes from `source` (plus session upload blobs).
    pub fn new(store: MockupStore, source: Arc<dyn TextureSource>, opts: SessionOpts) -> Self {
        let blobs = BlobRegistry::new();
        let loader = TextureLoader::with_opts(
            Arc::new(BlobSource::new(blobs.clone(), source)),
            opts.loader,
        );
        Self {
            store,
            renderer: FrameRenderer::new(opts.render),
            loader,
            blobs,
            in_flight: HashMap::new(),
            failed: HashMap::new(),
            uploads: HashMap::new(),
            generation: 0,
        }
    }

    /// Session seeded from a loaded document.
    pub fn from_document(
        doc: MockupDocument,
        source: Arc<dyn TextureSource>,
        opts: SessionOpts,
    ) -> MockupResult<Self> {
        let store = MockupStore::from_stack(doc.stack)?;
        Ok(Self::new(store, source, opts))
    }

    /// Layer stack.
    pub fn store(&self) -> &MockupStore {
        &self.store
    }

    /// Layer stack for direct mutation. Call [`MockupSession::sync`] afterwards.
    pub fn store_mut(&mut self) -> &mut MockupStore {
        &mut self.store
    }

    /// Frame renderer.
    pub fn renderer(&self) -> &FrameRenderer {
        &self.renderer
    }

    /// Loader the session's jobs run on.
    pub fn loader(&self) -> &TextureLoader {
        &self.loader
    }

    /// Session upload blobs.
    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    /// Counters of every texture this session created.
    pub fn texture_stats(&self) -> TextureStats {
        self.loader.tracker().stats()
    }

    /// Whether any texture batch is in flight.
    pub fn is_loading(&self) -> bool {
        self.store.is_loading() || self.loader.loading_flag().is_loading()
    }

    /// Texture sets currently being loaded.
    pub fn pending_loads(&self) -> usize {
        self.in_flight
            .values()
            .filter(|f| !f.token.is_cancelled())
            .count()
    }

    /// Work out which texture sets are missing or stale and return a job for each.
    ///
    /// Loads whose inputs changed, or whose layer is gone, are cancelled here.
    pub fn plan_loads(&mut self) -> Vec<LoadJob> {
        let mut jobs = Vec::new();

        let stale: Vec<LoadKey> = self
            .in_flight
            .keys()
            .filter(|k| match k {
                LoadKey::Global => false,
                LoadKey::Layer(id) => self.store.layer(*id).is_none(),
            })
            .copied()
            .collect();
        for key in stale {
            self.cancel(key, "layer removed");
        }
        self.failed.retain(|k, _| match k {
            LoadKey::Global => true,
            LoadKey::Layer(id) => self.store.layer(*id).is_some(),
        });
        let removed: Vec<LayerId> = self
            .uploads
            .keys()
            .filter(|id| self.store.layer(**id).is_none())
            .copied()
            .collect();
        for id in removed {
            if let Some(url) = self.uploads.remove(&id) {
                self.blobs.revoke(&url);
            }
        }

        let global = self.store.global();
        let wanted = LoadSources::Global(global.base.clone(), global.uv.clone());
        let committed = {
            let (base, uv) = &self.store.global_textures().sources;
            LoadSources::Global(base.clone(), uv.clone())
        };
        if let Some(job) = self.plan_one(LoadKey::Global, wanted, committed) {
            jobs.push(job);
        }

        let layers: Vec<(LayerId, LayerSources)> = self
            .store
            .layers()
            .iter()
            .map(|l| (l.id, LayerSources::of(l)))
            .collect();
        for (id, wanted) in layers {
            let committed = self
                .renderer
                .unit(id)
                .map(|u| u.textures().sources.clone())
                .unwrap_or_default();
            if let Some(job) = self.plan_one(
                LoadKey::Layer(id),
                LoadSources::Layer(wanted),
                LoadSources::Layer(committed),
            ) {
                jobs.push(job);
            }
        }

        tracing::debug!(jobs = jobs.len(), "planned texture loads");
        jobs
    }

    fn plan_one(
        &mut self,
        key: LoadKey,
        wanted: LoadSources,
        committed: LoadSources,
    ) -> Option<LoadJob> {
        if wanted == committed || self.failed.get(&key) == Some(&wanted) {
            self.cancel(key, "inputs back to the committed set");
            return None;
        }
        if self
            .in_flight
            .get(&key)
            .is_some_and(|f| f.sources == wanted && !f.token.is_cancelled())
        {
            return None;
        }
        self.cancel(key, "inputs changed");
        self.failed.remove(&key);

        let requests = requests_for(&wanted, &committed);
        if requests.iter().all(|(_, r)| r.is_none()) {
            // Nothing to fetch: the new inputs only clear slots.
            self.install_empty(key, wanted);
            return None;
        }

        self.generation += 1;
        let token = CancelToken::new();
        self.in_flight.insert(
            key,
            InFlight {
                token: token.clone(),
                generation: self.generation,
                sources: wanted.clone(),
            },
        );
        Some(LoadJob {
            key,
            generation: self.generation,
            sources: wanted,
            requests,
            abandon: CancelOnDrop::new(token.clone()),
            token,
        })
    }

    fn install_empty(&mut self, key: LoadKey, wanted: LoadSources) {
        match (key, wanted) {
            (LoadKey::Global, LoadSources::Global(base_url, uv_url)) => {
                self.install_global(base_url, uv_url, None, None);
            }
            (LoadKey::Layer(id), LoadSources::Layer(sources)) => {
                if let Some(layer) = self.store.layer(id) {
                    tracing::debug!(layer = %id, "texture sources cleared");
                    self.renderer.commit_layer_textures(
                        layer,
                        LayerTextures {
                            sources,
                            ..LayerTextures::default()
                        },
                    );
                }
            }
            (key, _) => tracing::warn!(?key, "texture sources do not match their load key"),
        }
    }

    // Slots whose URL did not change keep their committed handle.
    fn install_global(
        &mut self,
        base_url: Option<String>,
        uv_url: Option<String>,
        base: Option<Texture>,
        uv: Option<Texture>,
    ) -> bool {
        let committed = self.store.global_textures();
        let base = base.or_else(|| {
            (committed.sources.0 == base_url)
                .then(|| committed.base.clone())
                .flatten()
        });
        let uv = uv.or_else(|| {
            (committed.sources.1 == uv_url)
                .then(|| committed.uv.clone())
                .flatten()
        });
        self.store.set_global_textures((base_url, uv_url), base, uv)
    }

    fn abandon(&mut self, key: LoadKey, generation: u64) {
        if self
            .in_flight
            .get(&key)
            .is_some_and(|f| f.generation == generation)
        {
            self.cancel(key, "load abandoned");
        }
    }

    fn cancel(&mut self, key: LoadKey, reason: &str) {
        if let Some(prev) = self.in_flight.remove(&key) {
            tracing::debug!(?key, reason, "cancelling texture load");
            prev.token.cancel();
        }
    }

    /// Install a finished load. Returns `true` when textures were committed.
    ///
    /// Results that were cancelled, superseded, or are missing a required texture are disposed.
    pub fn commit(&mut self, result: LoadResult) -> bool {
        let LoadResult {
            key,
            generation,
            sources,
            outcome,
        } = result;
        let current = self
            .in_flight
            .get(&key)
            .is_some_and(|f| f.generation == generation);
        if current {
            self.in_flight.remove(&key);
        }
        let Some(mut batch) = outcome.into_batch() else {
            return false;
        };
        if !current {
            tracing::debug!(?key, "disposing superseded texture batch");
            batch.dispose();
            return false;
        }

        match (key, sources) {
            (LoadKey::Global, LoadSources::Global(base_url, uv_url)) => {
                let base = batch.take(SLOT_BASE);
                let uv = batch.take(SLOT_UV);
                let installed = self.install_global(base_url, uv_url, base, uv);
                let textures = self.store.global_textures();
                if (textures.sources.0.is_some() && textures.base.is_none())
                    || (textures.sources.1.is_some() && textures.uv.is_none())
                {
                    tracing::warn!("base or UV texture failed to load");
                }
                installed
            }
            (LoadKey::Layer(id), LoadSources::Layer(sources)) => {
                let Some(layer) = self.store.layer(id) else {
                    batch.dispose();
                    return false;
                };
                let mut required = vec![SLOT_MASK];
                if sources.design.is_some() {
                    required.push(SLOT_DESIGN);
                }
                if !batch.has_all(&required) {
                    tracing::warn!(layer = %id, "incomplete texture set; layer stays hidden");
                    batch.dispose();
                    self.failed.insert(key, LoadSources::Layer(sources));
                    return false;
                }
                let textures = LayerTextures {
                    mask: batch.take(SLOT_MASK),
                    design: batch.take(SLOT_DESIGN),
                    sources,
                };
                self.renderer.commit_layer_textures(layer, textures);
                true
            }
            (key, _) => {
                tracing::warn!(?key, "texture batch does not match its load key");
                batch.dispose();
                false
            }
        }
    }

    /// Load every missing texture set and commit the results. Returns how many sets were
    /// committed.
    ///
    /// Dropping the returned future cancels every load it started and clears the loading flag.
    #[tracing::instrument(skip_all)]
    pub async fn sync(&mut self) -> usize {
        let jobs = self.plan_loads();
        if jobs.is_empty() {
            return 0;
        }
        let loader = self.loader.clone();
        let scope = SyncScope {
            planned: jobs.iter().map(|j| (j.key, j.generation)).collect(),
            session: self,
        };
        scope.session.store.set_loading(true);

        let mut tasks = JoinSet::new();
        for job in jobs {
            tasks.spawn(job.run(loader.clone()));
        }
        let mut committed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => {
                    if scope.session.commit(result) {
                        committed += 1;
                    }
                }
                Err(err) => tracing::warn!(%err, "texture load task did not complete"),
            }
        }
        committed
    }

    /// Use uploaded image bytes as the design of layer `id`.
    ///
    /// The bytes are served from a session blob URL; the layer's previous upload is revoked.
    pub fn upload_design(&mut self, id: LayerId, bytes: Vec<u8>) -> MockupResult<String> {
        let layer = self
            .store
            .layer(id)
            .ok_or_else(|| MockupError::invalid_input(format!("unknown {id}")))?;
        if layer.kind != LayerKind::Design {
            return Err(MockupError::invalid_input(format!(
                "{id} is not a design layer"
            )));
        }
        let url = self.blobs.create_url(bytes);
        self.store.update_layer(
            id,
            LayerPatch {
                design: Some(Some(url.clone())),
                ..LayerPatch::default()
            },
        )?;
        if let Some(previous) = self.uploads.insert(id, url.clone()) {
            self.blobs.revoke(&previous);
        }
        Ok(url)
    }

    /// Draw and present one frame.
    pub fn render(&mut self) -> FrameStats {
        let stats = self.renderer.render(&self.store);
        self.renderer.present();
        stats
    }

    /// PNG snapshot of the current composite.
    pub fn export_png(&mut self) -> MockupResult<Vec<u8>> {
        self.renderer.export_png(&self.store)
    }

    /// Current shading parameters of layer `id`, in persisted form.
    pub fn shading_update(&self, id: LayerId) -> Option<ShadingUpdate> {
        let layer = self.store.layer(id)?;
        Some(ShadingUpdate {
            layer_id: id,
            color: (layer.kind == LayerKind::Color).then_some(layer.color),
            shadow_intensity: layer.shadow_intensity,
            highlight_intensity: layer.highlight_intensity,
            noise_threshold: layer.noise_threshold,
        })
    }

    /// Send the shading parameters of layer `id` to `sink`.
    pub fn persist_shading(&self, id: LayerId, sink: &dyn EditSink) -> MockupResult<()> {
        let update = self
            .shading_update(id)
            .ok_or_else(|| MockupError::invalid_input(format!("unknown {id}")))?;
        sink.persist(&update)
    }

    /// Cancel every load and release every upload blob.
    pub fn shutdown(&mut self) {
        for (key, f) in self.in_flight.drain() {
            tracing::debug!(?key, "cancelling texture load on shutdown");
            f.token.cancel();
        }
        self.uploads.clear();
        self.blobs.revoke_all();
        self.store.set_loading(false);
    }
}

// Ends a `sync` pass on every exit path, including a dropped future.
struct SyncScope<'a> {
    session: &'a mut MockupSession,
    planned: Vec<(LoadKey, u64)>,
}

impl Drop for SyncScope<'_> {
    fn drop(&mut self) {
        for (key, generation) in self.planned.drain(..) {
            self.session.abandon(key, generation);
        }
        self.session.store.set_loading(false);
    }
}

// Global slots are only fetched when their URL differs from the committed one.
fn requests_for(wanted: &LoadSources, committed: &LoadSources) -> TextureRequests {
    match wanted {
        LoadSources::Global(base, uv) => {
            let (kept_base, kept_uv) = match committed {
                LoadSources::Global(b, u) => (b == base, u == uv),
                LoadSources::Layer(_) => (false, false),
            };
            TextureRequests::new()
                .with(
                    SLOT_BASE,
                    base.as_ref()
                        .filter(|_| !kept_base)
                        .map(|u| TextureRequest::new(u.clone(), TextureUsage::Color)),
                )
                .with(
                    SLOT_UV,
                    uv.as_ref()
                        .filter(|_| !kept_uv)
                        .map(|u| TextureRequest::new(u.clone(), TextureUsage::Data)),
                )
        }
        LoadSources::Layer(s) => {
            let design_usage = if s.warped {
                TextureUsage::Warp
            } else {
                TextureUsage::Color
            };
            TextureRequests::new()
                .with(
                    SLOT_MASK,
                    s.mask
                        .as_ref()
                        .map(|u| TextureRequest::new(u.clone(), TextureUsage::Mask)),
                )
                .with(
                    SLOT_DESIGN,
                    s.design.as_ref().map(|u| {
                        TextureRequest::new(u.clone(), design_usage).with_crop(s.design_crop)
                    }),
                )
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/mockup_session.rs"]
mod tests;
