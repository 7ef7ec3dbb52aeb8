use crate::assets::texture::Texture;
use crate::document::model::{GlobalSettings, Group, GroupId, Layer, LayerId, LayerStack};
use crate::foundation::error::{MockupError, MockupResult};
use crate::store::patch::{GlobalPatch, GroupPatch, LayerPatch};

/// Notification emitted after every successful mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreEvent {
    /// A layer was appended.
    LayerAdded(LayerId),
    /// A layer was patched.
    LayerUpdated {
        /// Patched layer.
        id: LayerId,
        /// Whether its mask, design or design crop changed.
        sources_changed: bool,
    },
    /// A layer was deleted.
    LayerRemoved(LayerId),
    /// A group was appended.
    GroupAdded(GroupId),
    /// A group was renamed.
    GroupUpdated(GroupId),
    /// A group was deleted and its members released.
    GroupRemoved {
        /// Deleted group.
        id: GroupId,
        /// Layers whose membership was cleared.
        released: Vec<LayerId>,
    },
    /// A layer's membership was set or cleared.
    LayerGrouped {
        /// Affected layer.
        layer: LayerId,
        /// New group, if any.
        group: Option<GroupId>,
    },
    /// Global settings were patched.
    GlobalChanged {
        /// Whether the base or UV URL changed and the cached textures were dropped.
        textures_stale: bool,
    },
    /// Freshly loaded base/UV textures were installed.
    GlobalTexturesCommitted,
    /// The loading flag flipped.
    LoadingChanged(bool),
}

/// Base and UV textures shared by every layer.
#[derive(Clone, Debug, Default)]
pub struct GlobalTextures {
    /// Base photo.
    pub base: Option<Texture>,
    /// UV remap.
    pub uv: Option<Texture>,
    /// URLs the handles were loaded from, as `(base, uv)`.
    pub sources: (Option<String>, Option<String>),
}

/// Handle returned by [`MockupStore::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&StoreEvent) + Send>;

/// Single-writer container for the layer stack.
///
/// All state changes go through the mutation methods below; each one bumps
/// [`MockupStore::revision`] and notifies subscribers.
pub struct MockupStore {
    layers: Vec<Layer>,
    groups: Vec<Group>,
    global: GlobalSettings,
    textures: GlobalTextures,
    loading: bool,
    revision: u64,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl std::fmt::Debug for MockupStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockupStore")
            .field("layers", &self.layers.len())
            .field("groups", &self.groups.len())
            .field("global", &self.global)
            .field("loading", &self.loading)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl Default for MockupStore {
    fn default() -> Self {
        Self::new(GlobalSettings::default())
    }
}

impl MockupStore {
    /// Empty stack with the given global settings.
    pub fn new(global: GlobalSettings) -> Self {
        Self {
            layers: Vec::new(),
            groups: Vec::new(),
            global,
            textures: GlobalTextures::default(),
            loading: false,
            revision: 0,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Store seeded from a loaded document. Duplicate ids are rejected.
    pub fn from_stack(stack: LayerStack) -> MockupResult<Self> {
        let mut store = Self::new(stack.global);
        for group in stack.groups {
            store.add_group(group)?;
        }
        for layer in stack.layers {
            store.add_layer(layer)?;
        }
        store.revision = 0;
        Ok(store)
    }

    /// Layers in insertion order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Layers sorted by ascending `z_index`; ties keep insertion order.
    pub fn draw_order(&self) -> Vec<&Layer> {
        let mut ordered: Vec<&Layer> = self.layers.iter().collect();
        ordered.sort_by_key(|l| l.z_index);
        ordered
    }

    /// Layer by id.
    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Groups in insertion order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Group by id.
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Global settings.
    pub fn global(&self) -> &GlobalSettings {
        &self.global
    }

    /// Shared base/UV textures.
    pub fn global_textures(&self) -> &GlobalTextures {
        &self.textures
    }

    /// Whether a load batch is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Mutation counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Smallest id greater than every existing layer id.
    pub fn next_layer_id(&self) -> LayerId {
        LayerId(self.layers.iter().map(|l| l.id.0 + 1).max().unwrap_or(1))
    }

    /// Smallest id greater than every existing group id.
    pub fn next_group_id(&self) -> GroupId {
        GroupId(self.groups.iter().map(|g| g.id.0 + 1).max().unwrap_or(1))
    }

    /// Register a callback invoked after each mutation.
    pub fn subscribe(&mut self, f: impl FnMut(&StoreEvent) + Send + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscribers.push((id, Box::new(f)));
        id
    }

    /// Drop a subscription. Returns `false` when it was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(s, _)| *s != id);
        self.subscribers.len() != before
    }

    /// Append a layer.
    pub fn add_layer(&mut self, mut layer: Layer) -> MockupResult<LayerId> {
        if self.layer(layer.id).is_some() {
            return Err(MockupError::invalid_input(format!(
                "{} already exists",
                layer.id
            )));
        }
        layer.clamp_shading();
        let id = layer.id;
        self.layers.push(layer);
        self.emit(StoreEvent::LayerAdded(id));
        Ok(id)
    }

    /// Merge `patch` into layer `id`.
    pub fn update_layer(&mut self, id: LayerId, patch: LayerPatch) -> MockupResult<()> {
        let layer = self
            .layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| MockupError::invalid_input(format!("unknown {id}")))?;
        let sources_changed = patch.apply(layer);
        self.emit(StoreEvent::LayerUpdated {
            id,
            sources_changed,
        });
        Ok(())
    }

    /// Delete layer `id`, returning it.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<Layer> {
        let idx = self.layers.iter().position(|l| l.id == id)?;
        let layer = self.layers.remove(idx);
        self.emit(StoreEvent::LayerRemoved(id));
        Some(layer)
    }

    /// Append a group.
    pub fn add_group(&mut self, group: Group) -> MockupResult<GroupId> {
        if self.group(group.id).is_some() {
            return Err(MockupError::invalid_input(format!(
                "{} already exists",
                group.id
            )));
        }
        let id = group.id;
        self.groups.push(group);
        self.emit(StoreEvent::GroupAdded(id));
        Ok(id)
    }

    /// Merge `patch` into group `id`.
    pub fn update_group(&mut self, id: GroupId, patch: GroupPatch) -> MockupResult<()> {
        let group = self
            .groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| MockupError::invalid_input(format!("unknown {id}")))?;
        if let Some(name) = patch.name {
            group.name = name;
        }
        self.emit(StoreEvent::GroupUpdated(id));
        Ok(())
    }

    /// Delete group `id` and clear membership on its layers. Layers are never removed.
    pub fn remove_group(&mut self, id: GroupId) -> Option<Group> {
        let idx = self.groups.iter().position(|g| g.id == id)?;
        let group = self.groups.remove(idx);
        let mut released = Vec::new();
        for layer in &mut self.layers {
            if layer.group_id == Some(id) {
                layer.group_id = None;
                released.push(layer.id);
            }
        }
        self.emit(StoreEvent::GroupRemoved { id, released });
        Some(group)
    }

    /// Set or clear a layer's group. The group does not have to exist.
    pub fn assign_layer_to_group(
        &mut self,
        layer: LayerId,
        group: Option<GroupId>,
    ) -> MockupResult<()> {
        let l = self
            .layers
            .iter_mut()
            .find(|l| l.id == layer)
            .ok_or_else(|| MockupError::invalid_input(format!("unknown {layer}")))?;
        l.group_id = group;
        if let Some(g) = group
            && self.group(g).is_none()
        {
            tracing::debug!(%layer, group = %g, "layer assigned to unknown group");
        }
        self.emit(StoreEvent::LayerGrouped { layer, group });
        Ok(())
    }

    /// Merge `patch` into the global settings. Changing the base or UV URL drops the cached
    /// textures so the loader fetches them again.
    pub fn update_global(&mut self, patch: GlobalPatch) {
        let textures_stale = patch.apply(&mut self.global);
        if textures_stale {
            // Only the slot whose URL changed is dropped; the other stays bound.
            let t = &mut self.textures;
            if t.sources.0 != self.global.base {
                t.base = None;
                t.sources.0 = None;
            }
            if t.sources.1 != self.global.uv {
                t.uv = None;
                t.sources.1 = None;
            }
        }
        self.emit(StoreEvent::GlobalChanged { textures_stale });
    }

    /// Install loaded base/UV textures for the given source URLs.
    ///
    /// Returns `false` (and installs nothing) when the URLs no longer match the settings.
    pub fn set_global_textures(
        &mut self,
        sources: (Option<String>, Option<String>),
        base: Option<Texture>,
        uv: Option<Texture>,
    ) -> bool {
        if sources != (self.global.base.clone(), self.global.uv.clone()) {
            return false;
        }
        self.textures = GlobalTextures { base, uv, sources };
        self.emit(StoreEvent::GlobalTexturesCommitted);
        true
    }

    /// Flip the loading flag. No event is emitted when the value is unchanged.
    pub fn set_loading(&mut self, loading: bool) {
        if self.loading == loading {
            return;
        }
        self.loading = loading;
        self.emit(StoreEvent::LoadingChanged(loading));
    }

    /// Snapshot of layers, groups and settings.
    pub fn to_stack(&self) -> LayerStack {
        LayerStack {
            layers: self.layers.clone(),
            groups: self.groups.clone(),
            global: self.global.clone(),
        }
    }

    fn emit(&mut self, event: StoreEvent) {
        self.revision += 1;
        tracing::trace!(?event, revision = self.revision, "store mutation");
        for (_, f) in &mut self.subscribers {
            f(&event);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/state.rs"]
mod tests;
