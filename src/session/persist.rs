use std::sync::Mutex;

use crate::document::model::LayerId;
use crate::foundation::core::HexColor;
use crate::foundation::error::{MockupError, MockupResult};

/// Shading parameters of one layer, as sent back to storage after a user edit.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadingUpdate {
    /// Edited layer.
    pub layer_id: LayerId,
    /// Flat color; only present for color layers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<HexColor>,
    /// Shadow strength.
    pub shadow_intensity: f32,
    /// Highlight strength.
    pub highlight_intensity: f32,
    /// Noise amplitude.
    pub noise_threshold: f32,
}

/// Destination for persisted shading edits.
pub trait EditSink: Send + Sync {
    /// Store `update`, replacing earlier values for the same layer.
    fn persist(&self, update: &ShadingUpdate) -> MockupResult<()>;
}

/// Sink keeping updates in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryEditSink {
    updates: Mutex<Vec<ShadingUpdate>>,
}

impl MemoryEditSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates received so far.
    pub fn updates(&self) -> Vec<ShadingUpdate> {
        self.updates
            .lock()
            .map(|u| u.clone())
            .unwrap_or_default()
    }

    /// Latest update for `layer`, if any.
    pub fn latest(&self, layer: LayerId) -> Option<ShadingUpdate> {
        self.updates()
            .into_iter()
            .rev()
            .find(|u| u.layer_id == layer)
    }
}

impl EditSink for MemoryEditSink {
    fn persist(&self, update: &ShadingUpdate) -> MockupResult<()> {
        self.updates
            .lock()
            .map_err(|_| MockupError::invalid_input("edit sink lock poisoned"))?
            .push(update.clone());
        Ok(())
    }
}
