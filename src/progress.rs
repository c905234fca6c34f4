use serde::Deserialize;
use std::collections::HashMap;

use crate::streaming::DecodedEvent;

const SUCCESS_STATUS: &str = "success";

/// One line of model download progress
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PullProgress {
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub completed: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PullProgress {
    /// Layers are keyed by digest, falling back to the status text
    pub fn key(&self) -> &str {
        self.digest
            .as_deref()
            .or(self.status.as_deref())
            .unwrap_or_default()
    }
}

/// Latest known progress of one layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerProgress {
    pub completed: u64,
    pub total: u64,
}

impl LayerProgress {
    pub fn fraction(&self) -> Option<f64> {
        (self.total > 0).then(|| self.completed.min(self.total) as f64 / self.total as f64)
    }
}

/// Download state folded from a progress stream, owned by whoever drives it
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    layers: HashMap<String, LayerProgress>,
    order: Vec<String>,
    status: Option<String>,
    error: Option<String>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event, returning the parsed update
    pub fn apply(&mut self, event: &DecodedEvent) -> serde_json::Result<PullProgress> {
        let update: PullProgress = event.payload_as()?;
        self.record(&update);
        Ok(update)
    }

    pub fn record(&mut self, update: &PullProgress) {
        if let Some(status) = &update.status {
            self.status = Some(status.clone());
        }
        if let Some(error) = &update.error {
            self.error = Some(error.clone());
        }

        if update.completed.is_none() && update.total.is_none() {
            return;
        }

        let key = update.key().to_string();
        if !self.layers.contains_key(&key) {
            self.order.push(key.clone());
        }
        let layer = self.layers.entry(key).or_default();
        if let Some(completed) = update.completed {
            layer.completed = completed;
        }
        if let Some(total) = update.total {
            layer.total = total;
        }
    }

    pub fn layer(&self, key: &str) -> Option<LayerProgress> {
        self.layers.get(key).copied()
    }

    /// Layers in the order they first appeared
    pub fn layers(&self) -> impl Iterator<Item = (&str, LayerProgress)> {
        self.order
            .iter()
            .filter_map(|key| self.layers.get(key).map(|layer| (key.as_str(), *layer)))
    }

    /// Completed and total bytes summed over every layer
    pub fn overall(&self) -> LayerProgress {
        self.layers
            .values()
            .fold(LayerProgress::default(), |acc, layer| LayerProgress {
                completed: acc.completed.saturating_add(layer.completed),
                total: acc.total.saturating_add(layer.total),
            })
    }

    pub fn percent(&self) -> Option<f64> {
        self.overall().fraction().map(|f| f * 100.0)
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some(SUCCESS_STATUS)
    }
}
