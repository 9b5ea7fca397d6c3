//! Canvas state management.
//!
//! [`CanvasState`] owns the scene and the gesture interpreter, and runs
//! artwork loads on the ambient tokio runtime. Loads never touch the scene
//! from a worker task: each result is sent back over a channel and applied
//! by [`CanvasState::drain_loads`] on the caller's side. A result whose
//! layer was removed while it was loading is discarded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::event::{CanvasNotification, GestureEvent};
use crate::gesture::GestureInterpreter;
use crate::layer::{ArtworkImage, Layer, LayerId, Placement};
use crate::scene::{Scene, SceneSnapshot};
use crate::sync::{self, layer_from_record, ImageLoader, LayerRecord, LoadFailure};
use crate::{CanvasError, CanvasResult};

/// Poll interval used while waiting on loads that may never report back.
const WAIT_POLL: Duration = Duration::from_millis(20);

/// What a finished load turns into.
#[derive(Debug)]
enum LoadTarget {
    /// New artwork requested by the user.
    Artwork { placement: Placement, select: bool },
    /// A layer restored from a saved design. `rank` is the record's index.
    Restore { record: LayerRecord, rank: usize },
}

#[derive(Debug)]
struct PendingLoad {
    /// Distinguishes this load from earlier ones for the same layer.
    ticket: u64,
    handle: JoinHandle<()>,
    target: LoadTarget,
}

#[derive(Debug)]
struct LoadOutcome {
    id: LayerId,
    ticket: u64,
    result: CanvasResult<ArtworkImage>,
}

/// Result of applying a finished load.
#[derive(Debug)]
pub enum LoadEvent {
    /// Requested artwork was placed on the canvas.
    Placed(LayerId),
    /// A saved layer was restored.
    Restored(LayerId),
    /// The load failed; the scene is unchanged.
    Failed {
        /// The layer the load was for.
        id: LayerId,
        /// What went wrong.
        error: CanvasError,
    },
}

/// The complete interactive canvas: scene, gestures and in-flight loads.
#[derive(Debug)]
pub struct CanvasState {
    scene: Scene,
    gestures: GestureInterpreter,
    pending: HashMap<LayerId, PendingLoad>,
    next_ticket: u64,
    /// Record index of every layer that came from a restore.
    restored_rank: HashMap<LayerId, usize>,
    tx: mpsc::UnboundedSender<LoadOutcome>,
    rx: mpsc::UnboundedReceiver<LoadOutcome>,
    has_local_changes: bool,
}

impl CanvasState {
    /// Wrap a scene.
    #[must_use]
    pub fn new(scene: Scene) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            scene,
            gestures: GestureInterpreter::new(),
            pending: HashMap::new(),
            next_ticket: 0,
            restored_rank: HashMap::new(),
            tx,
            rx,
            has_local_changes: false,
        }
    }

    /// The scene.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable access to the scene for host-driven edits.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// The gesture interpreter.
    #[must_use]
    pub fn gestures(&self) -> &GestureInterpreter {
        &self.gestures
    }

    /// Feed one gesture event through the interpreter.
    pub fn process_gesture(&mut self, event: &GestureEvent) -> Option<CanvasNotification> {
        let notification = self.gestures.handle(&mut self.scene, event);
        if matches!(notification, Some(CanvasNotification::LayerUpdated(_))) {
            self.has_local_changes = true;
        }
        notification
    }

    /// Start loading artwork from `source` in the background.
    ///
    /// Returns the ID the layer will have once it arrives. The placement's
    /// source is set to `source`. With `select`, the layer is selected when
    /// it is placed.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Runtime`] when called outside a tokio runtime.
    pub fn request_artwork(
        &mut self,
        loader: Arc<dyn ImageLoader>,
        source: impl Into<String>,
        placement: Placement,
        select: bool,
    ) -> CanvasResult<LayerId> {
        let source = source.into();
        let id = placement.id.unwrap_or_default();
        let placement = placement.with_id(id).with_source(source.clone());
        self.spawn_load(loader, id, source, LoadTarget::Artwork { placement, select })?;
        tracing::debug!(%id, "Artwork requested");
        Ok(id)
    }

    /// Restore a saved design, loading every record's artwork concurrently.
    ///
    /// Records whose layer already exists, or is already loading, are
    /// skipped so edits made meanwhile are kept. Restored layers keep record
    /// order among themselves regardless of arrival order. Records that
    /// cannot be loaded at all are returned immediately.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Runtime`] when called outside a tokio runtime.
    pub fn restore_design(
        &mut self,
        records: &[LayerRecord],
        loader: &Arc<dyn ImageLoader>,
    ) -> CanvasResult<Vec<LoadFailure>> {
        let mut failures = Vec::new();
        for (rank, record) in records.iter().enumerate() {
            let checked = record
                .layer_id()
                .and_then(|id| record.image_source().map(|source| (id, source.to_string())));
            let (id, source) = match checked {
                Ok(found) => found,
                Err(error) => {
                    tracing::warn!("Skipping layer {}: {error}", record.id);
                    failures.push(LoadFailure {
                        record_id: record.id.clone(),
                        error,
                    });
                    continue;
                }
            };
            if self.scene.layer(id).is_some() || self.pending.contains_key(&id) {
                tracing::debug!(%id, "Layer already present, not restoring");
                continue;
            }
            let target = LoadTarget::Restore {
                record: record.clone(),
                rank,
            };
            self.spawn_load(Arc::clone(loader), id, source, target)?;
        }
        tracing::info!(
            requested = records.len(),
            pending = self.pending.len(),
            failed = failures.len(),
            "Restoring design"
        );
        Ok(failures)
    }

    fn spawn_load(
        &mut self,
        loader: Arc<dyn ImageLoader>,
        id: LayerId,
        source: String,
        target: LoadTarget,
    ) -> CanvasResult<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CanvasError::Runtime(e.to_string()))?;
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let tx = self.tx.clone();
        let handle = runtime.spawn(async move {
            let result = loader.load(&source).await;
            if tx.send(LoadOutcome { id, ticket, result }).is_err() {
                tracing::debug!(%id, "Canvas dropped before load finished");
            }
        });
        let load = PendingLoad {
            ticket,
            handle,
            target,
        };
        if let Some(previous) = self.pending.insert(id, load) {
            previous.handle.abort();
        }
        Ok(())
    }

    /// IDs with a load in flight.
    #[must_use]
    pub fn pending_loads(&self) -> Vec<LayerId> {
        self.pending.keys().copied().collect()
    }

    /// Whether any load is in flight.
    #[must_use]
    pub fn has_pending_loads(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Apply every load that has finished, without waiting.
    pub fn drain_loads(&mut self) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        while let Ok(outcome) = self.rx.try_recv() {
            if let Some(event) = self.apply(outcome) {
                events.push(event);
            }
        }
        events
    }

    /// Wait until no loads are in flight, applying each as it lands.
    pub async fn wait_for_loads(&mut self) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        loop {
            // A task sends before it finishes: one seen finished here has
            // either queued its outcome or ended without one.
            let finished: Vec<LayerId> = self
                .pending
                .iter()
                .filter(|(_, load)| load.handle.is_finished())
                .map(|(id, _)| *id)
                .collect();
            events.extend(self.drain_loads());
            for id in finished {
                if self.pending.remove(&id).is_some() {
                    tracing::warn!(%id, "Load task ended without a result");
                }
            }
            if self.pending.is_empty() {
                return events;
            }

            let outcome = tokio::select! {
                outcome = self.rx.recv() => outcome,
                () = tokio::time::sleep(WAIT_POLL) => continue,
            };
            match outcome {
                Some(outcome) => events.extend(self.apply(outcome)),
                None => return events,
            }
        }
    }

    fn apply(&mut self, outcome: LoadOutcome) -> Option<LoadEvent> {
        let LoadOutcome { id, ticket, result } = outcome;
        // A result from a superseded load may still be queued after its
        // task was aborted; only the latest request for a layer applies.
        if self.pending.get(&id).map(|load| load.ticket) != Some(ticket) {
            tracing::debug!(%id, ticket, "Discarding result for a cancelled load");
            return None;
        }
        let pending = self.pending.remove(&id)?;
        let image = match result {
            Ok(image) => image,
            Err(error) => {
                tracing::warn!(%id, "Artwork failed to load: {error}");
                return Some(LoadEvent::Failed { id, error });
            }
        };

        match pending.target {
            LoadTarget::Artwork { placement, select } => {
                self.scene.place_artwork(image, placement);
                if select {
                    if let Err(error) = self.scene.select(Some(id)) {
                        return Some(LoadEvent::Failed { id, error });
                    }
                }
                self.has_local_changes = true;
                tracing::info!(%id, "Artwork placed");
                Some(LoadEvent::Placed(id))
            }
            LoadTarget::Restore { record, rank } => {
                let layer = match layer_from_record(
                    &record,
                    image,
                    self.scene.config(),
                    self.scene.canvas_bounds(),
                ) {
                    Ok(layer) => layer,
                    Err(error) => return Some(LoadEvent::Failed { id, error }),
                };
                if let Err(error) = self.insert_restored(layer, rank) {
                    return Some(LoadEvent::Failed { id, error });
                }
                tracing::debug!(%id, rank, "Layer restored");
                Some(LoadEvent::Restored(id))
            }
        }
    }

    /// Insert below the first restored layer with a higher record index.
    fn insert_restored(&mut self, layer: Layer, rank: usize) -> CanvasResult<()> {
        let id = layer.id();
        let scene = &self.scene;
        self.restored_rank
            .retain(|restored, _| scene.layer(*restored).is_some());
        let target = self
            .scene
            .layers()
            .iter()
            .position(|l| self.restored_rank.get(&l.id()).is_some_and(|r| *r > rank));
        self.scene.add_layer(layer);
        if let Some(index) = target {
            self.scene.move_layer(id, index)?;
        }
        self.restored_rank.insert(id, rank);
        Ok(())
    }

    /// Remove a layer, or cancel its load if it has not arrived yet.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::LayerNotFound`] if the ID is neither placed
    /// nor loading.
    pub fn remove_layer(&mut self, id: LayerId) -> CanvasResult<()> {
        let cancelled = self.pending.remove(&id);
        if let Some(load) = &cancelled {
            load.handle.abort();
            tracing::debug!(%id, "Load cancelled");
        }
        self.restored_rank.remove(&id);
        match self.scene.remove_layer(id) {
            Ok(_) => {
                self.has_local_changes = true;
                Ok(())
            }
            Err(_) if cancelled.is_some() => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Records for every placed layer, bottom to top.
    #[must_use]
    pub fn to_persisted(&self) -> Vec<LayerRecord> {
        sync::to_persisted(&self.scene)
    }

    /// Copy the renderable state.
    #[must_use]
    pub fn snapshot(&self) -> SceneSnapshot {
        self.scene.snapshot()
    }

    /// Whether there are edits not yet saved.
    #[must_use]
    pub fn has_local_changes(&self) -> bool {
        self.has_local_changes
    }

    /// Mark the current state as saved.
    pub fn mark_saved(&mut self) {
        self.has_local_changes = false;
    }
}

impl Drop for CanvasState {
    fn drop(&mut self) {
        for load in self.pending.values() {
            load.handle.abort();
        }
    }
}
