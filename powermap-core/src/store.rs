//! Boundary to the external node store.
//!
//! The engine never talks to the store itself; it emits [`StoreCommand`]s in
//! its effects. A [`MapSession`] wires an engine to a [`NodeStore`]: it runs
//! those commands and feeds snapshots from the store subscription back into
//! the engine. Write failures are logged and handed to the caller; nothing is
//! rolled back, the next snapshot is authoritative.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::config::MapConfig;
use crate::draft::DraftEdit;
use crate::engine::{Effect, LayoutEngine};
use crate::error::{ConfigError, EngineError, StoreError};
use crate::geometry::PointF;
use crate::model::{Node, NodeFields, NodeId, NodePatch};

/// A write the host must send to the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StoreCommand {
    Create { fields: NodeFields },
    Update { id: NodeId, patch: NodePatch },
    Delete { id: NodeId },
}

/// A node collection for one map.
pub trait NodeStore {
    /// Persist a new node and return the id the store generated.
    fn create(&mut self, fields: NodeFields) -> Result<NodeId, StoreError>;
    fn update(&mut self, id: &NodeId, patch: &NodePatch) -> Result<(), StoreError>;
    fn delete(&mut self, id: &NodeId) -> Result<(), StoreError>;
    /// Full snapshots: the current collection right away, then one per change.
    fn subscribe(&mut self) -> Result<Receiver<Vec<Node>>, StoreError>;

    fn execute(&mut self, command: &StoreCommand) -> Result<(), StoreError> {
        match command {
            StoreCommand::Create { fields } => self.create(fields.clone()).map(|_| ()),
            StoreCommand::Update { id, patch } => self.update(id, patch),
            StoreCommand::Delete { id } => self.delete(id),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    nodes: BTreeMap<NodeId, Node>,
    next_id: u64,
    subscribers: Vec<Sender<Vec<Node>>>,
    fail_next: Option<String>,
}

impl MemoryInner {
    fn snapshot(&self) -> Vec<Node> {
        self.nodes.values().cloned().collect()
    }

    fn broadcast(&mut self) {
        let snapshot = self.snapshot();
        self.subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }

    fn check_failure(&mut self) -> Result<(), StoreError> {
        match self.fail_next.take() {
            Some(reason) => Err(StoreError::Rejected(reason)),
            None => Ok(()),
        }
    }
}

/// In-process store. Clones share the same collection, so several sessions
/// on one `MemoryStore` behave like several clients on one map.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    map_id: String,
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new(map_id: impl Into<String>) -> Self {
        Self { map_id: map_id.into(), inner: Arc::default() }
    }

    pub fn with_nodes(map_id: impl Into<String>, nodes: impl IntoIterator<Item = Node>) -> Self {
        let store = Self::new(map_id);
        if let Ok(mut inner) = store.inner.lock() {
            inner.nodes = nodes.into_iter().map(|n| (n.id.clone(), n)).collect();
        }
        store
    }

    pub fn map_id(&self) -> &str {
        &self.map_id
    }

    /// Make the next write fail with `reason`.
    pub fn fail_next(&self, reason: impl Into<String>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_next = Some(reason.into());
        }
    }

    pub fn snapshot(&self) -> Vec<Node> {
        self.inner.lock().map(|inner| inner.snapshot()).unwrap_or_default()
    }

    fn with_inner<T>(
        &self,
        f: impl FnOnce(&mut MemoryInner) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Disconnected)?;
        f(&mut inner)
    }
}

impl NodeStore for MemoryStore {
    fn create(&mut self, fields: NodeFields) -> Result<NodeId, StoreError> {
        let prefix = self.map_id.clone();
        self.with_inner(|inner| {
            inner.check_failure()?;
            inner.next_id += 1;
            let id = NodeId::new(format!("{prefix}-{}", inner.next_id));
            let node = fields
                .into_node(id.clone())
                .map_err(|e| StoreError::Rejected(e.to_string()))?;
            inner.nodes.insert(id.clone(), node);
            inner.broadcast();
            Ok(id)
        })
    }

    fn update(&mut self, id: &NodeId, patch: &NodePatch) -> Result<(), StoreError> {
        self.with_inner(|inner| {
            inner.check_failure()?;
            let node = inner.nodes.get_mut(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
            node.apply(patch);
            inner.broadcast();
            Ok(())
        })
    }

    fn delete(&mut self, id: &NodeId) -> Result<(), StoreError> {
        self.with_inner(|inner| {
            inner.check_failure()?;
            inner.nodes.remove(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
            inner.broadcast();
            Ok(())
        })
    }

    fn subscribe(&mut self) -> Result<Receiver<Vec<Node>>, StoreError> {
        self.with_inner(|inner| {
            let (tx, rx) = mpsc::channel();
            tx.send(inner.snapshot()).map_err(|_| StoreError::Disconnected)?;
            inner.subscribers.push(tx);
            Ok(rx)
        })
    }
}

/// An engine bound to a store subscription.
pub struct MapSession<S: NodeStore> {
    engine: LayoutEngine,
    store: S,
    snapshots: Receiver<Vec<Node>>,
    failures: Vec<StoreError>,
}

impl<S: NodeStore> MapSession<S> {
    pub fn new(cfg: MapConfig, mut store: S) -> Result<Self, SessionError> {
        let engine = LayoutEngine::new(cfg)?;
        let snapshots = store.subscribe()?;
        Ok(Self { engine, store, snapshots, failures: Vec::new() })
    }

    pub fn engine(&self) -> &LayoutEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut LayoutEngine {
        &mut self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply every snapshot that arrived since the last call.
    pub fn pump(&mut self, now_ms: f64) -> Vec<Effect> {
        let mut effects = Vec::new();
        loop {
            match self.snapshots.try_recv() {
                Ok(snapshot) => effects.extend(self.engine.apply_snapshot(snapshot, now_ms)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("store subscription closed");
                    self.failures.push(StoreError::Disconnected);
                    break;
                }
            }
        }
        self.dispatch(&effects);
        effects
    }

    /// Run the store writes among `effects`.
    pub fn dispatch(&mut self, effects: &[Effect]) {
        for effect in effects {
            if let Effect::Persist { command } = effect {
                if let Err(e) = self.store.execute(command) {
                    tracing::warn!(error = %e, ?command, "store write failed");
                    self.failures.push(e);
                }
            }
        }
    }

    /// Store failures since the last call.
    pub fn take_failures(&mut self) -> Vec<StoreError> {
        std::mem::take(&mut self.failures)
    }

    fn run(&mut self, effects: Vec<Effect>) -> Vec<Effect> {
        self.dispatch(&effects);
        effects
    }

    pub fn tick(&mut self, now_ms: f64) -> Vec<Effect> {
        let effects = self.engine.tick(now_ms);
        self.run(effects)
    }

    pub fn pointer_down(&mut self, at: PointF, now_ms: f64) -> Vec<Effect> {
        let effects = self.engine.pointer_down(at, now_ms);
        self.run(effects)
    }

    pub fn pointer_move(&mut self, at: PointF, now_ms: f64) -> Vec<Effect> {
        let effects = self.engine.pointer_move(at, now_ms);
        self.run(effects)
    }

    pub fn pointer_up(&mut self, at: PointF, now_ms: f64) -> Vec<Effect> {
        let effects = self.engine.pointer_up(at, now_ms);
        self.run(effects)
    }

    pub fn resolve_confirmation(&mut self, accepted: bool, now_ms: f64) -> Vec<Effect> {
        let effects = self.engine.resolve_confirmation(accepted, now_ms);
        self.run(effects)
    }

    pub fn update_node(&mut self, id: &NodeId, node: Node) -> Result<Vec<Effect>, EngineError> {
        let effects = self.engine.update_node(id, node)?;
        Ok(self.run(effects))
    }

    pub fn delete_node(&mut self, id: &NodeId) -> Result<Vec<Effect>, EngineError> {
        let effects = self.engine.delete_node(id)?;
        Ok(self.run(effects))
    }

    pub fn create_node(&mut self, fields: NodeFields) -> Result<Vec<Effect>, EngineError> {
        let effects = self.engine.create_node(fields)?;
        Ok(self.run(effects))
    }

    pub fn set_selected_node(&mut self, id: Option<&NodeId>) -> Result<Vec<Effect>, EngineError> {
        self.engine.set_selected_node(id)
    }

    pub fn edit_draft(&mut self, edit: &DraftEdit) -> Result<(), EngineError> {
        self.engine.edit_draft(edit)
    }

    pub fn request_delete(&mut self) -> Result<Vec<Effect>, EngineError> {
        let effects = self.engine.request_delete()?;
        Ok(self.run(effects))
    }

    pub fn save_draft(&mut self) -> Result<Vec<Effect>, EngineError> {
        let effects = self.engine.save_draft()?;
        Ok(self.run(effects))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use pretty_assertions::assert_eq;

    fn fields(label: &str) -> NodeFields {
        NodeFields {
            label: label.into(),
            power: 4,
            alignment: 1,
            category: Some(Category::Media),
            ..NodeFields::default()
        }
    }

    #[test]
    fn test_subscribe_sends_current_snapshot() {
        let mut store = MemoryStore::with_nodes("m", vec![Node::new("a", "A", 5, 0)]);
        let rx = store.subscribe().unwrap();
        assert_eq!(rx.try_recv().unwrap(), vec![Node::new("a", "A", 5, 0)]);
    }

    #[test]
    fn test_every_write_broadcasts() {
        let mut store = MemoryStore::new("m");
        let rx = store.subscribe().unwrap();
        rx.try_recv().unwrap();

        let id = store.create(fields("Press")).unwrap();
        assert_eq!(id, NodeId::from("m-1"));
        store.update(&id, &NodePatch::position(9, -2)).unwrap();
        store.delete(&id).unwrap();

        let snapshots: Vec<Vec<Node>> = rx.try_iter().collect();
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[1][0].rating(), (9, -2));
        assert!(snapshots[2].is_empty());
    }

    #[test]
    fn test_missing_node_and_injected_failure() {
        let mut store = MemoryStore::new("m");
        let ghost = NodeId::from("ghost");
        assert_eq!(store.delete(&ghost), Err(StoreError::NotFound(ghost)));
        store.fail_next("offline");
        assert_eq!(store.create(fields("x")), Err(StoreError::Rejected("offline".into())));
        assert!(store.create(fields("x")).is_ok());
    }

    #[test]
    fn test_command_wire_shape() {
        let command = StoreCommand::Update { id: NodeId::from("a"), patch: NodePatch::position(8, -3) };
        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            serde_json::json!({ "op": "update", "id": "a", "patch": { "power": 8, "alignment": -3 } })
        );
    }

    #[test]
    fn test_session_round_trips_through_store() {
        let store = MemoryStore::with_nodes("m", vec![Node::new("a", "A", 5, 0)]);
        let mut session = MapSession::new(MapConfig::default(), store.clone()).unwrap();
        session.pump(0.0);
        assert_eq!(session.engine().nodes().count(), 1);

        session.create_node(fields("Press")).unwrap();
        session.pump(10.0);
        assert_eq!(session.engine().nodes().count(), 2);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn test_session_reports_failed_writes() {
        let store = MemoryStore::with_nodes("m", vec![Node::new("a", "A", 5, 0)]);
        let mut session = MapSession::new(MapConfig::default(), store.clone()).unwrap();
        session.pump(0.0);
        store.fail_next("quota");
        session.delete_node(&NodeId::from("a")).unwrap();
        assert_eq!(session.take_failures(), vec![StoreError::Rejected("quota".into())]);

        assert!(session.engine().node(&NodeId::from("a")).is_none());

        // The store still has the node; the next snapshot puts it back.
        let mut other_client = store.clone();
        let patch = NodePatch { notes: Some("seen".into()), ..NodePatch::default() };
        other_client.update(&NodeId::from("a"), &patch).unwrap();
        session.pump(20.0);
        assert_eq!(session.engine().node(&NodeId::from("a")).map(|n| n.notes.as_str()), Some("seen"));
    }
}
