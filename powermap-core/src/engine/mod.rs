// Layout state machine.
//
// `LayoutEngine` is the single owner of everything that moves on screen:
// base positions, per-node motion, the expanded stack, the selection and the
// edit draft. Every change goes through a method on the engine; methods that
// have outward consequences return them as `Effect`s for the host (store
// writes, selection/expansion notifications, confirmation prompts).
//
// Timestamps come from the host (`now_ms`), so the engine is deterministic.
//
// Submodules:
// - motion: per-node motion states and tweens
// - reconcile: pure snapshot classification
// - interaction: pointer events, clicks and confirmations
// - hit: hit testing against the current frame

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::config::MapConfig;
use crate::draft::{DraftEdit, NodeDraft};
use crate::error::{ConfigError, EngineError};
use crate::geometry::{Plane, PointF, SizeF};
use crate::layout::expansion::{expanded_positions, expansion_radius};
use crate::layout::panel::{ClusterObstacles, PanelKey, PanelPlacement, PanelPositioner, PanelRequest};
use crate::layout::stacking::{StackKey, Stacking};
use crate::model::{Node, NodeFields, NodeId, NodePatch};
use crate::store::StoreCommand;

pub mod hit;
pub mod interaction;
pub mod motion;
pub mod reconcile;

pub use hit::HitTarget;
pub use interaction::PendingAction;
use motion::{Motion, MotionPhase, Tween};
use reconcile::ReconcilePlan;

/// Something the host has to act on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    Persist { command: StoreCommand },
    SelectionChanged { id: Option<NodeId> },
    ExpansionChanged { stack: Option<StackKey> },
    ConfirmRequested { prompt: ConfirmPrompt },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmPrompt {
    DiscardChanges,
    DeleteNode,
    SaveChanges,
}

impl ConfirmPrompt {
    pub fn message(self) -> &'static str {
        match self {
            ConfirmPrompt::DiscardChanges => "You have unsaved changes. Discard them?",
            ConfirmPrompt::DeleteNode => "Are you sure you want to delete this node?",
            ConfirmPrompt::SaveChanges => "Save changes to this node?",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub id: NodeId,
    /// Screen point the panel anchors to when the node was placed by a drag.
    pub anchor_hint: Option<PointF>,
}

/// Pointer press that has not yet turned into a click or a drag.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Press {
    pub target: HitTarget,
    pub origin: PointF,
    pub grab_offset: PointF,
}

#[derive(Debug, Clone)]
pub struct LayoutEngine {
    cfg: MapConfig,
    plane: Plane,
    config_revision: u64,
    nodes: BTreeMap<NodeId, Node>,
    stacking: Stacking,
    base: HashMap<NodeId, PointF>,
    motion: HashMap<NodeId, Motion>,
    expanded: Option<StackKey>,
    selection: Option<Selection>,
    selection_epoch: u64,
    draft: Option<NodeDraft>,
    press: Option<Press>,
    dragging: Option<NodeId>,
    pending: Option<PendingAction>,
    /// Nodes whose position was changed locally and not yet echoed by the store.
    committed: HashSet<NodeId>,
    panel: PanelPositioner,
    panel_size: SizeF,
    now_ms: f64,
}

impl LayoutEngine {
    pub fn new(cfg: MapConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            plane: Plane::from_config(&cfg),
            panel_size: cfg.panel_size(),
            cfg,
            config_revision: 0,
            nodes: BTreeMap::new(),
            stacking: Stacking::default(),
            base: HashMap::new(),
            motion: HashMap::new(),
            expanded: None,
            selection: None,
            selection_epoch: 0,
            draft: None,
            press: None,
            dragging: None,
            pending: None,
            committed: HashSet::new(),
            panel: PanelPositioner::default(),
            now_ms: 0.0,
        })
    }

    pub fn config(&self) -> &MapConfig {
        &self.cfg
    }

    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    /// Replace the configuration; positions are recomputed, gestures are kept.
    pub fn set_config(&mut self, cfg: MapConfig) -> Result<(), ConfigError> {
        cfg.validate()?;
        self.plane = Plane::from_config(&cfg);
        self.panel_size = cfg.panel_size();
        self.cfg = cfg;
        self.config_revision += 1;
        self.recompute_bases();
        tracing::debug!(revision = self.config_revision, "configuration replaced");
        Ok(())
    }

    /// Host-measured panel size; defaults to the configured size.
    pub fn set_panel_size(&mut self, size: SizeF) {
        let visible = SizeF::new(self.cfg.canvas_width, self.cfg.visible_height());
        self.panel_size = SizeF::new(size.w.clamp(1.0, visible.w), size.h.clamp(1.0, visible.h));
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn stacking(&self) -> &Stacking {
        &self.stacking
    }

    pub fn expanded(&self) -> Option<StackKey> {
        self.expanded
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn selected_id(&self) -> Option<&NodeId> {
        self.selection.as_ref().map(|s| &s.id)
    }

    pub fn draft(&self) -> Option<&NodeDraft> {
        self.draft.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.draft.as_ref().is_some_and(NodeDraft::is_dirty)
    }

    pub fn pending_confirmation(&self) -> Option<ConfirmPrompt> {
        self.pending.as_ref().map(PendingAction::prompt)
    }

    pub fn dragging(&self) -> Option<&NodeId> {
        self.dragging.as_ref()
    }

    pub fn phase(&self, id: &NodeId) -> MotionPhase {
        self.motion.get(id).map(Motion::phase).unwrap_or(MotionPhase::Settled)
    }

    pub fn is_animating(&self) -> bool {
        self.motion
            .values()
            .any(|m| matches!(m, Motion::Snapping { .. } | Motion::Reconciling { .. }))
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Position derived purely from the node's rating.
    pub fn base_position(&self, id: &NodeId) -> Option<PointF> {
        self.base.get(id).copied()
    }

    /// Where the node sits when nobody is touching it: its base point, or its
    /// radial slot if its stack is expanded.
    pub fn settled_position(&self, id: &NodeId) -> Option<PointF> {
        let base = self.base_position(id)?;
        let key = self.stacking.stack_of(id)?;
        if self.expanded != Some(key) {
            return Some(base);
        }
        expanded_positions(base, self.stacking.members(&key), &self.cfg)
            .into_iter()
            .find(|(member, _)| member == id)
            .map(|(_, p)| p)
    }

    pub fn displayed_position(&self, id: &NodeId) -> Option<PointF> {
        match self.motion.get(id).copied().unwrap_or(Motion::Settled) {
            Motion::Settled => self.settled_position(id),
            Motion::Dragging { position, .. } => Some(position),
            Motion::Snapping { tween, .. } | Motion::Reconciling { tween } => {
                Some(tween.sample(self.now_ms))
            }
        }
    }

    fn recompute_bases(&mut self) {
        self.stacking.refresh(self.nodes.values());
        self.base = self
            .nodes
            .values()
            .map(|n| (n.id.clone(), self.plane.grid_point(n.power, n.alignment)))
            .collect();
        self.motion.retain(|id, _| self.nodes.contains_key(id));
    }

    fn recompute_base(&mut self, id: &NodeId) {
        self.stacking.refresh(self.nodes.values());
        if let Some(node) = self.nodes.get(id) {
            self.base.insert(id.clone(), self.plane.grid_point(node.power, node.alignment));
        }
    }

    /// Apply a full snapshot from the store subscription.
    pub fn apply_snapshot(&mut self, snapshot: Vec<Node>, now_ms: f64) -> Vec<Effect> {
        self.now_ms = self.now_ms.max(now_ms);
        let mut effects = Vec::new();

        let next: BTreeMap<NodeId, Node> =
            snapshot.into_iter().map(|n| (n.id.clone(), n)).collect();
        let plan = reconcile::plan(&self.nodes, &next, &self.committed);
        tracing::debug!(?plan, nodes = next.len(), "snapshot received");

        match plan {
            ReconcilePlan::Unchanged => {}
            ReconcilePlan::FieldsOnly => {
                self.nodes = next;
            }
            ReconcilePlan::Animate { id } => {
                let from = self.displayed_position(&id);
                self.nodes = next;
                self.recompute_base(&id);
                let interacting = self.motion.get(&id).is_some_and(Motion::is_interacting);
                if !interacting {
                    if let (Some(from), Some(to)) = (from, self.settled_position(&id)) {
                        let tween = Tween::new(from, to, self.now_ms, self.cfg.reconcile_duration_ms);
                        self.motion.insert(id.clone(), Motion::Reconciling { tween });
                    }
                }
            }
            ReconcilePlan::Rebuild => {
                self.nodes = next;
                self.recompute_bases();
                for motion in self.motion.values_mut() {
                    if matches!(motion, Motion::Reconciling { .. }) {
                        *motion = Motion::Settled;
                    }
                }
            }
        }

        let present = &self.nodes;
        self.committed.retain(|id| !present.contains_key(id));
        self.drop_stale_state(&mut effects);
        effects
    }

    /// Forget interaction state that refers to nodes or stacks that are gone.
    fn drop_stale_state(&mut self, effects: &mut Vec<Effect>) {
        if let Some(key) = self.expanded {
            if !self.stacking.is_stacked(&key) {
                self.set_expanded(None, effects);
            }
        }
        if let Some(id) = self.selected_id().cloned() {
            if !self.nodes.contains_key(&id) {
                tracing::debug!(node = %id, "selected node removed remotely");
                self.clear_selection(effects);
                if matches!(self.pending, Some(ref p) if p.targets(&id)) {
                    self.pending = None;
                }
            }
        }
        if let Some(id) = self.dragging.clone() {
            if !self.nodes.contains_key(&id) {
                self.dragging = None;
            }
        }
        if let Some(press) = &self.press {
            let gone = match &press.target {
                HitTarget::Node(id) => !self.nodes.contains_key(id),
                HitTarget::StackBadge(key) | HitTarget::CollapseControl(key) => {
                    !self.stacking.is_stacked(key)
                }
                HitTarget::Panel | HitTarget::Canvas => false,
            };
            if gone {
                self.press = None;
            }
        }
    }

    /// Advance animations to `now_ms`; finished snaps are committed here.
    pub fn tick(&mut self, now_ms: f64) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.advance(now_ms, &mut effects);
        effects
    }

    pub(crate) fn advance(&mut self, now_ms: f64, effects: &mut Vec<Effect>) {
        self.now_ms = self.now_ms.max(now_ms);
        let now = self.now_ms;

        let mut snapped: Vec<(NodeId, i32, i32, PointF)> = Vec::new();
        for (id, motion) in self.motion.iter_mut() {
            let current = *motion;
            match current {
                Motion::Snapping { tween, power, alignment } if tween.finished(now) => {
                    snapped.push((id.clone(), power, alignment, tween.to));
                }
                Motion::Reconciling { tween } if tween.finished(now) => {
                    *motion = Motion::Settled;
                }
                _ => {}
            }
        }
        snapped.sort_by(|a, b| a.0.cmp(&b.0));
        for (id, power, alignment, target) in snapped {
            self.commit_snap(id, power, alignment, target, effects);
        }
    }

    /// `snapping -> settled`: write the new rating and select the node.
    fn commit_snap(
        &mut self,
        id: NodeId,
        power: i32,
        alignment: i32,
        target: PointF,
        effects: &mut Vec<Effect>,
    ) {
        let Some(node) = self.nodes.get_mut(&id) else {
            self.motion.remove(&id);
            return;
        };
        node.power = power;
        node.alignment = alignment;
        node.screen_hint = Some(target);
        self.motion.insert(id.clone(), Motion::Settled);
        self.committed.insert(id.clone());
        self.recompute_base(&id);
        tracing::debug!(node = %id, power, alignment, "drag committed");

        effects.push(Effect::Persist {
            command: StoreCommand::Update { id: id.clone(), patch: NodePatch::position(power, alignment) },
        });
        self.select(&id, Some(target), effects);
    }

    pub(crate) fn set_expanded(&mut self, key: Option<StackKey>, effects: &mut Vec<Effect>) {
        if self.expanded == key {
            return;
        }
        tracing::debug!(from = ?self.expanded, to = ?key, "stack expansion changed");
        self.expanded = key;
        effects.push(Effect::ExpansionChanged { stack: key });
    }

    pub(crate) fn toggle_stack(&mut self, key: StackKey, effects: &mut Vec<Effect>) {
        if !self.stacking.is_stacked(&key) {
            return;
        }
        let next = if self.expanded == Some(key) { None } else { Some(key) };
        self.set_expanded(next, effects);
    }

    /// Select `id`; a stacked node always expands its stack.
    pub(crate) fn select(&mut self, id: &NodeId, anchor_hint: Option<PointF>, effects: &mut Vec<Effect>) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let reselect = self.selected_id() == Some(id);
        if !reselect || self.draft.is_none() {
            self.draft = Some(NodeDraft::open(node));
        }
        self.selection = Some(Selection { id: id.clone(), anchor_hint });
        self.selection_epoch += 1;
        if let Some(key) = self.stacking.stack_of(id) {
            if self.stacking.is_stacked(&key) {
                self.set_expanded(Some(key), effects);
            }
        }
        if !reselect {
            effects.push(Effect::SelectionChanged { id: Some(id.clone()) });
        }
    }

    pub(crate) fn clear_selection(&mut self, effects: &mut Vec<Effect>) {
        self.draft = None;
        self.panel.clear();
        if self.selection.take().is_some() {
            effects.push(Effect::SelectionChanged { id: None });
        }
    }

    /// Current panel placement for the selected node, if any.
    pub fn panel_placement(&mut self) -> Option<PanelPlacement> {
        let selection = self.selection.clone()?;
        let node = self.nodes.get(&selection.id)?;
        let stack = self.stacking.stack_of(&selection.id);
        let expanded = stack.is_some() && stack == self.expanded;

        let (category, classification, notes) = match &self.draft {
            Some(d) => (d.category.unwrap_or(node.category), d.classification, d.notes.clone()),
            None => (node.category, node.classification, node.notes.clone()),
        };
        let key = PanelKey {
            epoch: self.selection_epoch,
            node: selection.id.clone(),
            category,
            classification,
            notes,
            panel: self.panel_size,
            expanded,
            config_revision: self.config_revision,
        };

        let power = node.power;
        let mut positioner = std::mem::take(&mut self.panel);
        let request = || {
            let cluster = stack.filter(|_| expanded).and_then(|key| {
                let center = self.base_position(&selection.id)?;
                let members = self.stacking.members(&key);
                Some(ClusterObstacles {
                    center,
                    radius: expansion_radius(members.len(), &self.cfg),
                    members: expanded_positions(center, members, &self.cfg)
                        .into_iter()
                        .map(|(_, p)| p)
                        .collect(),
                })
            });
            let anchor = if cluster.is_some() {
                self.settled_position(&selection.id)
            } else {
                selection.anchor_hint.or_else(|| self.settled_position(&selection.id))
            }
            .unwrap_or_default();
            PanelRequest { anchor, power, panel: self.panel_size, cluster }
        };
        let placement = positioner.position(key, request, &self.cfg);
        self.panel = positioner;
        Some(placement)
    }

    /// Number of panel placements computed so far.
    pub fn panel_computations(&self) -> u64 {
        self.panel.computations()
    }

    // Mutators for editing UIs.

    /// Overwrite a node's fields from the edit panel and persist the difference.
    pub fn update_node(&mut self, id: &NodeId, edited: Node) -> Result<Vec<Effect>, EngineError> {
        if edited.id != *id {
            return Err(EngineError::IdMismatch { expected: id.clone(), got: edited.id });
        }
        edited.fields().validate()?;
        let current = self.nodes.get(id).ok_or_else(|| EngineError::UnknownNode(id.clone()))?;

        let mut effects = Vec::new();
        let patch = current.diff(&edited);
        if !patch.is_empty() {
            let moves = patch.moves_node();
            if let Some(node) = self.nodes.get_mut(id) {
                node.apply(&patch);
                if moves {
                    node.screen_hint = None;
                }
            }
            if moves {
                self.committed.insert(id.clone());
                self.recompute_base(id);
                if self.expanded.is_some_and(|key| !self.stacking.is_stacked(&key)) {
                    self.set_expanded(None, &mut effects);
                }
            }
            effects.push(Effect::Persist { command: StoreCommand::Update { id: id.clone(), patch } });
        }
        if self.selected_id() == Some(id) {
            self.clear_selection(&mut effects);
        }
        Ok(effects)
    }

    /// Delete a node. Callers are expected to have confirmed already.
    pub fn delete_node(&mut self, id: &NodeId) -> Result<Vec<Effect>, EngineError> {
        if self.nodes.remove(id).is_none() {
            return Err(EngineError::UnknownNode(id.clone()));
        }
        tracing::debug!(node = %id, "node deleted locally");
        let mut effects = vec![Effect::Persist { command: StoreCommand::Delete { id: id.clone() } }];
        self.recompute_bases();
        self.committed.remove(id);
        self.drop_stale_state(&mut effects);
        Ok(effects)
    }

    /// Select a node (or clear the selection) on behalf of the host.
    pub fn set_selected_node(&mut self, id: Option<&NodeId>) -> Result<Vec<Effect>, EngineError> {
        let mut effects = Vec::new();
        match id {
            Some(id) => {
                if !self.nodes.contains_key(id) {
                    return Err(EngineError::UnknownNode(id.clone()));
                }
                self.select(id, None, &mut effects);
            }
            None => self.clear_selection(&mut effects),
        }
        Ok(effects)
    }

    /// Validate and persist a new node. The id is assigned by the store.
    pub fn create_node(&mut self, fields: NodeFields) -> Result<Vec<Effect>, EngineError> {
        fields.validate()?;
        Ok(vec![Effect::Persist { command: StoreCommand::Create { fields } }])
    }

    /// Apply a form change to the open draft.
    pub fn edit_draft(&mut self, edit: &DraftEdit) -> Result<(), EngineError> {
        let draft = self.draft.as_mut().ok_or(EngineError::NothingSelected)?;
        draft.apply(edit);
        Ok(())
    }
}
