//! Pointer interaction and confirmation flow.
//!
//! press -> (moved past threshold) drag -> release -> snap -> commit, or
//! press -> release without moving = click on whatever was hit. Actions that
//! would throw away unsaved panel edits (or delete a node) park in
//! [`PendingAction`] until the host answers the confirmation prompt; pointer
//! input is ignored meanwhile.

use crate::error::EngineError;
use crate::geometry::PointF;
use crate::layout::stacking::StackKey;
use crate::model::{Node, NodeId};

use super::motion::{Motion, Tween};
use super::{ConfirmPrompt, Effect, HitTarget, LayoutEngine, Press};

/// An action waiting for the user's confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    Deselect,
    Collapse(StackKey),
    Delete(NodeId),
    Save(Box<Node>),
}

impl PendingAction {
    pub fn prompt(&self) -> ConfirmPrompt {
        match self {
            PendingAction::Deselect | PendingAction::Collapse(_) => ConfirmPrompt::DiscardChanges,
            PendingAction::Delete(_) => ConfirmPrompt::DeleteNode,
            PendingAction::Save(_) => ConfirmPrompt::SaveChanges,
        }
    }

    pub(crate) fn targets(&self, id: &NodeId) -> bool {
        match self {
            PendingAction::Delete(target) => target == id,
            PendingAction::Save(node) => node.id == *id,
            PendingAction::Deselect | PendingAction::Collapse(_) => true,
        }
    }
}

impl LayoutEngine {
    pub fn pointer_down(&mut self, at: PointF, now_ms: f64) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.advance(now_ms, &mut effects);
        if self.pending.is_some() || self.dragging.is_some() {
            return effects;
        }

        // Refresh the panel rectangle so clicks inside it are recognised.
        self.panel_placement();
        let target = self.hit_test(at);
        let grab_offset = match &target {
            HitTarget::Node(id) => self
                .displayed_position(id)
                .map(|center| at.sub(center))
                .unwrap_or_default(),
            _ => PointF::default(),
        };
        tracing::trace!(?target, x = at.x, y = at.y, "pointer down");
        self.press = Some(Press { target, origin: at, grab_offset });
        effects
    }

    pub fn pointer_move(&mut self, at: PointF, now_ms: f64) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.advance(now_ms, &mut effects);

        if let Some(id) = self.dragging.clone() {
            if let Some(Motion::Dragging { grab_offset, position, .. }) = self.motion.get_mut(&id) {
                *position = at.sub(*grab_offset);
            }
            return effects;
        }

        let Some(press) = self.press.clone() else {
            return effects;
        };
        let HitTarget::Node(id) = &press.target else {
            return effects;
        };
        if press.origin.distance(at) <= self.cfg.drag_threshold {
            return effects;
        }
        let can_drag = matches!(
            self.motion.get(id).copied().unwrap_or(Motion::Settled),
            Motion::Settled | Motion::Reconciling { .. }
        );
        if can_drag {
            self.begin_drag(id.clone(), press.grab_offset, at, &mut effects);
        }
        effects
    }

    /// `settled -> dragging`. The selection is dropped for the drag.
    fn begin_drag(&mut self, id: NodeId, grab_offset: PointF, at: PointF, effects: &mut Vec<Effect>) {
        let was_selected = self.selected_id() == Some(&id);
        self.clear_selection(effects);
        self.press = None;
        self.motion.insert(
            id.clone(),
            Motion::Dragging { grab_offset, position: at.sub(grab_offset), was_selected },
        );
        tracing::debug!(node = %id, was_selected, "drag started");
        self.dragging = Some(id);
    }

    pub fn pointer_up(&mut self, at: PointF, now_ms: f64) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.advance(now_ms, &mut effects);

        if let Some(id) = self.dragging.take() {
            if let Some(Motion::Dragging { grab_offset, .. }) = self.motion.get(&id).copied() {
                self.release(id, at.sub(grab_offset), &mut effects);
            }
            // A zero-length snap commits right away.
            self.advance(now_ms, &mut effects);
            return effects;
        }

        let Some(press) = self.press.take() else {
            return effects;
        };
        if self.pending.is_some() {
            return effects;
        }
        match press.target {
            HitTarget::Node(id) => self.click_node(&id, &mut effects),
            HitTarget::StackBadge(key) => self.toggle_stack(key, &mut effects),
            HitTarget::CollapseControl(key) => self.request(PendingAction::Collapse(key), &mut effects),
            HitTarget::Panel => {}
            HitTarget::Canvas => {
                if self.selection.is_some() {
                    self.request(PendingAction::Deselect, &mut effects);
                }
            }
        }
        effects
    }

    /// `dragging -> snapping`: round to the grid, collapse stacks, animate.
    fn release(&mut self, id: NodeId, dropped_at: PointF, effects: &mut Vec<Effect>) {
        let (power, alignment) = self.plane.to_domain(dropped_at).snapped();
        self.set_expanded(None, effects);
        let target = self.plane.grid_point(power, alignment);
        let tween = Tween::new(dropped_at, target, self.now_ms, self.cfg.snap_duration_ms);
        tracing::debug!(node = %id, power, alignment, "drag released");
        self.motion.insert(id, Motion::Snapping { tween, power, alignment });
    }

    fn click_node(&mut self, id: &NodeId, effects: &mut Vec<Effect>) {
        tracing::trace!(node = %id, "node clicked");
        self.select(id, None, effects);
    }

    /// Run `action`, or park it behind a confirmation prompt.
    pub(crate) fn request(&mut self, action: PendingAction, effects: &mut Vec<Effect>) {
        let needs_confirmation = match &action {
            PendingAction::Deselect | PendingAction::Collapse(_) => self.is_dirty(),
            PendingAction::Delete(_) => true,
            PendingAction::Save(_) => self.cfg.confirm_save && self.is_dirty(),
        };
        if needs_confirmation {
            let prompt = action.prompt();
            tracing::debug!(?prompt, "confirmation requested");
            self.pending = Some(action);
            effects.push(Effect::ConfirmRequested { prompt });
        } else {
            self.perform(action, effects);
        }
    }

    fn perform(&mut self, action: PendingAction, effects: &mut Vec<Effect>) {
        match action {
            PendingAction::Deselect => self.clear_selection(effects),
            PendingAction::Collapse(key) => {
                if self.expanded == Some(key) {
                    self.set_expanded(None, effects);
                }
                self.clear_selection(effects);
            }
            PendingAction::Delete(id) => match self.delete_node(&id) {
                Ok(more) => effects.extend(more),
                Err(e) => tracing::warn!(error = %e, "delete skipped"),
            },
            PendingAction::Save(node) => {
                let id = node.id.clone();
                match self.update_node(&id, *node) {
                    Ok(more) => effects.extend(more),
                    Err(e) => tracing::warn!(error = %e, "save skipped"),
                }
            }
        }
    }

    /// Answer the outstanding prompt. Declining leaves everything as it was.
    pub fn resolve_confirmation(&mut self, accepted: bool, now_ms: f64) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.advance(now_ms, &mut effects);
        let Some(action) = self.pending.take() else {
            return effects;
        };
        tracing::debug!(accepted, prompt = ?action.prompt(), "confirmation resolved");
        if accepted {
            self.perform(action, &mut effects);
        }
        effects
    }

    /// Ask to delete the selected node.
    pub fn request_delete(&mut self) -> Result<Vec<Effect>, EngineError> {
        if self.pending.is_some() {
            return Err(EngineError::ConfirmationPending);
        }
        let id = self.selected_id().cloned().ok_or(EngineError::NothingSelected)?;
        let mut effects = Vec::new();
        self.request(PendingAction::Delete(id), &mut effects);
        Ok(effects)
    }

    /// Save the open draft, asking first if configured to.
    pub fn save_draft(&mut self) -> Result<Vec<Effect>, EngineError> {
        if self.pending.is_some() {
            return Err(EngineError::ConfirmationPending);
        }
        let draft = self.draft.as_ref().ok_or(EngineError::NothingSelected)?;
        let node = draft.to_node()?;
        let mut effects = Vec::new();
        self.request(PendingAction::Save(Box::new(node)), &mut effects);
        Ok(effects)
    }
}
