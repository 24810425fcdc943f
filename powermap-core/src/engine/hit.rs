// Hit testing against the current frame.
//
// Rectangles are rebuilt from the engine's own position tables on every
// query and filed in a spatial grid, bottom to top:
//   nodes (representatives, then expanded members, then the selected node)
//   stack badges
//   collapse control
//   edit panel
// so a point resolves to the topmost control under it.

use serde::Serialize;

use crate::geometry::{PointF, RectF, SizeF};
use crate::layout::spatial_grid::SpatialGrid;
use crate::layout::stacking::StackKey;
use crate::model::NodeId;

use super::LayoutEngine;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum HitTarget {
    Node(NodeId),
    StackBadge(StackKey),
    CollapseControl(StackKey),
    Panel,
    Canvas,
}

impl LayoutEngine {
    /// Ids drawn on the canvas, bottom to top. Hidden stack members and the
    /// node being dragged are left out.
    pub(crate) fn visible_nodes(&self) -> Vec<NodeId> {
        let mut plain = Vec::new();
        let mut expanded = Vec::new();
        for (key, members) in self.stacking.iter() {
            if self.expanded == Some(*key) {
                expanded.extend(members.iter().cloned());
            } else if let Some(rep) = self.resting_representative(key) {
                plain.push(rep.clone());
            }
        }
        // Members travelling away from a collapsed stack stay visible.
        for (id, motion) in &self.motion {
            if motion.phase() != super::motion::MotionPhase::Settled
                && !plain.contains(id)
                && !expanded.contains(id)
            {
                plain.push(id.clone());
            }
        }
        plain.sort();

        let mut ids: Vec<NodeId> = plain.into_iter().chain(expanded).collect();
        if let Some(dragged) = &self.dragging {
            ids.retain(|id| id != dragged);
        }
        if let Some(selected) = self.selected_id() {
            if let Some(at) = ids.iter().position(|id| id == selected) {
                let id = ids.remove(at);
                ids.push(id);
            }
        }
        ids
    }

    /// Members of a stack still resting in its cell; a node being dragged
    /// out has left it.
    pub(crate) fn resting_members(&self, key: &StackKey) -> Vec<&NodeId> {
        self.stacking
            .members(key)
            .iter()
            .filter(|id| self.dragging.as_ref() != Some(*id))
            .collect()
    }

    /// First resting member. It stands in for a collapsed stack.
    pub(crate) fn resting_representative(&self, key: &StackKey) -> Option<&NodeId> {
        self.resting_members(key).into_iter().next()
    }

    /// Center of the count badge on a stack's representative node.
    pub fn badge_center(&self, key: &StackKey) -> Option<PointF> {
        if self.resting_members(key).len() < 2 {
            return None;
        }
        let rep = self.resting_representative(key)?;
        let at = self.displayed_position(rep)?;
        Some(at.offset(self.cfg.node_width / 2.0, -self.cfg.node_height / 2.0))
    }

    /// Center of the collapse control; only present while the stack is expanded.
    pub fn collapse_control_center(&self, key: &StackKey) -> Option<PointF> {
        if self.expanded != Some(*key) || !self.stacking.is_stacked(key) {
            return None;
        }
        let rep = self.resting_representative(key)?;
        let at = self.displayed_position(rep)?;
        Some(at.offset(-self.cfg.node_width / 2.0, -self.cfg.node_height / 2.0))
    }

    fn hit_grid(&self) -> SpatialGrid<HitTarget> {
        let node_size = self.cfg.node_size();
        let badge = SizeF::new(self.cfg.badge_size, self.cfg.badge_size);
        let mut grid = SpatialGrid::new(node_size.max_dim().max(self.panel_size.max_dim()));

        for id in self.visible_nodes() {
            if let Some(at) = self.displayed_position(&id) {
                grid.insert(RectF::centered(at, node_size), HitTarget::Node(id));
            }
        }
        for (key, _) in self.stacking.stacked() {
            if let Some(at) = self.badge_center(key) {
                grid.insert(RectF::centered(at, badge), HitTarget::StackBadge(*key));
            }
        }
        if let Some(key) = self.expanded {
            if let Some(at) = self.collapse_control_center(&key) {
                grid.insert(RectF::centered(at, badge), HitTarget::CollapseControl(key));
            }
        }
        if self.selection.is_some() {
            if let Some(placement) = self.panel.cached() {
                grid.insert(placement.rect, HitTarget::Panel);
            }
        }
        grid
    }

    pub fn hit_test(&self, at: PointF) -> HitTarget {
        let target = self.hit_grid().topmost_at(at).cloned().unwrap_or(HitTarget::Canvas);
        tracing::trace!(x = at.x, y = at.y, ?target, "hit test");
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::model::Node;

    fn engine_with(nodes: Vec<Node>) -> LayoutEngine {
        let mut engine = LayoutEngine::new(MapConfig::default()).unwrap();
        engine.apply_snapshot(nodes, 0.0);
        engine
    }

    #[test]
    fn test_empty_canvas_hits_canvas() {
        let engine = engine_with(vec![]);
        assert_eq!(engine.hit_test(PointF::new(450.0, 300.0)), HitTarget::Canvas);
    }

    #[test]
    fn test_collapsed_stack_shows_only_representative() {
        let engine = engine_with(vec![Node::new("b", "B", 2, 2), Node::new("a", "A", 2, 2)]);
        let at = engine.plane().grid_point(2, 2);
        assert_eq!(engine.hit_test(at), HitTarget::Node(NodeId::from("a")));
        assert_eq!(engine.visible_nodes(), vec![NodeId::from("a")]);
    }

    #[test]
    fn test_badge_sits_above_node() {
        let engine = engine_with(vec![Node::new("a", "A", 2, 2), Node::new("b", "B", 2, 2)]);
        let key = StackKey { power: 2, alignment: 2 };
        let badge = engine.badge_center(&key).unwrap();
        assert_eq!(engine.hit_test(badge), HitTarget::StackBadge(key));
        assert_eq!(engine.collapse_control_center(&key), None);
    }

    #[test]
    fn test_single_node_has_no_badge() {
        let engine = engine_with(vec![Node::new("a", "A", 2, 2)]);
        assert_eq!(engine.badge_center(&StackKey { power: 2, alignment: 2 }), None);
    }

    #[test]
    fn test_expanded_stack_exposes_members_and_collapse_control() {
        let mut engine = engine_with(vec![
            Node::new("a", "A", 2, 2),
            Node::new("b", "B", 2, 2),
            Node::new("c", "C", 2, 2),
        ]);
        let key = StackKey { power: 2, alignment: 2 };
        let mut effects = Vec::new();
        engine.toggle_stack(key, &mut effects);

        for member in ["a", "b", "c"] {
            let id = NodeId::from(member);
            let at = engine.displayed_position(&id).unwrap();
            // Aim at the lower half, away from the badge and the control.
            assert_eq!(engine.hit_test(at.offset(0.0, 6.0)), HitTarget::Node(id));
        }
        let control = engine.collapse_control_center(&key).unwrap();
        assert_eq!(engine.hit_test(control), HitTarget::CollapseControl(key));
    }

    #[test]
    fn test_panel_is_on_top() {
        let mut engine = engine_with(vec![Node::new("a", "A", 5, 0)]);
        engine.set_selected_node(Some(&NodeId::from("a"))).unwrap();
        let placement = engine.panel_placement().unwrap();
        assert_eq!(engine.hit_test(placement.center), HitTarget::Panel);
    }

    #[test]
    fn test_dragging_the_representative_reveals_the_next_member() {
        let mut engine = engine_with(vec![
            Node::new("a", "A", 5, 0),
            Node::new("b", "B", 5, 0),
            Node::new("c", "C", 5, 0),
        ]);
        let key = StackKey { power: 5, alignment: 0 };
        let cell = engine.plane().grid_point(5, 0);
        engine.pointer_down(cell.offset(0.0, 6.0), 0.0);
        engine.pointer_move(cell.offset(150.0, 6.0), 16.0);
        assert_eq!(engine.dragging(), Some(&NodeId::from("a")));

        assert_eq!(engine.hit_test(cell.offset(0.0, 6.0)), HitTarget::Node(NodeId::from("b")));
        let badge = engine.badge_center(&key).unwrap();
        assert_eq!(engine.hit_test(badge), HitTarget::StackBadge(key));
        let frame = engine.frame();
        let b = frame.nodes.iter().find(|n| n.id == NodeId::from("b")).unwrap();
        assert!(!b.hidden);
        assert_eq!(frame.badges[0].count, 2);
    }

    #[test]
    fn test_dragging_out_of_a_pair_leaves_a_plain_node() {
        let mut engine = engine_with(vec![Node::new("a", "A", 5, 0), Node::new("b", "B", 5, 0)]);
        let cell = engine.plane().grid_point(5, 0);
        engine.pointer_down(cell.offset(0.0, 6.0), 0.0);
        engine.pointer_move(cell.offset(150.0, 6.0), 16.0);

        assert_eq!(engine.hit_test(cell), HitTarget::Node(NodeId::from("b")));
        assert_eq!(engine.badge_center(&StackKey { power: 5, alignment: 0 }), None);
        assert!(engine.frame().badges.is_empty());
    }
}
