//! Reconciliation of store snapshots against the local mirror.
//!
//! [`plan`] is pure: it only classifies how a snapshot differs from what the
//! engine currently shows. The engine decides what that means for nodes that
//! are in the middle of a gesture.

use std::collections::{BTreeMap, HashSet};

use crate::model::{Node, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcilePlan {
    /// Nothing changed.
    Unchanged,
    /// Only non-positional fields changed; no layout work.
    FieldsOnly,
    /// Exactly one node moved because of someone else's edit; animate it.
    Animate { id: NodeId },
    /// Ids changed, several nodes moved, or a local commit echoed back:
    /// recompute every base position without animation.
    Rebuild,
}

pub fn plan(
    prev: &BTreeMap<NodeId, Node>,
    next: &BTreeMap<NodeId, Node>,
    committed: &HashSet<NodeId>,
) -> ReconcilePlan {
    if prev.len() != next.len() || prev.keys().zip(next.keys()).any(|(a, b)| a != b) {
        return ReconcilePlan::Rebuild;
    }

    let mut moved: Vec<&NodeId> = Vec::new();
    let mut fields_changed = false;
    for (id, old) in prev {
        let Some(new) = next.get(id) else {
            return ReconcilePlan::Rebuild;
        };
        if old.rating() != new.rating() {
            moved.push(id);
        } else if !old.diff(new).is_empty() {
            fields_changed = true;
        }
    }

    match moved.as_slice() {
        [] if fields_changed => ReconcilePlan::FieldsOnly,
        [] => ReconcilePlan::Unchanged,
        [id] if !committed.contains(*id) => ReconcilePlan::Animate { id: (*id).clone() },
        _ => ReconcilePlan::Rebuild,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(nodes: &[Node]) -> BTreeMap<NodeId, Node> {
        nodes.iter().map(|n| (n.id.clone(), n.clone())).collect()
    }

    fn base() -> Vec<Node> {
        vec![Node::new("a", "A", 5, 0), Node::new("b", "B", 4, 2), Node::new("c", "C", 7, -1)]
    }

    #[test]
    fn test_identical_snapshot_is_unchanged() {
        let prev = map(&base());
        assert_eq!(plan(&prev, &prev.clone(), &HashSet::new()), ReconcilePlan::Unchanged);
    }

    #[test]
    fn test_label_change_is_fields_only() {
        let prev = map(&base());
        let mut nodes = base();
        nodes[0].label = "Alpha".into();
        assert_eq!(plan(&prev, &map(&nodes), &HashSet::new()), ReconcilePlan::FieldsOnly);
    }

    #[test]
    fn test_single_remote_move_animates() {
        let prev = map(&base());
        let mut nodes = base();
        nodes[1].power = 9;
        assert_eq!(
            plan(&prev, &map(&nodes), &HashSet::new()),
            ReconcilePlan::Animate { id: NodeId::from("b") }
        );
    }

    #[test]
    fn test_local_commit_echo_does_not_animate() {
        let prev = map(&base());
        let mut nodes = base();
        nodes[1].power = 9;
        let committed: HashSet<NodeId> = [NodeId::from("b")].into_iter().collect();
        assert_eq!(plan(&prev, &map(&nodes), &committed), ReconcilePlan::Rebuild);
    }

    #[test]
    fn test_several_moves_or_membership_changes_rebuild() {
        let prev = map(&base());
        let mut nodes = base();
        nodes[0].power = 1;
        nodes[2].alignment = 3;
        assert_eq!(plan(&prev, &map(&nodes), &HashSet::new()), ReconcilePlan::Rebuild);

        let mut nodes = base();
        nodes.pop();
        assert_eq!(plan(&prev, &map(&nodes), &HashSet::new()), ReconcilePlan::Rebuild);

        let mut nodes = base();
        nodes[2].id = NodeId::from("d");
        assert_eq!(plan(&prev, &map(&nodes), &HashSet::new()), ReconcilePlan::Rebuild);
    }
}
