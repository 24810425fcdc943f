// Stack grouping.
//
// Nodes with the same (power, alignment) share one base point and form a
// stack. Members are ordered by node id so the representative (first member,
// which carries the badge) never changes when unrelated nodes change.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::{Node, NodeId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StackKey {
    pub power: i32,
    pub alignment: i32,
}

impl StackKey {
    pub fn of(node: &Node) -> Self {
        Self { power: node.power, alignment: node.alignment }
    }
}

/// Group nodes by exact rating. Members of each group are sorted by id.
pub fn group_nodes<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> BTreeMap<StackKey, Vec<NodeId>> {
    let mut groups: BTreeMap<StackKey, Vec<NodeId>> = BTreeMap::new();
    for node in nodes {
        groups.entry(StackKey::of(node)).or_default().push(node.id.clone());
    }
    for members in groups.values_mut() {
        members.sort();
        members.dedup();
    }
    groups
}

/// Cached grouping that is only rebuilt when ids or ratings change.
#[derive(Debug, Clone, Default)]
pub struct Stacking {
    signature: Vec<(NodeId, StackKey)>,
    groups: BTreeMap<StackKey, Vec<NodeId>>,
    membership: HashMap<NodeId, StackKey>,
}

impl Stacking {
    pub fn new<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Self {
        let mut stacking = Self::default();
        stacking.refresh(nodes);
        stacking
    }

    /// Recompute if the (id, rating) signature changed. Returns true if it did.
    pub fn refresh<'a>(&mut self, nodes: impl IntoIterator<Item = &'a Node>) -> bool {
        let nodes: Vec<&Node> = nodes.into_iter().collect();
        let mut signature: Vec<(NodeId, StackKey)> =
            nodes.iter().map(|n| (n.id.clone(), StackKey::of(n))).collect();
        signature.sort();
        if signature == self.signature {
            return false;
        }

        self.groups = group_nodes(nodes.iter().copied());
        self.membership = signature.iter().cloned().collect();
        self.signature = signature;
        tracing::debug!(stacks = self.groups.len(), "regrouped nodes");
        true
    }

    pub fn stack_of(&self, id: &NodeId) -> Option<StackKey> {
        self.membership.get(id).copied()
    }

    pub fn members(&self, key: &StackKey) -> &[NodeId] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First member by id order; carries the badge and the collapse control.
    pub fn representative(&self, key: &StackKey) -> Option<&NodeId> {
        self.groups.get(key).and_then(|m| m.first())
    }

    pub fn is_stacked(&self, key: &StackKey) -> bool {
        self.members(key).len() >= 2
    }

    pub fn contains_stack(&self, key: &StackKey) -> bool {
        self.groups.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StackKey, &Vec<NodeId>)> {
        self.groups.iter()
    }

    pub fn stacked(&self) -> impl Iterator<Item = (&StackKey, &Vec<NodeId>)> {
        self.groups.iter().filter(|(_, m)| m.len() >= 2)
    }
}
