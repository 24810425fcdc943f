//! Edit buffer behind the node panel.
//!
//! The form widgets live in the host; the engine only needs to know what the
//! panel currently holds, whether it differs from the node it was opened on,
//! and how to turn it back into a node on save.

use serde::Deserialize;

use crate::error::ValidationError;
use crate::model::{
    clamp_alignment, clamp_power, Category, Classification, Node, NodeId, NodeFields,
};

#[derive(Debug, Clone, PartialEq)]
pub struct NodeDraft {
    original: Node,
    pub label: String,
    pub power: i32,
    pub alignment: i32,
    pub category: Option<Category>,
    pub classification: Option<Classification>,
    pub notes: String,
}

/// One form change as sent by the host. Absent keys are untouched; empty
/// strings clear the category or classification.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DraftEdit {
    pub label: Option<String>,
    pub power: Option<f64>,
    pub alignment: Option<f64>,
    pub category: Option<String>,
    pub classification: Option<String>,
    pub notes: Option<String>,
}

impl NodeDraft {
    pub fn open(node: &Node) -> Self {
        Self {
            original: node.clone(),
            label: node.label.clone(),
            power: node.power,
            alignment: node.alignment,
            category: Some(node.category),
            classification: node.classification,
            notes: node.notes.clone(),
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.original.id
    }

    pub fn original(&self) -> &Node {
        &self.original
    }

    pub fn set_power(&mut self, value: f64) {
        self.power = clamp_power(value);
    }

    pub fn set_alignment(&mut self, value: f64) {
        self.alignment = clamp_alignment(value);
    }

    pub fn apply(&mut self, edit: &DraftEdit) {
        if let Some(label) = &edit.label {
            self.label = label.clone();
        }
        if let Some(power) = edit.power {
            self.set_power(power);
        }
        if let Some(alignment) = edit.alignment {
            self.set_alignment(alignment);
        }
        if let Some(category) = &edit.category {
            self.category = Category::parse(category);
        }
        if let Some(classification) = &edit.classification {
            self.classification = Classification::parse(classification);
        }
        if let Some(notes) = &edit.notes {
            self.notes = notes.clone();
        }
    }

    pub fn fields(&self) -> NodeFields {
        NodeFields {
            label: self.label.clone(),
            power: self.power,
            alignment: self.alignment,
            category: self.category,
            classification: self.classification,
            notes: self.notes.clone(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.fields() != self.original.fields()
    }

    /// The edited node, if it passes validation.
    pub fn to_node(&self) -> Result<Node, ValidationError> {
        let mut node = self.fields().into_node(self.original.id.clone())?;
        node.screen_hint = self.original.screen_hint;
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Node {
        Node::new("n1", "Council", 6, 1).with_category(Category::Institution)
    }

    #[test]
    fn test_fresh_draft_is_clean() {
        assert!(!NodeDraft::open(&node()).is_dirty());
    }

    #[test]
    fn test_edits_are_clamped_and_mark_dirty() {
        let mut draft = NodeDraft::open(&node());
        draft.apply(&DraftEdit { power: Some(14.0), alignment: Some(-8.0), ..DraftEdit::default() });
        assert_eq!((draft.power, draft.alignment), (10, -5));
        assert!(draft.is_dirty());
    }

    #[test]
    fn test_reverting_an_edit_is_clean_again() {
        let mut draft = NodeDraft::open(&node());
        draft.apply(&DraftEdit { notes: Some("x".into()), ..DraftEdit::default() });
        assert!(draft.is_dirty());
        draft.apply(&DraftEdit { notes: Some(String::new()), ..DraftEdit::default() });
        assert!(!draft.is_dirty());
    }

    #[test]
    fn test_cleared_category_fails_validation() {
        let mut draft = NodeDraft::open(&node());
        draft.apply(&DraftEdit { category: Some(String::new()), ..DraftEdit::default() });
        assert_eq!(draft.to_node(), Err(ValidationError::MissingCategory));
        draft.apply(&DraftEdit { category: Some("Media".into()), ..DraftEdit::default() });
        assert_eq!(draft.to_node().map(|n| n.category), Ok(Category::Media));
    }
}
