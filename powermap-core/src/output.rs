//! Output types for host rendering.
//!
//! These structs are serialized to JSON and handed to the host, which draws
//! the map from them without knowing anything about the layout rules.

use serde::Serialize;

use crate::engine::motion::MotionPhase;
use crate::engine::{ConfirmPrompt, Effect, LayoutEngine};
use crate::geometry::{RectF, SizeF};
use crate::layout::panel::PanelPlacement;
use crate::layout::stacking::StackKey;
use crate::model::{shape_of, Category, NodeId};

/// A node ready for the host to draw
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub label: String,
    /// Displayed center, including drag, snap and expansion offsets
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: &'static str,
    pub shape: &'static str,
    pub phase: MotionPhase,
    pub selected: bool,
    /// Stack the node belongs to, if it shares its cell with others
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<StackKey>,
    /// Collapsed under its stack's representative
    pub hidden: bool,
}

/// Count badge on a stack's representative
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BadgeView {
    pub stack: StackKey,
    pub count: usize,
    pub bounds: RectF,
    pub expanded: bool,
    /// Collapse control, present while expanded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapse: Option<RectF>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptView {
    pub kind: ConfirmPrompt,
    pub message: &'static str,
}

/// Everything the host needs for one repaint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameOutput {
    pub nodes: Vec<NodeView>,
    pub badges: Vec<BadgeView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panel: Option<PanelPlacement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded: Option<StackKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_confirmation: Option<PromptView>,
    pub dirty: bool,
    /// True while a tween is running; the host should keep calling `tick`.
    pub animating: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub value: i32,
    /// Screen coordinate along the axis
    pub at: f64,
}

/// Axis ticks and legend, static for a given configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxesOutput {
    pub power: Vec<Tick>,
    pub alignment: Vec<Tick>,
    pub legend: Vec<LegendEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub category: &'static str,
    pub color: &'static str,
}

/// Effects plus the frame they produced, the usual reply to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Update {
    pub effects: Vec<Effect>,
    pub frame: FrameOutput,
}

/// Error reply; `error` carries the message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorOutput {
    pub error: String,
}

impl LayoutEngine {
    pub fn frame(&mut self) -> FrameOutput {
        let panel = self.panel_placement();
        let node_size = self.config().node_size();
        let visible = self.visible_nodes();
        let selected = self.selected_id().cloned();

        let nodes = self
            .nodes()
            .filter_map(|node| {
                let at = self.displayed_position(&node.id)?;
                let stack = self
                    .stacking()
                    .stack_of(&node.id)
                    .filter(|key| self.stacking().is_stacked(key));
                Some(NodeView {
                    id: node.id.clone(),
                    label: node.label.clone(),
                    x: at.x,
                    y: at.y,
                    width: node_size.w,
                    height: node_size.h,
                    color: node.category.color(),
                    shape: shape_of(node.classification),
                    phase: self.phase(&node.id),
                    selected: selected.as_ref() == Some(&node.id),
                    stack,
                    hidden: !visible.contains(&node.id) && self.dragging() != Some(&node.id),
                })
            })
            .collect();

        let badge_size = self.config().badge_size;
        let badges = self
            .stacking()
            .stacked()
            .filter_map(|(key, _)| {
                let at = self.badge_center(key)?;
                let size = SizeF::new(badge_size, badge_size);
                Some(BadgeView {
                    stack: *key,
                    count: self.resting_members(key).len(),
                    bounds: RectF::centered(at, size),
                    expanded: self.expanded() == Some(*key),
                    collapse: self.collapse_control_center(key).map(|c| RectF::centered(c, size)),
                })
            })
            .collect();

        FrameOutput {
            nodes,
            badges,
            panel,
            selected,
            expanded: self.expanded(),
            pending_confirmation: self
                .pending_confirmation()
                .map(|kind| PromptView { kind, message: kind.message() }),
            dirty: self.is_dirty(),
            animating: self.is_animating(),
        }
    }

    pub fn axes(&self) -> AxesOutput {
        let to_ticks = |ticks: Vec<(i32, f64)>| -> Vec<Tick> {
            ticks.into_iter().map(|(value, at)| Tick { value, at }).collect()
        };
        AxesOutput {
            power: to_ticks(self.plane().power_ticks()),
            alignment: to_ticks(self.plane().alignment_ticks()),
            legend: Category::ALL
                .iter()
                .map(|c| LegendEntry { category: c.as_str(), color: c.color() })
                .collect(),
        }
    }
}
