//! Error types for the power map core.
//!
//! Geometry and panel placement never fail (they clamp or fall back), so the
//! errors here cover configuration, user input validation, the external store
//! and engine calls that name nodes the engine does not know about.

use thiserror::Error;

use crate::model::NodeId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("canvas must be at least 1x1 pixels (got {width}x{height})")]
    EmptyCanvas { width: f64, height: f64 },
    #[error("side padding {side_padding} leaves no horizontal plotting area in a {width}px canvas")]
    NoHorizontalRange { side_padding: f64, width: f64 },
    #[error("vertical paddings leave no plotting area in a {height}px canvas")]
    NoVerticalRange { height: f64 },
    #[error("panel {width}x{height} does not fit the visible canvas")]
    PanelTooLarge { width: f64, height: f64 },
    #[error("{name} must be a finite, non-negative number (got {value})")]
    Negative { name: &'static str, value: f64 },
    #[error("panel placement needs at least one angular sample")]
    NoSamples,
    #[error("invalid configuration JSON: {0}")]
    Json(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("label is required")]
    MissingLabel,
    #[error("category is required")]
    MissingCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("node {0} does not exist in the store")]
    NotFound(NodeId),
    #[error("store rejected the write: {0}")]
    Rejected(String),
    #[error("store subscription closed")]
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("node id cannot change (expected {expected}, got {got})")]
    IdMismatch { expected: NodeId, got: NodeId },
    #[error("no node is selected")]
    NothingSelected,
    #[error("a confirmation is already pending")]
    ConfirmationPending,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
