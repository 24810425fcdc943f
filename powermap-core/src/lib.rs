//! Layout and interaction core for a power map: labelled nodes rated on a
//! power (1..=10) by alignment (-5..=5) plane, stacked when they share a cell,
//! dragged onto the integer grid and edited through a side panel.
//!
//! The host owns rendering and the node store. It forwards pointer events and
//! store snapshots to a [`LayoutEngine`], draws the returned frame, and runs
//! the store writes found in the returned effects. [`MapSession`] does the
//! store half for native hosts; [`wasm::PowerMap`] is the JavaScript binding.

pub mod config;
pub mod draft;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod model;
pub mod output;
pub mod store;
pub mod wasm;

pub use config::MapConfig;
pub use draft::{DraftEdit, NodeDraft};
pub use engine::{ConfirmPrompt, Effect, HitTarget, LayoutEngine, PendingAction, Selection};
pub use error::{ConfigError, EngineError, StoreError, ValidationError};
pub use geometry::{to_domain, to_screen, DomainPoint, Plane, PointF, RectF, SizeF};
pub use model::{Category, Classification, Node, NodeFields, NodeId, NodePatch};
pub use output::FrameOutput;
pub use store::{MapSession, MemoryStore, NodeStore, SessionError, StoreCommand};
