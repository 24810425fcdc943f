//! WASM bindings for the powermap-core library.
//!
//! `PowerMap` wraps a [`LayoutEngine`] for JavaScript. Every method returns a
//! JSON string: either an [`Update`] (effects plus the new frame) or an
//! [`ErrorOutput`]. The host is responsible for running the `persist` effects
//! against its store and for feeding store snapshots back in.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::config::MapConfig;
use crate::draft::DraftEdit;
use crate::engine::{Effect, LayoutEngine};
use crate::geometry::{PointF, SizeF};
use crate::model::{Node, NodeFields, NodeId};
use crate::output::{ErrorOutput, Update};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = log)]
    pub fn console_log(s: &str);

    #[wasm_bindgen(js_namespace = console, js_name = error)]
    pub fn console_error(s: &str);
}

fn report(msg: &str) {
    tracing::error!("{msg}");
    #[cfg(target_arch = "wasm32")]
    console_error(msg);
}

#[cfg(target_arch = "wasm32")]
fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            report(&format!("panic: {info}"));
        }));
    });
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        report(&format!("Error serializing output: {e}"));
        "{\"error\": \"Serialization error\"}".to_string()
    })
}

fn error_json(context: &str, err: impl std::fmt::Display) -> String {
    let message = format!("{context}: {err}");
    report(&message);
    to_json(&ErrorOutput { error: message })
}

#[wasm_bindgen]
pub struct PowerMap {
    engine: LayoutEngine,
}

impl PowerMap {
    fn update(&mut self, effects: Vec<Effect>) -> String {
        let frame = self.engine.frame();
        to_json(&Update { effects, frame })
    }
}

#[wasm_bindgen]
impl PowerMap {
    /// Create a map from a (possibly partial) JSON configuration; `""` means defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<PowerMap, String> {
        #[cfg(target_arch = "wasm32")]
        install_panic_hook();
        let cfg = if config_json.trim().is_empty() {
            MapConfig::default()
        } else {
            MapConfig::from_json(config_json).map_err(|e| {
                report(&format!("Error reading configuration: {e}"));
                e.to_string()
            })?
        };
        let engine = LayoutEngine::new(cfg).map_err(|e| e.to_string())?;
        Ok(PowerMap { engine })
    }

    pub fn set_config(&mut self, config_json: &str) -> String {
        let result = MapConfig::from_json(config_json).and_then(|cfg| self.engine.set_config(cfg));
        match result {
            Ok(()) => self.update(Vec::new()),
            Err(e) => error_json("Error reading configuration", e),
        }
    }

    /// Feed a full node array from the store subscription.
    pub fn apply_snapshot(&mut self, nodes_json: &str, now_ms: f64) -> String {
        match serde_json::from_str::<Vec<Node>>(nodes_json) {
            Ok(nodes) => {
                let effects = self.engine.apply_snapshot(nodes, now_ms);
                self.update(effects)
            }
            Err(e) => error_json("Error parsing snapshot", e),
        }
    }

    pub fn pointer_down(&mut self, x: f64, y: f64, now_ms: f64) -> String {
        let effects = self.engine.pointer_down(PointF::new(x, y), now_ms);
        self.update(effects)
    }

    pub fn pointer_move(&mut self, x: f64, y: f64, now_ms: f64) -> String {
        let effects = self.engine.pointer_move(PointF::new(x, y), now_ms);
        self.update(effects)
    }

    pub fn pointer_up(&mut self, x: f64, y: f64, now_ms: f64) -> String {
        let effects = self.engine.pointer_up(PointF::new(x, y), now_ms);
        self.update(effects)
    }

    /// Advance animations; call once per animation frame while `animating`.
    pub fn tick(&mut self, now_ms: f64) -> String {
        let effects = self.engine.tick(now_ms);
        self.update(effects)
    }

    pub fn resolve_confirmation(&mut self, accepted: bool, now_ms: f64) -> String {
        let effects = self.engine.resolve_confirmation(accepted, now_ms);
        self.update(effects)
    }

    pub fn update_node(&mut self, id: &str, node_json: &str) -> String {
        let node = match serde_json::from_str::<Node>(node_json) {
            Ok(node) => node,
            Err(e) => return error_json("Error parsing node", e),
        };
        match self.engine.update_node(&NodeId::from(id), node) {
            Ok(effects) => self.update(effects),
            Err(e) => error_json("Error updating node", e),
        }
    }

    /// Delete without asking. Use `request_delete` for the confirmed flow.
    pub fn delete_node(&mut self, id: &str) -> String {
        match self.engine.delete_node(&NodeId::from(id)) {
            Ok(effects) => self.update(effects),
            Err(e) => error_json("Error deleting node", e),
        }
    }

    pub fn request_delete(&mut self) -> String {
        match self.engine.request_delete() {
            Ok(effects) => self.update(effects),
            Err(e) => error_json("Error deleting node", e),
        }
    }

    /// Select a node by id; an empty id clears the selection.
    pub fn set_selected_node(&mut self, id: &str) -> String {
        let id = (!id.is_empty()).then(|| NodeId::from(id));
        match self.engine.set_selected_node(id.as_ref()) {
            Ok(effects) => self.update(effects),
            Err(e) => error_json("Error selecting node", e),
        }
    }

    pub fn create_node(&mut self, fields_json: &str) -> String {
        let fields = match serde_json::from_str::<NodeFields>(fields_json) {
            Ok(fields) => fields,
            Err(e) => return error_json("Error parsing node", e),
        };
        match self.engine.create_node(fields) {
            Ok(effects) => self.update(effects),
            Err(e) => error_json("Error creating node", e),
        }
    }

    pub fn edit_draft(&mut self, edit_json: &str) -> String {
        let edit = match serde_json::from_str::<DraftEdit>(edit_json) {
            Ok(edit) => edit,
            Err(e) => return error_json("Error parsing edit", e),
        };
        match self.engine.edit_draft(&edit) {
            Ok(()) => self.update(Vec::new()),
            Err(e) => error_json("Error editing node", e),
        }
    }

    pub fn save_draft(&mut self) -> String {
        match self.engine.save_draft() {
            Ok(effects) => self.update(effects),
            Err(e) => error_json("Error saving node", e),
        }
    }

    /// Report the rendered panel size so placement uses the real footprint.
    pub fn set_panel_size(&mut self, width: f64, height: f64) -> String {
        self.engine.set_panel_size(SizeF::new(width, height));
        self.update(Vec::new())
    }

    pub fn frame(&mut self) -> String {
        to_json(&self.engine.frame())
    }

    /// Axis ticks and category legend.
    pub fn axes(&self) -> String {
        to_json(&self.engine.axes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn parse(s: &str) -> Value {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn test_snapshot_and_click_round_trip() {
        let mut map = PowerMap::new("").unwrap();
        let out = parse(&map.apply_snapshot(r#"[{"id":"a","label":"A","power":5,"alignment":0}]"#, 0.0));
        let x = out["frame"]["nodes"][0]["x"].as_f64().unwrap();
        let y = out["frame"]["nodes"][0]["y"].as_f64().unwrap();

        map.pointer_down(x, y, 10.0);
        let out = parse(&map.pointer_up(x, y, 20.0));
        assert_eq!(out["effects"][0]["type"], "selection_changed");
        assert_eq!(out["effects"][0]["id"], "a");
        assert_eq!(out["frame"]["selected"], "a");
    }

    #[test]
    fn test_bad_input_reports_error() {
        let mut map = PowerMap::new(r#"{"canvas_width": 1000}"#).unwrap();
        assert!(parse(&map.apply_snapshot("not json", 0.0))["error"].is_string());
        assert!(parse(&map.save_draft())["error"].is_string());
        assert!(PowerMap::new(r#"{"canvas_width": 0}"#).is_err());
    }

    #[test]
    fn test_snapshot_with_null_rating_is_kept() {
        let mut map = PowerMap::new("").unwrap();
        let out = parse(&map.apply_snapshot(
            r#"[{"id":"a","label":"A","power":null,"alignment":"3"},{"id":"b","label":"B","power":4,"alignment":0}]"#,
            0.0,
        ));
        assert!(out.get("error").is_none());
        assert_eq!(out["frame"]["nodes"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_create_emits_persist() {
        let mut map = PowerMap::new("").unwrap();
        let out = parse(&map.create_node(r#"{"label":"Union","power":3,"alignment":2,"category":"Social"}"#));
        assert_eq!(out["effects"][0]["type"], "persist");
        assert_eq!(out["effects"][0]["command"]["op"], "create");
        assert_eq!(out["effects"][0]["command"]["fields"]["category"], "Social");
    }
}
