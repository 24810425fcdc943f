//! Host-supplied layout configuration.
//!
//! Hosts may pass a partial JSON object; every missing key takes its default.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::SizeF;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub canvas_width: f64,
    pub canvas_height: f64,
    /// Horizontal inset of the alignment axis on both sides.
    pub side_padding: f64,
    pub bottom_padding: f64,
    /// Gap between the bottom padding and the lowest power tick.
    pub tick_inset: f64,
    /// Pixel row of the highest power tick.
    pub top_margin: f64,
    pub node_width: f64,
    pub node_height: f64,
    pub panel_width: f64,
    pub panel_height: f64,
    /// Band at the bottom of the canvas kept free for the legend.
    pub legend_reserve: f64,
    /// Pointer travel before a press turns into a drag.
    pub drag_threshold: f64,
    pub snap_duration_ms: f64,
    pub reconcile_duration_ms: f64,
    pub expansion_base_radius: f64,
    pub expansion_radius_step: f64,
    pub panel_samples: usize,
    /// Clearance between a panel and the nodes it avoids.
    pub panel_gap: f64,
    /// Distance from anchor node to panel center for candidates facing away from the cluster.
    pub panel_anchor_offset: f64,
    pub badge_size: f64,
    /// Ask before saving a draft with unsaved edits.
    pub confirm_save: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            canvas_width: 900.0,
            canvas_height: 600.0,
            side_padding: 60.0,
            bottom_padding: 40.0,
            tick_inset: 40.0,
            top_margin: 30.0,
            node_width: 50.0,
            node_height: 20.0,
            panel_width: 230.0,
            panel_height: 140.0,
            legend_reserve: 40.0,
            drag_threshold: 4.0,
            snap_duration_ms: 200.0,
            reconcile_duration_ms: 300.0,
            expansion_base_radius: 40.0,
            expansion_radius_step: 12.0,
            panel_samples: 24,
            panel_gap: 8.0,
            panel_anchor_offset: 95.0,
            badge_size: 16.0,
            confirm_save: true,
        }
    }
}

impl MapConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: MapConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn node_size(&self) -> SizeF {
        SizeF::new(self.node_width, self.node_height)
    }

    pub fn panel_size(&self) -> SizeF {
        SizeF::new(self.panel_width, self.panel_height)
    }

    /// Height of the area panels may occupy.
    pub fn visible_height(&self) -> f64 {
        self.canvas_height - self.legend_reserve
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("side_padding", self.side_padding),
            ("bottom_padding", self.bottom_padding),
            ("tick_inset", self.tick_inset),
            ("top_margin", self.top_margin),
            ("node_width", self.node_width),
            ("node_height", self.node_height),
            ("legend_reserve", self.legend_reserve),
            ("drag_threshold", self.drag_threshold),
            ("snap_duration_ms", self.snap_duration_ms),
            ("reconcile_duration_ms", self.reconcile_duration_ms),
            ("expansion_base_radius", self.expansion_base_radius),
            ("expansion_radius_step", self.expansion_radius_step),
            ("panel_gap", self.panel_gap),
            ("panel_anchor_offset", self.panel_anchor_offset),
            ("badge_size", self.badge_size),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Negative { name, value });
            }
        }
        if !(self.canvas_width >= 1.0 && self.canvas_height >= 1.0) {
            return Err(ConfigError::EmptyCanvas {
                width: self.canvas_width,
                height: self.canvas_height,
            });
        }
        if self.canvas_width - 2.0 * self.side_padding <= 0.0 {
            return Err(ConfigError::NoHorizontalRange {
                side_padding: self.side_padding,
                width: self.canvas_width,
            });
        }
        if self.canvas_height - self.bottom_padding - self.tick_inset - self.top_margin <= 0.0 {
            return Err(ConfigError::NoVerticalRange { height: self.canvas_height });
        }
        if !(self.panel_width > 0.0
            && self.panel_height > 0.0
            && self.panel_width <= self.canvas_width
            && self.panel_height <= self.visible_height())
        {
            return Err(ConfigError::PanelTooLarge {
                width: self.panel_width,
                height: self.panel_height,
            });
        }
        if self.panel_samples == 0 {
            return Err(ConfigError::NoSamples);
        }
        Ok(())
    }
}
