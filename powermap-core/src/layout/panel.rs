// Edit panel placement.
//
// Finds a center for the fixed-size edit panel next to the selected node:
// 1. Anchor in an expanded stack: sample a ring around the cluster, pull the
//    candidates facing the anchor in to a fixed offset from the anchor, drop
//    anything off-canvas or overlapping a member, keep the closest.
// 2. Otherwise: fixed offsets below/above/right/left (right/left first for
//    low-power nodes near the bottom axis), first one fully on the canvas.
// 3. Nothing accepted: below if it fits, else above, clamped onto the canvas.
//
// The visible area is the canvas minus the legend band at the bottom.

use std::f64::consts::{FRAC_PI_4, PI, TAU};

use serde::Serialize;

use crate::config::MapConfig;
use crate::geometry::{PointF, RectF, SizeF};
use crate::model::{Category, Classification, NodeId};

use super::spatial_grid::SpatialGrid;

/// Nodes at or below this power get horizontal placements first.
pub const LOW_POWER: i32 = 3;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Below,
    Above,
    Right,
    Left,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "side")]
pub enum PlacementStrategy {
    Orbit,
    Offset(Side),
    Fallback,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct PanelPlacement {
    pub center: PointF,
    pub rect: RectF,
    pub strategy: PlacementStrategy,
}

/// Expanded stack the anchor belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterObstacles {
    pub center: PointF,
    pub radius: f64,
    /// Expanded position of every member, anchor included.
    pub members: Vec<PointF>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelRequest {
    /// Screen position of the selected node.
    pub anchor: PointF,
    pub power: i32,
    pub panel: SizeF,
    pub cluster: Option<ClusterObstacles>,
}

fn visible_bounds(cfg: &MapConfig) -> RectF {
    RectF { x: 0.0, y: 0.0, w: cfg.canvas_width, h: cfg.visible_height() }
}

pub fn place_panel(req: &PanelRequest, cfg: &MapConfig) -> PanelPlacement {
    let bounds = visible_bounds(cfg);

    let found = match &req.cluster {
        Some(cluster) => orbit_candidate(req, cluster, &bounds, cfg),
        None => offset_candidate(req, &bounds, cfg),
    };

    found.unwrap_or_else(|| {
        tracing::debug!(anchor = ?req.anchor, "no free panel position, clamping");
        fallback(req, cfg)
    })
}

fn orbit_candidate(
    req: &PanelRequest,
    cluster: &ClusterObstacles,
    bounds: &RectF,
    cfg: &MapConfig,
) -> Option<PanelPlacement> {
    let node = cfg.node_size();
    let ring = cluster.radius + node.max_dim() / 2.0 + req.panel.max_dim() / 2.0 + cfg.panel_gap;
    let mut obstacles = SpatialGrid::new(node.max_dim());
    for member in &cluster.members {
        obstacles.insert(RectF::centered(*member, node), ());
    }

    let toward_anchor = if req.anchor == cluster.center {
        0.0
    } else {
        (req.anchor.y - cluster.center.y).atan2(req.anchor.x - cluster.center.x)
    };

    let mut best: Option<(f64, PanelPlacement)> = None;
    for k in 0..cfg.panel_samples {
        let angle = k as f64 * TAU / cfg.panel_samples as f64;
        let center = if angular_distance(angle, toward_anchor) <= FRAC_PI_4 + 1e-9 {
            req.anchor.polar(cfg.panel_anchor_offset, angle)
        } else {
            cluster.center.polar(ring, angle)
        };
        let rect = RectF::centered(center, req.panel);
        if !rect.within(bounds) || obstacles.overlaps_any(&rect) {
            continue;
        }
        let dist = center.distance(req.anchor);
        if best.as_ref().is_none_or(|(d, _)| dist < *d) {
            best = Some((dist, PanelPlacement { center, rect, strategy: PlacementStrategy::Orbit }));
        }
    }
    best.map(|(_, p)| p)
}

fn angular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    if d > PI { TAU - d } else { d }
}

fn side_offset(side: Side, panel: SizeF, cfg: &MapConfig) -> (f64, f64) {
    let vertical = cfg.node_height / 2.0 + panel.h / 2.0 + cfg.panel_gap;
    let horizontal = cfg.node_width / 2.0 + panel.w / 2.0 + cfg.panel_gap;
    match side {
        Side::Below => (0.0, vertical),
        Side::Above => (0.0, -vertical),
        Side::Right => (horizontal, 0.0),
        Side::Left => (-horizontal, 0.0),
    }
}

pub fn side_order(power: i32) -> [Side; 4] {
    if power <= LOW_POWER {
        [Side::Right, Side::Left, Side::Below, Side::Above]
    } else {
        [Side::Below, Side::Above, Side::Right, Side::Left]
    }
}

fn offset_candidate(req: &PanelRequest, bounds: &RectF, cfg: &MapConfig) -> Option<PanelPlacement> {
    side_order(req.power).into_iter().find_map(|side| {
        let (dx, dy) = side_offset(side, req.panel, cfg);
        let center = req.anchor.offset(dx, dy);
        let rect = RectF::centered(center, req.panel);
        rect.within(bounds).then_some(PanelPlacement {
            center,
            rect,
            strategy: PlacementStrategy::Offset(side),
        })
    })
}

fn fallback(req: &PanelRequest, cfg: &MapConfig) -> PanelPlacement {
    let (_, below) = side_offset(Side::Below, req.panel, cfg);
    let bottom = cfg.visible_height();
    let mut center = if req.anchor.y + below + req.panel.h / 2.0 <= bottom {
        req.anchor.offset(0.0, below)
    } else {
        req.anchor.offset(0.0, -below)
    };

    let half_w = req.panel.w / 2.0;
    let half_h = req.panel.h / 2.0;
    center.x = center.x.clamp(half_w, (cfg.canvas_width - half_w).max(half_w));
    center.y = center.y.clamp(half_h, (bottom - half_h).max(half_h));

    PanelPlacement {
        center,
        rect: RectF::centered(center, req.panel),
        strategy: PlacementStrategy::Fallback,
    }
}

/// Everything that may change the panel's size or anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelKey {
    pub epoch: u64,
    pub node: NodeId,
    pub category: Category,
    pub classification: Option<Classification>,
    pub notes: String,
    pub panel: SizeF,
    pub expanded: bool,
    pub config_revision: u64,
}

/// Caches the last placement so node-list refreshes do not move the panel.
#[derive(Debug, Clone, Default)]
pub struct PanelPositioner {
    cached: Option<(PanelKey, PanelPlacement)>,
    computed: u64,
}

impl PanelPositioner {
    pub fn position(
        &mut self,
        key: PanelKey,
        request: impl FnOnce() -> PanelRequest,
        cfg: &MapConfig,
    ) -> PanelPlacement {
        if let Some((cached_key, placement)) = &self.cached {
            if *cached_key == key {
                return *placement;
            }
        }
        let placement = place_panel(&request(), cfg);
        self.computed += 1;
        tracing::debug!(node = %key.node, strategy = ?placement.strategy, "placed edit panel");
        self.cached = Some((key, placement));
        placement
    }

    pub fn cached(&self) -> Option<&PanelPlacement> {
        self.cached.as_ref().map(|(_, p)| p)
    }

    /// Number of placements actually computed (cache misses).
    pub fn computations(&self) -> u64 {
        self.computed
    }

    pub fn clear(&mut self) {
        self.cached = None;
    }
}
