//! Per-node motion state and position tweens.

use serde::Serialize;

use crate::geometry::PointF;

/// Timed transition between two screen points, driven by host timestamps.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Tween {
    pub from: PointF,
    pub to: PointF,
    pub start_ms: f64,
    pub duration_ms: f64,
}

impl Tween {
    pub fn new(from: PointF, to: PointF, start_ms: f64, duration_ms: f64) -> Self {
        Self { from, to, start_ms, duration_ms: duration_ms.max(0.0) }
    }

    /// Linear progress in `[0, 1]`.
    pub fn progress(&self, now_ms: f64) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        ((now_ms - self.start_ms) / self.duration_ms).clamp(0.0, 1.0)
    }

    pub fn finished(&self, now_ms: f64) -> bool {
        self.progress(now_ms) >= 1.0
    }

    pub fn sample(&self, now_ms: f64) -> PointF {
        let t = self.progress(now_ms);
        if t >= 1.0 {
            return self.to;
        }
        self.from.lerp(self.to, ease_out_cubic(t))
    }
}

fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Motion {
    /// At its base (or expanded) position.
    Settled,
    /// Following the pointer.
    Dragging {
        /// Pointer minus node center at drag start.
        grab_offset: PointF,
        position: PointF,
        was_selected: bool,
    },
    /// Released; animating onto the snapped grid point before commit.
    Snapping { tween: Tween, power: i32, alignment: i32 },
    /// Moving to a new base position after a remote change.
    Reconciling { tween: Tween },
}

impl Motion {
    pub fn phase(&self) -> MotionPhase {
        match self {
            Motion::Settled => MotionPhase::Settled,
            Motion::Dragging { .. } => MotionPhase::Dragging,
            Motion::Snapping { .. } => MotionPhase::Snapping,
            Motion::Reconciling { .. } => MotionPhase::Reconciling,
        }
    }

    /// Dragging and snapping nodes are owned by the gesture, not by snapshots.
    pub fn is_interacting(&self) -> bool {
        matches!(self, Motion::Dragging { .. } | Motion::Snapping { .. })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionPhase {
    Settled,
    Dragging,
    Snapping,
    Reconciling,
}
