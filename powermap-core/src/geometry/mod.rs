// Screen geometry and the domain <-> pixel mapping.
//
// The plane maps alignment to x and power to y (inverted, high power at the
// top). Axis ticks are produced by the same `to_screen` call that places
// nodes, so a renderer drawing ticks from `power_ticks`/`alignment_ticks`
// lines up with nodes exactly.

use serde::{Deserialize, Serialize};

use crate::config::MapConfig;
use crate::model::{ALIGNMENT_MAX, ALIGNMENT_MIN, POWER_MAX, POWER_MIN};

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

impl PointF {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn sub(self, other: PointF) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    pub fn distance(self, other: PointF) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Point at `radius` from `self` in direction `angle` (radians).
    pub fn polar(self, radius: f64, angle: f64) -> Self {
        Self::new(self.x + radius * angle.cos(), self.y + radius * angle.sin())
    }

    pub fn lerp(self, to: PointF, t: f64) -> Self {
        Self::new(self.x + (to.x - self.x) * t, self.y + (to.y - self.y) * t)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeF {
    pub w: f64,
    pub h: f64,
}

impl SizeF {
    pub const fn new(w: f64, h: f64) -> Self {
        Self { w, h }
    }

    pub fn max_dim(&self) -> f64 {
        self.w.max(self.h)
    }
}

/// Axis-aligned rectangle, `(x, y)` is the top-left corner.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectF {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl RectF {
    pub fn centered(center: PointF, size: SizeF) -> Self {
        Self {
            x: center.x - size.w / 2.0,
            y: center.y - size.h / 2.0,
            w: size.w,
            h: size.h,
        }
    }

    pub fn right(&self) -> f64 { self.x + self.w }
    pub fn bottom(&self) -> f64 { self.y + self.h }

    pub fn center(&self) -> PointF {
        PointF::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Strict overlap: rectangles that only touch do not overlap.
    pub fn overlaps(&self, other: &RectF) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn contains(&self, p: PointF) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn within(&self, bounds: &RectF) -> bool {
        const EPS: f64 = 1e-9;
        self.x >= bounds.x - EPS
            && self.y >= bounds.y - EPS
            && self.right() <= bounds.right() + EPS
            && self.bottom() <= bounds.bottom() + EPS
    }
}

/// A (power, alignment) pair, possibly fractional while dragging.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainPoint {
    pub power: f64,
    pub alignment: f64,
}

impl DomainPoint {
    pub fn new(power: f64, alignment: f64) -> Self {
        Self { power, alignment }
    }

    pub fn clamped(self) -> Self {
        Self {
            power: clamp_axis(self.power, POWER_MIN, POWER_MAX),
            alignment: clamp_axis(self.alignment, ALIGNMENT_MIN, ALIGNMENT_MAX),
        }
    }

    /// Nearest grid point, per axis.
    pub fn snapped(self) -> (i32, i32) {
        let c = self.clamped();
        (round_half_up(c.power) as i32, round_half_up(c.alignment) as i32)
    }
}

impl From<(i32, i32)> for DomainPoint {
    fn from((power, alignment): (i32, i32)) -> Self {
        Self::new(power as f64, alignment as f64)
    }
}

/// Nearest integer with halves going up, so -2.5 becomes -2.
pub fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

fn clamp_axis(v: f64, min: i32, max: i32) -> f64 {
    if v.is_nan() {
        return min as f64;
    }
    v.clamp(min as f64, max as f64)
}

/// Pixel frame of the two rating axes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Plane {
    x_left: f64,
    x_right: f64,
    y_bottom: f64,
    y_top: f64,
}

impl Plane {
    pub fn new(
        canvas_width: f64,
        canvas_height: f64,
        side_padding: f64,
        bottom_padding: f64,
        tick_inset: f64,
        top_margin: f64,
    ) -> Self {
        Self {
            x_left: side_padding,
            x_right: canvas_width - side_padding,
            y_bottom: canvas_height - bottom_padding - tick_inset,
            y_top: top_margin,
        }
    }

    pub fn from_config(cfg: &MapConfig) -> Self {
        Self::new(
            cfg.canvas_width,
            cfg.canvas_height,
            cfg.side_padding,
            cfg.bottom_padding,
            cfg.tick_inset,
            cfg.top_margin,
        )
    }

    fn alignment_span() -> f64 { (ALIGNMENT_MAX - ALIGNMENT_MIN) as f64 }
    fn power_span() -> f64 { (POWER_MAX - POWER_MIN) as f64 }

    pub fn to_screen(&self, p: DomainPoint) -> PointF {
        let p = p.clamped();
        let x = self.x_left
            + (p.alignment - ALIGNMENT_MIN as f64) * (self.x_right - self.x_left) / Self::alignment_span();
        let y = self.y_bottom
            - (p.power - POWER_MIN as f64) * (self.y_bottom - self.y_top) / Self::power_span();
        PointF::new(x, y)
    }

    /// Inverse of `to_screen`. Points outside the plotting area clamp to the nearest edge.
    pub fn to_domain(&self, p: PointF) -> DomainPoint {
        let alignment = ALIGNMENT_MIN as f64
            + (p.x - self.x_left) * Self::alignment_span() / (self.x_right - self.x_left);
        let power = POWER_MIN as f64
            + (self.y_bottom - p.y) * Self::power_span() / (self.y_bottom - self.y_top);
        DomainPoint::new(power, alignment).clamped()
    }

    /// Base pixel position of an integer rating.
    pub fn grid_point(&self, power: i32, alignment: i32) -> PointF {
        self.to_screen(DomainPoint::from((power, alignment)))
    }

    /// `(value, y)` of every power tick, bottom to top.
    pub fn power_ticks(&self) -> Vec<(i32, f64)> {
        (POWER_MIN..=POWER_MAX)
            .map(|p| (p, self.grid_point(p, ALIGNMENT_MIN).y))
            .collect()
    }

    /// `(value, x)` of every alignment tick, left to right.
    pub fn alignment_ticks(&self) -> Vec<(i32, f64)> {
        (ALIGNMENT_MIN..=ALIGNMENT_MAX)
            .map(|a| (a, self.grid_point(POWER_MIN, a).x))
            .collect()
    }
}

/// Free-function form of [`Plane::to_screen`] with the top margin at 0.
pub fn to_screen(
    power: f64,
    alignment: f64,
    canvas_width: f64,
    canvas_height: f64,
    side_padding: f64,
    bottom_padding: f64,
    tick_inset: f64,
) -> PointF {
    Plane::new(canvas_width, canvas_height, side_padding, bottom_padding, tick_inset, 0.0)
        .to_screen(DomainPoint::new(power, alignment))
}

/// Free-function form of [`Plane::to_domain`] with the top margin at 0.
pub fn to_domain(
    x: f64,
    y: f64,
    canvas_width: f64,
    canvas_height: f64,
    side_padding: f64,
    bottom_padding: f64,
    tick_inset: f64,
) -> DomainPoint {
    Plane::new(canvas_width, canvas_height, side_padding, bottom_padding, tick_inset, 0.0)
        .to_domain(PointF::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane() -> Plane {
        Plane::from_config(&MapConfig::default())
    }

    #[test]
    fn test_corners_of_the_grid() {
        let cfg = MapConfig::default();
        let p = plane();
        let low_left = p.grid_point(POWER_MIN, ALIGNMENT_MIN);
        assert_eq!(low_left, PointF::new(cfg.side_padding, cfg.canvas_height - cfg.bottom_padding - cfg.tick_inset));
        let high_right = p.grid_point(POWER_MAX, ALIGNMENT_MAX);
        assert_eq!(high_right, PointF::new(cfg.canvas_width - cfg.side_padding, cfg.top_margin));
    }

    #[test]
    fn test_higher_power_is_higher_on_screen() {
        let p = plane();
        assert!(p.grid_point(8, 0).y < p.grid_point(3, 0).y);
        assert!(p.grid_point(5, 2).x > p.grid_point(5, -2).x);
    }

    #[test]
    fn test_round_trip_on_grid() {
        let p = plane();
        for power in POWER_MIN..=POWER_MAX {
            for alignment in ALIGNMENT_MIN..=ALIGNMENT_MAX {
                let back = p.to_domain(p.grid_point(power, alignment));
                assert!((back.power - power as f64).abs() < 1e-9);
                assert!((back.alignment - alignment as f64).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_to_domain_clamps_far_outside() {
        let p = plane();
        let d = p.to_domain(PointF::new(-10_000.0, 50_000.0));
        assert_eq!(d, DomainPoint::new(POWER_MIN as f64, ALIGNMENT_MIN as f64));
        let d = p.to_domain(PointF::new(f64::INFINITY, f64::NEG_INFINITY));
        assert_eq!(d, DomainPoint::new(POWER_MAX as f64, ALIGNMENT_MAX as f64));
    }

    #[test]
    fn test_to_screen_clamps_out_of_range_ratings() {
        let p = plane();
        assert_eq!(p.to_screen(DomainPoint::new(42.0, -9.0)), p.grid_point(POWER_MAX, ALIGNMENT_MIN));
    }

    #[test]
    fn test_ticks_match_node_positions() {
        let p = plane();
        for (power, y) in p.power_ticks() {
            assert_eq!(y.to_bits(), p.grid_point(power, 3).y.to_bits());
        }
        for (alignment, x) in p.alignment_ticks() {
            assert_eq!(x.to_bits(), p.grid_point(7, alignment).x.to_bits());
        }
        assert_eq!(p.power_ticks().len(), 10);
        assert_eq!(p.alignment_ticks().len(), 11);
    }

    #[test]
    fn test_snapped_rounds_each_axis() {
        assert_eq!(DomainPoint::new(7.6, -2.5).snapped(), (8, -2));
        assert_eq!(DomainPoint::new(5.5, 2.5).snapped(), (6, 3));
        assert_eq!(DomainPoint::new(0.2, 9.0).snapped(), (1, 5));
    }

    #[test]
    fn test_free_functions_match_plane() {
        let pt = to_screen(5.0, 0.0, 800.0, 600.0, 50.0, 40.0, 40.0);
        let back = to_domain(pt.x, pt.y, 800.0, 600.0, 50.0, 40.0, 40.0);
        assert!((back.power - 5.0).abs() < 1e-9);
        assert!(back.alignment.abs() < 1e-9);
    }

    #[test]
    fn test_rect_overlap_is_strict() {
        let a = RectF { x: 0.0, y: 0.0, w: 10.0, h: 10.0 };
        let b = RectF { x: 10.0, y: 0.0, w: 10.0, h: 10.0 };
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&RectF { x: 5.0, y: 5.0, w: 10.0, h: 10.0 }));
    }
}
