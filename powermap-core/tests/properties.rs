//! Property tests for the geometric guarantees of the layout.
//!
//! 1. **Round trip**: to_domain(to_screen(p, a)) == (p, a) on the grid.
//! 2. **Clamping**: to_domain stays in range for any pixel, however far off.
//! 3. **Expansion**: stack members are distinct and sit on the circle.
//! 4. **Panel bounds**: the edit panel never leaves the visible canvas.

use powermap_core::layout::panel::{place_panel, ClusterObstacles, PanelRequest};
use powermap_core::layout::{expanded_positions, expansion_radius};
use powermap_core::{to_domain, to_screen, DomainPoint, MapConfig, NodeId, Plane, PointF, RectF};
use proptest::prelude::*;

const W: f64 = 900.0;
const H: f64 = 600.0;
const SIDE: f64 = 60.0;
const BOTTOM: f64 = 40.0;
const TICK: f64 = 40.0;

fn ids(n: usize) -> Vec<NodeId> {
    (0..n).map(|i| NodeId::new(format!("node-{i:03}"))).collect()
}

proptest! {
    #[test]
    fn grid_round_trips(power in 1i32..=10, alignment in -5i32..=5) {
        let p = to_screen(power as f64, alignment as f64, W, H, SIDE, BOTTOM, TICK);
        let back = to_domain(p.x, p.y, W, H, SIDE, BOTTOM, TICK);
        prop_assert!((back.power - power as f64).abs() < 1e-9);
        prop_assert!((back.alignment - alignment as f64).abs() < 1e-9);
        prop_assert_eq!(back.snapped(), (power, alignment));
    }

    #[test]
    fn fractional_ratings_round_trip(power in 1.0f64..=10.0, alignment in -5.0f64..=5.0) {
        let plane = Plane::from_config(&MapConfig::default());
        let back = plane.to_domain(plane.to_screen(DomainPoint::new(power, alignment)));
        prop_assert!((back.power - power).abs() < 1e-9);
        prop_assert!((back.alignment - alignment).abs() < 1e-9);
    }

    #[test]
    fn to_domain_always_clamps(x in -1.0e6f64..1.0e6, y in -1.0e6f64..1.0e6) {
        let d = to_domain(x, y, W, H, SIDE, BOTTOM, TICK);
        prop_assert!((1.0..=10.0).contains(&d.power));
        prop_assert!((-5.0..=5.0).contains(&d.alignment));
    }

    #[test]
    fn expansion_points_are_distinct_and_on_circle(n in 2usize..=16, cx in 0.0f64..900.0, cy in 0.0f64..600.0) {
        let cfg = MapConfig::default();
        let center = PointF::new(cx, cy);
        let radius = expansion_radius(n, &cfg);
        let points = expanded_positions(center, &ids(n), &cfg);
        prop_assert_eq!(points.len(), n);
        for (i, (_, p)) in points.iter().enumerate() {
            prop_assert!((p.distance(center) - radius).abs() < 1e-6);
            for (_, q) in &points[i + 1..] {
                prop_assert!(p.distance(*q) > 1.0);
            }
        }
    }

    #[test]
    fn panel_stays_on_canvas(
        ax in -200.0f64..1100.0,
        ay in -200.0f64..800.0,
        power in 1i32..=10,
        stacked in proptest::option::of(2usize..=8),
    ) {
        let cfg = MapConfig::default();
        let anchor = PointF::new(ax, ay);
        let cluster = stacked.map(|n| {
            let members: Vec<PointF> = expanded_positions(anchor, &ids(n), &cfg)
                .into_iter()
                .map(|(_, p)| p)
                .collect();
            ClusterObstacles { center: anchor, radius: expansion_radius(n, &cfg), members }
        });
        let request = PanelRequest {
            anchor: cluster.as_ref().map(|c| c.members[0]).unwrap_or(anchor),
            power,
            panel: cfg.panel_size(),
            cluster,
        };
        let placement = place_panel(&request, &cfg);
        let visible = RectF { x: 0.0, y: 0.0, w: cfg.canvas_width, h: cfg.visible_height() };
        prop_assert!(placement.rect.within(&visible), "{:?} outside {:?}", placement.rect, visible);
    }
}
