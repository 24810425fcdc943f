// Radial expansion of a stack.
//
// Members are spread on a circle around the shared base point: member i (in
// stack order) sits at angle i * 2π / N. Stacks of up to four members use the
// base radius; every further member widens the circle by one radius step.

use std::f64::consts::TAU;

use crate::config::MapConfig;
use crate::geometry::PointF;
use crate::model::NodeId;

const COMPACT_STACK: usize = 4;

pub fn expansion_radius(members: usize, cfg: &MapConfig) -> f64 {
    let extra = members.saturating_sub(COMPACT_STACK) as f64;
    cfg.expansion_base_radius + extra * cfg.expansion_radius_step
}

/// Angle of member `index` in a stack of `members`.
pub fn member_angle(index: usize, members: usize) -> f64 {
    if members == 0 {
        return 0.0;
    }
    index as f64 * TAU / members as f64
}

/// Expanded point of every member, in stack order.
pub fn expanded_positions(center: PointF, members: &[NodeId], cfg: &MapConfig) -> Vec<(NodeId, PointF)> {
    let n = members.len();
    let radius = expansion_radius(n, cfg);
    members
        .iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), center.polar(radius, member_angle(i, n))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{RectF, SizeF};

    fn ids(n: usize) -> Vec<NodeId> {
        (0..n).map(|i| NodeId::new(format!("n{i:02}"))).collect()
    }

    #[test]
    fn test_radius_grows_after_four() {
        let cfg = MapConfig::default();
        assert_eq!(expansion_radius(2, &cfg), cfg.expansion_base_radius);
        assert_eq!(expansion_radius(4, &cfg), cfg.expansion_base_radius);
        assert_eq!(
            expansion_radius(7, &cfg),
            cfg.expansion_base_radius + 3.0 * cfg.expansion_radius_step
        );
    }

    #[test]
    fn test_three_members_are_120_degrees_apart() {
        let cfg = MapConfig::default();
        let center = PointF::new(300.0, 200.0);
        let points = expanded_positions(center, &ids(3), &cfg);
        for (i, (_, p)) in points.iter().enumerate() {
            assert!((p.distance(center) - cfg.expansion_base_radius).abs() < 1e-9);
            let angle = (p.y - center.y).atan2(p.x - center.x).rem_euclid(TAU);
            assert!((angle - i as f64 * TAU / 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_members_do_not_overlap_with_default_sizes() {
        let cfg = MapConfig::default();
        let size = SizeF::new(cfg.node_width, cfg.node_height);
        for n in 2..=12 {
            let points = expanded_positions(PointF::new(400.0, 300.0), &ids(n), &cfg);
            let rects: Vec<RectF> = points.iter().map(|(_, p)| RectF::centered(*p, size)).collect();
            for i in 0..n {
                for j in (i + 1)..n {
                    assert!(!rects[i].overlaps(&rects[j]), "n={n}: {i} overlaps {j}");
                }
            }
        }
    }
}
