use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Point, Positions};

/// Minimum center-to-center distance, stepped by node count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverlapConfig {
    /// Up to 10 nodes.
    pub small: f64,
    /// 11 to 20 nodes.
    pub medium: f64,
    /// 21 to 30 nodes.
    pub large: f64,
    /// More than 30 nodes.
    pub huge: f64,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            small: 120.0,
            medium: 150.0,
            large: 180.0,
            huge: 200.0,
        }
    }
}

impl OverlapConfig {
    pub fn min_distance(&self, node_count: usize) -> f64 {
        match node_count {
            0..=10 => self.small,
            11..=20 => self.medium,
            21..=30 => self.large,
            _ => self.huge,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapReport {
    pub min_distance: f64,
    pub corrections: usize,
}

impl OverlapReport {
    /// The viewport should be re-fitted after any correction.
    pub fn moved_any(&self) -> bool {
        self.corrections > 0
    }
}

/// One relaxation pass over every unordered pair, in `order`.
///
/// Each too-close pair is pushed apart symmetrically along the line joining
/// them until exactly `min_distance` apart, and the moved positions are
/// visible to the pairs that follow. Pairs already visited are not looked at
/// again, so clusters of three or more nodes can keep some overlap after a
/// single call. Ids missing from `positions` are skipped.
pub fn resolve_overlaps(
    order: &[String],
    positions: &mut Positions,
    config: &OverlapConfig,
) -> OverlapReport {
    let ids: Vec<&String> = order.iter().filter(|id| positions.contains_key(*id)).collect();
    let min_distance = config.min_distance(ids.len());
    let mut report = OverlapReport {
        min_distance,
        corrections: 0,
    };
    if ids.len() <= 1 {
        return report;
    }

    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            let (Some(&a), Some(&b)) = (positions.get(ids[i]), positions.get(ids[j])) else {
                continue;
            };
            let dx = b.x - a.x;
            let dy = b.y - a.y;
            let distance = dx.hypot(dy);
            if distance >= min_distance {
                continue;
            }
            let angle = dy.atan2(dx);
            let push = (min_distance - distance) / 2.0;
            let (ux, uy) = (angle.cos() * push, angle.sin() * push);
            positions.insert(ids[i].clone(), Point::new(a.x - ux, a.y - uy));
            positions.insert(ids[j].clone(), Point::new(b.x + ux, b.y + uy));
            report.corrections += 1;
        }
    }

    if report.moved_any() {
        debug!(
            corrections = report.corrections,
            min_distance, "separated overlapping nodes"
        );
    }
    report
}
