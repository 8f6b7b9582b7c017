use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::{Point, Positions};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RedistributeConfig {
    /// Diagrams up to this many nodes are laid out on a circle, larger ones
    /// on a grid.
    pub circular_max_nodes: usize,
    pub min_radius: f64,
    pub radius_per_node: f64,
    pub grid_spacing: f64,
}

impl Default for RedistributeConfig {
    fn default() -> Self {
        Self {
            circular_max_nodes: 10,
            min_radius: 300.0,
            radius_per_node: 50.0,
            grid_spacing: 200.0,
        }
    }
}

/// Fresh positions for `ids`, in order.
pub fn redistribute(ids: &[String], config: &RedistributeConfig) -> Positions {
    if ids.len() <= config.circular_max_nodes {
        circular(ids, config)
    } else {
        grid(ids, config)
    }
}

/// Equal angular spacing starting at angle zero, radius
/// `max(min_radius, n * radius_per_node)`.
pub fn circular(ids: &[String], config: &RedistributeConfig) -> Positions {
    let n = ids.len();
    let radius = config.min_radius.max(n as f64 * config.radius_per_node);
    let step = 2.0 * PI / n.max(1) as f64;
    ids.iter()
        .enumerate()
        .map(|(i, id)| {
            let angle = i as f64 * step;
            (id.clone(), Point::new(radius * angle.cos(), radius * angle.sin()))
        })
        .collect()
}

/// Row-major grid with `ceil(sqrt(n))` columns, centered on the origin.
pub fn grid(ids: &[String], config: &RedistributeConfig) -> Positions {
    let columns = (ids.len() as f64).sqrt().ceil().max(1.0) as usize;
    let spacing = config.grid_spacing;
    let origin = -((columns - 1) as f64 * spacing) / 2.0;
    ids.iter()
        .enumerate()
        .map(|(i, id)| {
            let row = i / columns;
            let col = i % columns;
            (
                id.clone(),
                Point::new(origin + col as f64 * spacing, origin + row as f64 * spacing),
            )
        })
        .collect()
}
