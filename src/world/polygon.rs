//! Helpers for the polygon drawing tool.
//!
//! The draft itself lives with the drawing collaborator; its vertices are
//! mirrored into the store with [`Action::UpdatePartialPoints`](super::Action).

use super::Vec3;

/// Distance at which a new vertex snaps onto the first one and closes the polygon
pub const CLOSE_THRESHOLD: f64 = 0.1;

/// In-progress polygon
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolygonDraft {
    points: Vec<Vec3>,
}

impl PolygonDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a vertex.
    ///
    /// Returns the finished polygon (without the closing vertex) when the new
    /// vertex lands on the first one and the draft already has at least 3
    /// vertices. The draft is cleared in that case.
    pub fn push(&mut self, point: Vec3) -> Option<Vec<Vec3>> {
        if self.points.len() >= 3 && point.approx_eq(self.points[0], CLOSE_THRESHOLD) {
            return Some(std::mem::take(&mut self.points));
        }
        self.points.push(point);
        None
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// Average of a set of points
pub fn centroid(points: &[Vec3]) -> Vec3 {
    if points.is_empty() {
        return Vec3::zero();
    }
    let sum = points.iter().fold(Vec3::zero(), |acc, p| acc.add(*p));
    sum.scale(1.0 / points.len() as f64)
}
