//! User-built extruded polygon structures.

use serde::{Deserialize, Serialize};

use super::{PlayerId, StructureId, Vec3, WorldError};

/// Maximum distance a vertex may sit off the structure plane
const COPLANAR_TOLERANCE: f64 = 0.01;

/// Extrusion settings for a structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtrusionParams {
    pub depth: f64,
    pub bevel_thickness: f64,
    pub bevel_size: f64,
    pub bevel_segments: u32,
    pub steps: u32,
    pub row: i32,
    pub theta: f64,
}

impl Default for ExtrusionParams {
    fn default() -> Self {
        Self {
            depth: 4.0,
            bevel_thickness: 3.0,
            bevel_size: 4.0,
            bevel_segments: 4,
            steps: 1,
            row: 0,
            theta: 0.0,
        }
    }
}

/// A closed polygon extruded along its normal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Structure {
    pub id: StructureId,
    #[serde(alias = "owner")]
    pub owner_id: PlayerId,
    /// Polygon vertices; the last one is implicitly joined to the first
    pub points: Vec<Vec3>,
    /// Unit normal of the polygon plane
    pub normal: Vec3,
    #[serde(default)]
    pub extrusion_params: ExtrusionParams,
}

impl Structure {
    /// Create a structure with a fresh id, validating the polygon.
    ///
    /// The normal is normalized here. Points must all lie in the plane through
    /// the first point perpendicular to the normal.
    pub fn new(
        owner_id: impl Into<String>,
        points: Vec<Vec3>,
        normal: Vec3,
    ) -> Result<Self, WorldError> {
        if points.len() < 3 {
            return Err(WorldError::TooFewPoints(points.len()));
        }

        let normal = normal.normalized().ok_or(WorldError::DegenerateNormal)?;

        let origin = points[0];
        for (index, point) in points.iter().enumerate().skip(1) {
            let distance = point.sub(origin).dot(normal).abs();
            if distance > COPLANAR_TOLERANCE {
                return Err(WorldError::NotCoplanar { index, distance });
            }
        }

        Ok(Self {
            id: Self::generate_id(),
            owner_id: owner_id.into(),
            points,
            normal,
            extrusion_params: ExtrusionParams::default(),
        })
    }

    pub fn generate_id() -> StructureId {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_extrusion_params(mut self, params: ExtrusionParams) -> Self {
        self.extrusion_params = params;
        self
    }

    /// Copy of this structure with a new extrusion depth (extrude-drag edits)
    pub fn with_depth(&self, depth: f64) -> Self {
        let mut next = self.clone();
        next.extrusion_params.depth = depth;
        next
    }
}
