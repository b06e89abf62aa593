//! View frustum for conservative draw culling

use crate::core::types::{Vec3, Vec4, Mat4};
use super::aabb::Aabb;

/// A plane in Hessian normal form
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    /// Signed distance from point to plane (positive = in front)
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    fn from_row(r: Vec4) -> Self {
        let normal = r.truncate();
        let len = normal.length();
        if len > 0.0 {
            Self { normal: normal / len, distance: r.w / len }
        } else {
            // Degenerate row: accept everything
            Self { normal: Vec3::ZERO, distance: 0.0 }
        }
    }
}

/// 6-plane frustum extracted from a view-projection matrix
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    pub planes: [Plane; 6], // left, right, bottom, top, near, far
}

impl Frustum {
    /// Extract frustum planes (Gribb/Hartmann).
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];
        Self {
            planes: [
                Plane::from_row(rows[3] + rows[0]),
                Plane::from_row(rows[3] - rows[0]),
                Plane::from_row(rows[3] + rows[1]),
                Plane::from_row(rows[3] - rows[1]),
                Plane::from_row(rows[2]),
                Plane::from_row(rows[3] - rows[2]),
            ],
        }
    }

    /// True if the AABB is at least partially inside.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            // p-vertex: corner furthest along the plane normal
            let p = Vec3::new(
                if plane.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );
            plane.distance_to_point(p) >= 0.0
        })
    }
}
