//! Axis-aligned bounding box

use crate::core::types::Vec3;

/// Axis-aligned bounding box defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create AABB from center and half-extents
    pub fn from_center_half_extent(center: Vec3, half_extent: Vec3) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Check if point is inside AABB (inclusive)
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Expand AABB to include point
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_half_extent() {
        let aabb = Aabb::from_center_half_extent(Vec3::new(1.0, 2.0, 3.0), Vec3::splat(0.5));
        assert_eq!(aabb.min, Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(aabb.size(), Vec3::ONE);
    }

    #[test]
    fn test_contains() {
        let outer = Aabb::new(Vec3::splat(-10.0), Vec3::splat(10.0));
        assert!(outer.contains_point(Vec3::splat(10.0)));
        assert!(!outer.contains_point(Vec3::new(0.0, 10.5, 0.0)));
    }

    #[test]
    fn test_expand() {
        let mut aabb = Aabb::new(Vec3::ZERO, Vec3::ZERO);
        aabb.expand(Vec3::new(-1.0, 2.0, 0.5));
        assert_eq!(aabb.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(0.0, 2.0, 0.5));
    }
}
