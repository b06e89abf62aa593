//! Camera used to build per-frame view-projection matrices

use crate::core::types::{Vec3, Mat4, Quat};

/// Camera with position, rotation, and projection parameters
#[derive(Clone, Debug)]
pub struct Camera {
    /// World position
    pub position: Vec3,
    /// Rotation as quaternion
    pub rotation: Quat,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

impl Camera {
    /// Create a new camera
    pub fn new(position: Vec3, fov_y_degrees: f32, aspect: f32) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near: 0.05,
            far: 1000.0,
        }
    }

    /// Create camera looking at a target
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        let forward = (target - position).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);

        let rotation = Quat::from_mat3(&glam::Mat3::from_cols(right, up, -forward));

        Self {
            position,
            rotation,
            ..Self::default()
        }
    }

    /// Get view matrix (world to camera space)
    pub fn view_matrix(&self) -> Mat4 {
        let rotation_matrix = Mat4::from_quat(self.rotation.conjugate());
        let translation_matrix = Mat4::from_translation(-self.position);
        rotation_matrix * translation_matrix
    }

    /// Get projection matrix (camera to clip space)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Get forward direction (negative Z in camera space)
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Update aspect ratio
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        self.aspect = width / height;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 5.0), 60.0, 16.0 / 9.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_looks_down_negative_z() {
        let camera = Camera::default();
        assert!((camera.forward().z - (-1.0)).abs() < 0.001);
    }

    #[test]
    fn test_look_at_forward() {
        let camera = Camera::look_at(Vec3::new(0.0, 10.0, 20.0), Vec3::ZERO, Vec3::Y);
        let expected = (Vec3::ZERO - camera.position).normalize();
        assert!(camera.forward().distance(expected) < 0.001);
    }

    #[test]
    fn test_view_matrix_translation() {
        let mut camera = Camera::default();
        camera.position = Vec3::new(10.0, 0.0, 0.0);

        let view = camera.view_matrix();
        let origin_in_camera = view.transform_point3(Vec3::ZERO);
        assert!((origin_in_camera.x - (-10.0)).abs() < 0.001);
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let camera = Camera::look_at(Vec3::new(5.0, 8.0, 12.0), Vec3::new(0.0, 0.5, 0.0), Vec3::Y);
        let clip = camera.view_projection() * Vec3::new(0.0, 0.5, 0.0).extend(1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 0.001);
        assert!(ndc.y.abs() < 0.001);
    }
}
