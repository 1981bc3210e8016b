//! First-person camera feeding the scene and SSAO parameter blocks.

use glam::{Mat4, Vec3};

/// First-person camera.
///
/// `position` is the translation applied to the world before rotation, so the
/// eye sits at `-position`. `rotation` holds Euler angles in degrees (x, y, z).
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Vec3,
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    updated: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(4.0, 2.4, -2.4),
            rotation: Vec3::new(0.0, 58.0, 0.0),
            fov_y_degrees: 60.0,
            aspect: 1.0,
            near: 0.1,
            far: 64.0,
            updated: true,
        }
    }
}

impl Camera {
    pub fn set_position(&mut self, position: Vec3) {
        if self.position != position {
            self.position = position;
            self.updated = true;
        }
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        if self.rotation != rotation {
            self.rotation = rotation;
            self.updated = true;
        }
    }

    pub fn set_perspective(&mut self, fov_y_degrees: f32, near: f32, far: f32) {
        self.fov_y_degrees = fov_y_degrees;
        self.near = near;
        self.far = far;
        self.updated = true;
    }

    /// Track the surface aspect ratio. Zero-sized surfaces leave the camera untouched.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let aspect = width as f32 / height as f32;
        if aspect != self.aspect {
            self.aspect = aspect;
            self.updated = true;
        }
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view(&self) -> Mat4 {
        let rot = Mat4::from_rotation_x(self.rotation.x.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
            * Mat4::from_rotation_z(self.rotation.z.to_radians());
        rot * Mat4::from_translation(self.position)
    }

    /// Returns whether the camera changed since the last call, clearing the flag.
    pub fn take_updated(&mut self) -> bool {
        std::mem::replace(&mut self.updated, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updated_flag_only_on_change() {
        let mut cam = Camera::default();
        assert!(cam.take_updated());
        assert!(!cam.take_updated());

        cam.set_position(cam.position);
        assert!(!cam.take_updated());

        cam.set_rotation(Vec3::new(10.0, 0.0, 0.0));
        assert!(cam.take_updated());
    }

    #[test]
    fn test_viewport_ignores_zero_size() {
        let mut cam = Camera::default();
        cam.take_updated();
        cam.set_viewport(0, 720);
        assert!(!cam.take_updated());
        cam.set_viewport(1280, 720);
        assert!(cam.take_updated());
        assert!((cam.aspect - 1280.0 / 720.0).abs() < 1e-6);
    }

    #[test]
    fn test_view_places_eye_at_negated_position() {
        let mut cam = Camera::default();
        cam.set_rotation(Vec3::ZERO);
        let eye = -cam.position;
        let in_view = cam.view().transform_point3(eye);
        assert!(in_view.length() < 1e-5);
    }
}
