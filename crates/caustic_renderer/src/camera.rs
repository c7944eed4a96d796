//! Cameras turning normalized image coordinates into primary rays.

use caustic_math::{Ray, Vec2, Vec3};

/// Generates primary rays.
pub trait Camera: Send + Sync {
    /// Ray through normalized image coordinates: `(0, 0)` is the top-left
    /// corner of the image, `(1, 1)` the bottom-right.
    fn generate_ray_for_normalized_coordinates(&self, coordinates: Vec2) -> Ray;
}

/// Pinhole perspective camera.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    // Camera positioning
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,

    /// Vertical field of view in degrees
    vfov: f32,
    aspect_ratio: f32,

    // Cached computed values (set by initialize())
    upper_left: Vec3,
    horizontal: Vec3,
    vertical: Vec3,
}

impl PerspectiveCamera {
    /// Create a new camera with default settings.
    pub fn new(aspect_ratio: f32) -> Self {
        let mut camera = Self {
            look_from: Vec3::ZERO,
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::Y,
            vfov: 90.0,
            aspect_ratio,
            upper_left: Vec3::ZERO,
            horizontal: Vec3::X,
            vertical: -Vec3::Y,
        };
        camera.initialize();
        camera
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self.initialize();
        self
    }

    /// Set the vertical field of view in degrees.
    pub fn with_vfov(mut self, vfov: f32) -> Self {
        self.vfov = vfov;
        self.initialize();
        self
    }

    pub fn position(&self) -> Vec3 {
        self.look_from
    }

    fn initialize(&mut self) {
        let theta = self.vfov.to_radians();
        let viewport_height = 2.0 * (theta / 2.0).tan();
        let viewport_width = viewport_height * self.aspect_ratio;

        // Calculate camera basis vectors
        let w = (self.look_from - self.look_at).normalize_or_zero();
        let u = self.vup.cross(w).normalize_or_zero();
        let v = w.cross(u);

        self.horizontal = viewport_width * u;
        self.vertical = -viewport_height * v;
        self.upper_left = self.look_from - w - self.horizontal / 2.0 - self.vertical / 2.0;
    }
}

impl Camera for PerspectiveCamera {
    fn generate_ray_for_normalized_coordinates(&self, coordinates: Vec2) -> Ray {
        let target = self.upper_left + coordinates.x * self.horizontal + coordinates.y * self.vertical;
        Ray::new(self.look_from, (target - self.look_from).normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centre_ray_points_at_target() {
        let camera = PerspectiveCamera::new(4.0 / 3.0).with_position(
            Vec3::new(0.0, 1.0, 5.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::Y,
        );
        let ray = camera.generate_ray_for_normalized_coordinates(Vec2::splat(0.5));
        assert_eq!(ray.origin(), Vec3::new(0.0, 1.0, 5.0));
        assert!((ray.direction() - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn test_top_left_ray_goes_up_and_left() {
        let camera = PerspectiveCamera::new(1.0).with_vfov(90.0);
        let ray = camera.generate_ray_for_normalized_coordinates(Vec2::ZERO);
        let d = ray.direction();
        assert!(d.x < 0.0 && d.y > 0.0 && d.z < 0.0);
        // 90 degree fov: the corner sits at (-1, 1, -1) before normalizing.
        assert!((d - Vec3::new(-1.0, 1.0, -1.0).normalize()).length() < 1e-5);
    }
}
