use crate::{Interval, Vec3, SMALL_EPSILON};

/// A ray with an origin, a direction and an optional maximum travel distance.
///
/// The direction is stored as given; callers that need unit length must
/// normalize. A ray without a maximum distance travels to infinity.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
}

impl Ray {
    /// Create an unbounded ray.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            max_distance: f32::INFINITY,
        }
    }

    /// Create a ray that stops after `max_distance` (e.g. a shadow ray to a light).
    pub fn with_max_distance(origin: Vec3, direction: Vec3, max_distance: f32) -> Self {
        Self {
            origin,
            direction,
            max_distance,
        }
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// The maximum travel distance, if the ray is bounded.
    pub fn max_distance(&self) -> Option<f32> {
        self.max_distance.is_finite().then_some(self.max_distance)
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Valid parameter range for intersection queries, starting at `t_min`.
    pub fn t_range(&self, t_min: f32) -> Interval {
        Interval::new(t_min, self.max_distance)
    }

    /// Mirror direction of this ray about `normal`.
    pub fn reflect(&self, normal: Vec3) -> Vec3 {
        reflect(self.direction.normalize(), normal)
    }

    /// Refracted direction of this ray when passing from a medium with
    /// index `n1` into one with index `n2`.
    ///
    /// Total internal reflection yields the mirror direction instead, so the
    /// result is always a finite unit vector for a non-degenerate input.
    pub fn refract(&self, normal: Vec3, n1: f32, n2: f32) -> Vec3 {
        refract(self.direction, normal, n1, n2).unwrap_or_else(|| self.reflect(normal))
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::Z)
    }
}

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Snell refraction of `incident` through a surface with `normal`.
///
/// The normal may face either side; it is flipped to oppose the incident
/// direction. Returns `None` on total internal reflection or a degenerate
/// index ratio.
pub fn refract(incident: Vec3, normal: Vec3, n1: f32, n2: f32) -> Option<Vec3> {
    if n2.abs() < SMALL_EPSILON {
        return None;
    }
    let i = incident.normalize();
    let mut n = normal.normalize();
    let mut cos_i = -i.dot(n);
    if cos_i < 0.0 {
        n = -n;
        cos_i = -cos_i;
    }

    let eta = n1 / n2;
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        return None;
    }

    let refracted = eta * i + (eta * cos_i - k.sqrt()) * n;
    Some(refracted.normalize())
}
