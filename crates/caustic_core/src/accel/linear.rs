use caustic_math::{Aabb, Interval, Ray};

use super::{union_bounds, Accelerator, Traceable};
use crate::intersection::IntersectionState;

/// No acceleration: every primitive is tested against every ray.
pub struct LinearScan {
    count: usize,
    bounds: Aabb,
}

impl LinearScan {
    pub fn new(bounds: &[Aabb]) -> Self {
        Self {
            count: bounds.len(),
            bounds: union_bounds(bounds),
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Accelerator for LinearScan {
    fn trace<'a, T: Traceable + ?Sized>(
        &self,
        primitives: &'a T,
        ray: &Ray,
        ray_t: Interval,
        state: &mut IntersectionState<'a>,
    ) -> bool {
        let mut hit_anything = false;
        let mut closest = ray_t.max;

        for index in 0..self.count {
            if primitives.intersect_primitive(index, ray, Interval::new(ray_t.min, closest), state) {
                hit_anything = true;
                closest = state.intersection_t;
            }
        }
        hit_anything
    }

    fn bounds(&self) -> Aabb {
        self.bounds
    }
}
