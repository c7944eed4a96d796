//! Uniform grid traversed with a 3D DDA.

use caustic_math::{Aabb, IVec3, Interval, Ray, UVec3, Vec3};

use super::{union_bounds, Accelerator, Traceable};
use crate::intersection::IntersectionState;

/// Regular grid over the primitives' bounds.
///
/// Each primitive is registered in every cell its bounding box overlaps.
/// Rays walk the cells front to back and stop as soon as a hit lies inside
/// the current cell.
pub struct UniformGrid {
    bounds: Aabb,
    resolution: UVec3,
    cell_size: Vec3,
    cells: Vec<Vec<usize>>,
}

impl UniformGrid {
    pub fn new(bounds: &[Aabb], resolution: UVec3) -> Self {
        let world = union_bounds(bounds);
        if bounds.is_empty() {
            return Self {
                bounds: world,
                resolution,
                cell_size: Vec3::ZERO,
                cells: Vec::new(),
            };
        }

        let cell_size = world.extent() / resolution.as_vec3();
        let cell_count = (resolution.x * resolution.y * resolution.z) as usize;
        let mut grid = Self {
            bounds: world,
            resolution,
            cell_size,
            cells: vec![Vec::new(); cell_count],
        };

        let mut registrations = 0usize;
        for (index, bbox) in bounds.iter().enumerate() {
            let lo = grid.cell_coords(bbox.min());
            let hi = grid.cell_coords(bbox.max());
            for z in lo.z..=hi.z {
                for y in lo.y..=hi.y {
                    for x in lo.x..=hi.x {
                        let cell = grid.cell_index(IVec3::new(x, y, z));
                        grid.cells[cell].push(index);
                        registrations += 1;
                    }
                }
            }
        }

        log::debug!(
            "Built {}x{}x{} uniform grid over {} primitives ({} cell entries)",
            resolution.x,
            resolution.y,
            resolution.z,
            bounds.len(),
            registrations
        );
        grid
    }

    pub fn resolution(&self) -> UVec3 {
        self.resolution
    }

    /// Primitives registered in the cell at `coords`.
    pub fn cell(&self, coords: UVec3) -> &[usize] {
        if self.cells.is_empty() || coords.cmpge(self.resolution).any() {
            return &[];
        }
        &self.cells[self.cell_index(coords.as_ivec3())]
    }

    /// Cell containing `point`, clamped into the grid.
    fn cell_coords(&self, point: Vec3) -> IVec3 {
        let relative = (point - self.bounds.min()) / self.cell_size;
        let max = self.resolution.as_ivec3() - IVec3::ONE;
        relative.floor().as_ivec3().clamp(IVec3::ZERO, max)
    }

    fn cell_index(&self, coords: IVec3) -> usize {
        let res = self.resolution.as_ivec3();
        (coords.x + res.x * (coords.y + res.y * coords.z)) as usize
    }
}

impl Accelerator for UniformGrid {
    fn trace<'a, T: Traceable + ?Sized>(
        &self,
        primitives: &'a T,
        ray: &Ray,
        ray_t: Interval,
        state: &mut IntersectionState<'a>,
    ) -> bool {
        if self.cells.is_empty() {
            return false;
        }
        let Some(range) = self.bounds.hit_range(ray, ray_t) else {
            return false;
        };

        let origin = ray.origin();
        let direction = ray.direction();
        let grid_min = self.bounds.min();
        let res = self.resolution.as_ivec3();

        let mut cell = self.cell_coords(ray.at(range.min));
        let mut step = IVec3::ZERO;
        let mut t_next = Vec3::splat(f32::INFINITY);
        let mut t_delta = Vec3::splat(f32::INFINITY);
        for axis in 0..3 {
            let d = direction[axis];
            if d > 0.0 {
                step[axis] = 1;
                let boundary = grid_min[axis] + (cell[axis] + 1) as f32 * self.cell_size[axis];
                t_next[axis] = (boundary - origin[axis]) / d;
                t_delta[axis] = self.cell_size[axis] / d;
            } else if d < 0.0 {
                step[axis] = -1;
                let boundary = grid_min[axis] + cell[axis] as f32 * self.cell_size[axis];
                t_next[axis] = (boundary - origin[axis]) / d;
                t_delta[axis] = -self.cell_size[axis] / d;
            }
        }

        let mut hit_anything = false;
        let mut closest = ray_t.max;
        loop {
            let cell_exit = t_next.min_element();

            for &index in &self.cells[self.cell_index(cell)] {
                let interval = Interval::new(ray_t.min, closest);
                if primitives.intersect_primitive(index, ray, interval, state) {
                    hit_anything = true;
                    closest = state.intersection_t;
                }
            }

            // Later cells can only hold hits beyond this cell's exit.
            if hit_anything && closest <= cell_exit {
                return true;
            }
            if cell_exit >= range.max {
                break;
            }

            let axis = if t_next.x <= t_next.y && t_next.x <= t_next.z {
                0
            } else if t_next.y <= t_next.z {
                1
            } else {
                2
            };
            cell[axis] += step[axis];
            if cell[axis] < 0 || cell[axis] >= res[axis] {
                break;
            }
            t_next[axis] += t_delta[axis];
        }

        hit_anything
    }

    fn bounds(&self) -> Aabb {
        self.bounds
    }
}
