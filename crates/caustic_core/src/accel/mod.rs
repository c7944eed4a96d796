//! Spatial acceleration structures for ray/primitive queries.
//!
//! An acceleration structure only stores primitive indices and bounds. The
//! primitives themselves live in whoever implements [`Traceable`] (a mesh for
//! its triangles, a scene object for its meshes, the scene for its objects),
//! which keeps one set of structures usable at every level of the scene.

mod bvh;
mod grid;
mod linear;

pub use bvh::{Bvh, BvhNode};
pub use grid::UniformGrid;
pub use linear::LinearScan;

use caustic_math::{Aabb, Interval, Ray, UVec3};

use crate::error::{AccelError, AccelResult};
use crate::intersection::IntersectionState;

/// Which acceleration structure to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccelerationKind {
    /// Test every primitive.
    #[default]
    None,
    UniformGrid,
    Bvh,
}

/// A collection of primitives addressable by index.
pub trait Traceable {
    /// Intersect primitive `index`, recording into `state` only a hit strictly
    /// inside `ray_t`. Returns true if a hit was recorded.
    fn intersect_primitive<'a>(
        &'a self,
        index: usize,
        ray: &Ray,
        ray_t: Interval,
        state: &mut IntersectionState<'a>,
    ) -> bool;
}

/// Nearest-hit query over indexed primitives.
pub trait Accelerator {
    /// Find the nearest hit inside `ray_t`, overwriting `state` on success.
    fn trace<'a, T: Traceable + ?Sized>(
        &self,
        primitives: &'a T,
        ray: &Ray,
        ray_t: Interval,
        state: &mut IntersectionState<'a>,
    ) -> bool;

    /// Bounds of everything the structure indexes.
    fn bounds(&self) -> Aabb;
}

/// Build-time parameters for an acceleration structure.
///
/// Only read when the owning scene is built; afterwards the structure is
/// immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct AccelerationConfig {
    kind: AccelerationKind,
    maximum_children: usize,
    nodes_on_leaves: usize,
    suggested_grid_size: UVec3,
}

impl AccelerationConfig {
    pub fn new(kind: AccelerationKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn kind(&self) -> AccelerationKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: AccelerationKind) -> &mut Self {
        self.kind = kind;
        self
    }

    /// Maximum number of children per BVH branch.
    pub fn maximum_children(&self) -> usize {
        self.maximum_children
    }

    pub fn set_maximum_children(&mut self, maximum_children: usize) -> &mut Self {
        self.maximum_children = maximum_children;
        self
    }

    /// Maximum number of primitives per BVH leaf.
    pub fn nodes_on_leaves(&self) -> usize {
        self.nodes_on_leaves
    }

    pub fn set_nodes_on_leaves(&mut self, nodes_on_leaves: usize) -> &mut Self {
        self.nodes_on_leaves = nodes_on_leaves;
        self
    }

    /// Cell count per axis for the uniform grid.
    pub fn suggested_grid_size(&self) -> UVec3 {
        self.suggested_grid_size
    }

    pub fn set_suggested_grid_size(&mut self, size: UVec3) -> &mut Self {
        self.suggested_grid_size = size;
        self
    }

    /// Reject parameters the selected structure cannot be built with.
    pub fn validate(&self) -> AccelResult<()> {
        match self.kind {
            AccelerationKind::None => Ok(()),
            AccelerationKind::Bvh => {
                if self.nodes_on_leaves == 0 {
                    return Err(AccelError::InvalidLeafCapacity(self.nodes_on_leaves));
                }
                if self.maximum_children < 2 {
                    return Err(AccelError::InvalidMaximumChildren(self.maximum_children));
                }
                Ok(())
            }
            AccelerationKind::UniformGrid => {
                if self.suggested_grid_size.min_element() == 0 {
                    return Err(AccelError::InvalidGridSize(self.suggested_grid_size));
                }
                Ok(())
            }
        }
    }
}

impl Default for AccelerationConfig {
    fn default() -> Self {
        Self {
            kind: AccelerationKind::None,
            maximum_children: 2,
            nodes_on_leaves: 2,
            suggested_grid_size: UVec3::splat(10),
        }
    }
}

/// Built acceleration structure, one variant per [`AccelerationKind`].
pub enum AccelerationStructure {
    None(LinearScan),
    UniformGrid(UniformGrid),
    Bvh(Bvh),
}

impl AccelerationStructure {
    /// Build the structure described by `config` over primitives with the
    /// given bounds (indexed by position in the slice).
    pub fn build(config: &AccelerationConfig, bounds: &[Aabb]) -> AccelResult<Self> {
        config.validate()?;
        let structure = match config.kind() {
            AccelerationKind::None => Self::None(LinearScan::new(bounds)),
            AccelerationKind::UniformGrid => {
                Self::UniformGrid(UniformGrid::new(bounds, config.suggested_grid_size()))
            }
            AccelerationKind::Bvh => Self::Bvh(Bvh::new(
                bounds,
                config.maximum_children(),
                config.nodes_on_leaves(),
            )),
        };
        Ok(structure)
    }

    pub fn kind(&self) -> AccelerationKind {
        match self {
            Self::None(_) => AccelerationKind::None,
            Self::UniformGrid(_) => AccelerationKind::UniformGrid,
            Self::Bvh(_) => AccelerationKind::Bvh,
        }
    }
}

impl Accelerator for AccelerationStructure {
    fn trace<'a, T: Traceable + ?Sized>(
        &self,
        primitives: &'a T,
        ray: &Ray,
        ray_t: Interval,
        state: &mut IntersectionState<'a>,
    ) -> bool {
        match self {
            Self::None(linear) => linear.trace(primitives, ray, ray_t, state),
            Self::UniformGrid(grid) => grid.trace(primitives, ray, ray_t, state),
            Self::Bvh(bvh) => bvh.trace(primitives, ray, ray_t, state),
        }
    }

    fn bounds(&self) -> Aabb {
        match self {
            Self::None(linear) => linear.bounds(),
            Self::UniformGrid(grid) => grid.bounds(),
            Self::Bvh(bvh) => bvh.bounds(),
        }
    }
}

/// Union of a set of bounds.
pub(crate) fn union_bounds(bounds: &[Aabb]) -> Aabb {
    bounds
        .iter()
        .fold(Aabb::EMPTY, |acc, b| Aabb::surrounding(&acc, b))
}
