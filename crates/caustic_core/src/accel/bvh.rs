//! Bounding Volume Hierarchy with a configurable branching factor.

use caustic_math::{Aabb, Interval, Ray};

use super::{Accelerator, Traceable};
use crate::intersection::IntersectionState;

/// BVH node - either a branch with up to `maximum_children` children or a
/// leaf with primitive indices.
pub enum BvhNode {
    Branch {
        children: Vec<BvhNode>,
        bbox: Aabb,
    },
    Leaf {
        primitives: Vec<usize>,
        bbox: Aabb,
    },
    /// Empty node (no primitives at all).
    Empty,
}

impl BvhNode {
    /// Recursive construction.
    ///
    /// Sorts primitives by centroid along the longest axis of the centroid
    /// bounds and cuts them into equal contiguous groups, as many as the
    /// leaf capacity requires but no more than `maximum_children`.
    fn build(
        mut primitives: Vec<usize>,
        bounds: &[Aabb],
        maximum_children: usize,
        nodes_on_leaves: usize,
    ) -> Self {
        let n = primitives.len();
        if n == 0 {
            return BvhNode::Empty;
        }

        let bbox = primitives
            .iter()
            .fold(Aabb::EMPTY, |acc, &i| Aabb::surrounding(&acc, &bounds[i]));

        if n <= nodes_on_leaves {
            return BvhNode::Leaf { primitives, bbox };
        }

        let centroid_bounds = primitives.iter().fold(Aabb::EMPTY, |acc, &i| {
            let c = bounds[i].centroid();
            Aabb::surrounding(&acc, &Aabb::from_points(c, c))
        });
        let axis = centroid_bounds.longest_axis();

        primitives.sort_unstable_by(|&a, &b| {
            let a_val = bounds[a].centroid()[axis];
            let b_val = bounds[b].centroid()[axis];
            a_val
                .partial_cmp(&b_val)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let groups = maximum_children.min(n.div_ceil(nodes_on_leaves)).max(2);
        let chunk = n.div_ceil(groups);
        let children = primitives
            .chunks(chunk)
            .map(|group| Self::build(group.to_vec(), bounds, maximum_children, nodes_on_leaves))
            .collect();

        BvhNode::Branch { children, bbox }
    }

    fn bounding_box(&self) -> Aabb {
        match self {
            BvhNode::Empty => Aabb::EMPTY,
            BvhNode::Leaf { bbox, .. } => *bbox,
            BvhNode::Branch { bbox, .. } => *bbox,
        }
    }

    fn depth(&self) -> usize {
        match self {
            BvhNode::Branch { children, .. } => {
                1 + children.iter().map(BvhNode::depth).max().unwrap_or(0)
            }
            _ => 1,
        }
    }

    fn hit<'a, T: Traceable + ?Sized>(
        &self,
        primitives: &'a T,
        ray: &Ray,
        ray_t: Interval,
        state: &mut IntersectionState<'a>,
    ) -> bool {
        match self {
            BvhNode::Empty => false,

            BvhNode::Leaf { primitives: indices, bbox } => {
                if !bbox.hit(ray, ray_t) {
                    return false;
                }

                let mut hit_anything = false;
                let mut closest = ray_t.max;

                for &index in indices {
                    let interval = Interval::new(ray_t.min, closest);
                    if primitives.intersect_primitive(index, ray, interval, state) {
                        hit_anything = true;
                        closest = state.intersection_t;
                    }
                }
                hit_anything
            }

            BvhNode::Branch { children, bbox } => {
                if !bbox.hit(ray, ray_t) {
                    return false;
                }

                // Each child only searches up to the closest hit so far
                let mut hit_anything = false;
                let mut closest = ray_t.max;
                for child in children {
                    if child.hit(primitives, ray, Interval::new(ray_t.min, closest), state) {
                        hit_anything = true;
                        closest = state.intersection_t;
                    }
                }
                hit_anything
            }
        }
    }
}

/// BVH over indexed primitive bounds.
pub struct Bvh {
    root: BvhNode,
}

impl Bvh {
    pub fn new(bounds: &[Aabb], maximum_children: usize, nodes_on_leaves: usize) -> Self {
        let root = BvhNode::build(
            (0..bounds.len()).collect(),
            bounds,
            maximum_children,
            nodes_on_leaves,
        );
        log::debug!(
            "Built BVH over {} primitives (max children {}, leaf size {}, depth {})",
            bounds.len(),
            maximum_children,
            nodes_on_leaves,
            root.depth()
        );
        Self { root }
    }

    pub fn root(&self) -> &BvhNode {
        &self.root
    }
}

impl Accelerator for Bvh {
    fn trace<'a, T: Traceable + ?Sized>(
        &self,
        primitives: &'a T,
        ray: &Ray,
        ray_t: Interval,
        state: &mut IntersectionState<'a>,
    ) -> bool {
        self.root.hit(primitives, ray, ray_t, state)
    }

    fn bounds(&self) -> Aabb {
        self.root.bounding_box()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caustic_math::Vec3;

    fn unit_boxes(n: usize) -> Vec<Aabb> {
        (0..n)
            .map(|i| {
                let c = Vec3::new(i as f32 * 2.0, 0.0, 0.0);
                Aabb::from_points(c - Vec3::splat(0.5), c + Vec3::splat(0.5))
            })
            .collect()
    }

    fn max_fanout(node: &BvhNode) -> usize {
        match node {
            BvhNode::Branch { children, .. } => children
                .iter()
                .map(max_fanout)
                .max()
                .unwrap_or(0)
                .max(children.len()),
            _ => 0,
        }
    }

    fn max_leaf(node: &BvhNode) -> usize {
        match node {
            BvhNode::Branch { children, .. } => children.iter().map(max_leaf).max().unwrap_or(0),
            BvhNode::Leaf { primitives, .. } => primitives.len(),
            BvhNode::Empty => 0,
        }
    }

    #[test]
    fn test_bvh_empty() {
        let bvh = Bvh::new(&[], 2, 2);
        assert!(matches!(bvh.root(), BvhNode::Empty));
    }

    #[test]
    fn test_bvh_single_leaf() {
        let bvh = Bvh::new(&unit_boxes(2), 4, 2);
        assert!(matches!(bvh.root(), BvhNode::Leaf { .. }));
    }

    #[test]
    fn test_bvh_respects_fanout_and_leaf_size() {
        for (children, leaf) in [(2, 1), (4, 3), (8, 2)] {
            let bvh = Bvh::new(&unit_boxes(50), children, leaf);
            assert!(max_fanout(bvh.root()) <= children);
            assert!(max_leaf(bvh.root()) <= leaf);
        }
    }

    #[test]
    fn test_bvh_bounds_cover_all_primitives() {
        let boxes = unit_boxes(7);
        let bvh = Bvh::new(&boxes, 3, 2);
        let bounds = bvh.bounds();
        assert_eq!(bounds.min(), Vec3::splat(-0.5));
        assert_eq!(bounds.max(), Vec3::new(12.5, 0.5, 0.5));
    }
}
