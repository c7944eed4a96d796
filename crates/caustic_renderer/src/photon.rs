//! Photons and the photon map.
//!
//! Photons are collected into a [`PhotonMapBuilder`] while tracing and then
//! frozen with [`PhotonMapBuilder::optimise`] into a kd-tree backed
//! [`PhotonMap`] that only answers radius queries.

use caustic_core::Color;
use caustic_math::{Ray, Vec3};
use kd_tree::{KdPoint, KdTree};

/// A packet of light energy deposited on a diffuse surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Photon {
    /// Deposit position, lifted slightly off the surface
    pub position: Vec3,
    /// Surface normal on the side the photon arrived from
    pub normal: Vec3,
    pub energy: Color,
    /// Ray from the deposit point back along the incoming direction
    pub to_light_ray: Ray,
}

impl KdPoint for Photon {
    type Scalar = f32;
    type Dim = typenum::U3;
    fn at(&self, k: usize) -> f32 {
        self.position[k]
    }
}

/// Photon storage during tracing.
#[derive(Debug, Clone, Default)]
pub struct PhotonMapBuilder {
    photons: Vec<Photon>,
}

impl PhotonMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, photon: Photon) {
        self.photons.push(photon);
    }

    /// Append every photon of `other`, keeping its order.
    pub fn append(&mut self, other: PhotonMapBuilder) {
        self.photons.extend(other.photons);
    }

    /// Multiply the energy of every stored photon by `factor`.
    pub fn scale_energy(&mut self, factor: f32) {
        for photon in &mut self.photons {
            photon.energy *= factor;
        }
    }

    pub fn len(&self) -> usize {
        self.photons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photons.is_empty()
    }

    pub fn photons(&self) -> &[Photon] {
        &self.photons
    }

    /// Linear scan for photons within `radius` of `point`.
    pub fn find_within_range(&self, point: Vec3, radius: f32) -> Vec<&Photon> {
        if radius <= 0.0 {
            return Vec::new();
        }
        let radius_sq = radius * radius;
        self.photons
            .iter()
            .filter(|p| p.position.distance_squared(point) <= radius_sq)
            .collect()
    }

    /// Build the spatial index. The builder is consumed; the map is read-only.
    pub fn optimise(self) -> PhotonMap {
        let count = self.photons.len();
        let total_energy = self.photons.iter().map(|p| p.energy).sum();
        let tree = (!self.photons.is_empty()).then(|| {
            KdTree::build_by(self.photons, |a, b, k| {
                a.position[k]
                    .partial_cmp(&b.position[k])
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        });
        PhotonMap {
            tree,
            count,
            total_energy,
        }
    }
}

/// Frozen photon map answering radius queries.
pub struct PhotonMap {
    tree: Option<KdTree<Photon>>,
    count: usize,
    total_energy: Color,
}

impl PhotonMap {
    /// A map with no photons.
    pub fn empty() -> Self {
        Self {
            tree: None,
            count: 0,
            total_energy: Color::ZERO,
        }
    }

    /// Photons within `radius` of `point`. Non-positive radii find nothing.
    pub fn find_within_range(&self, point: Vec3, radius: f32) -> Vec<&Photon> {
        match &self.tree {
            Some(tree) if radius > 0.0 => tree.within_radius(&[point.x, point.y, point.z], radius),
            _ => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Sum of the energy of every stored photon.
    pub fn total_energy(&self) -> Color {
        self.total_energy
    }
}

impl Default for PhotonMap {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn photon_at(position: Vec3) -> Photon {
        Photon {
            position,
            normal: Vec3::Y,
            energy: Color::splat(0.1),
            to_light_ray: Ray::new(position, Vec3::Y),
        }
    }

    fn random_builder(n: usize) -> PhotonMapBuilder {
        let mut rng = StdRng::seed_from_u64(42);
        let mut builder = PhotonMapBuilder::new();
        for _ in 0..n {
            let p = Vec3::new(rng.gen(), rng.gen(), rng.gen());
            builder.insert(photon_at(p));
        }
        builder
    }

    fn sorted_positions(photons: Vec<&Photon>) -> Vec<[f32; 3]> {
        let mut out: Vec<[f32; 3]> = photons.iter().map(|p| p.position.to_array()).collect();
        out.sort_by(|a, b| a.partial_cmp(b).unwrap());
        out
    }

    #[test]
    fn test_optimise_preserves_query_results() {
        let builder = random_builder(500);
        let queries = [
            (Vec3::splat(0.5), 0.13),
            (Vec3::new(0.1, 0.9, 0.3), 0.21),
            (Vec3::new(2.0, 2.0, 2.0), 0.5),
        ];
        let before: Vec<_> = queries
            .iter()
            .map(|(p, r)| sorted_positions(builder.find_within_range(*p, *r)))
            .collect();

        let map = builder.optimise();
        assert_eq!(map.len(), 500);
        for ((p, r), expected) in queries.iter().zip(before) {
            assert_eq!(sorted_positions(map.find_within_range(*p, *r)), expected);
        }
    }

    #[test]
    fn test_zero_radius_and_empty_map_find_nothing() {
        let map = random_builder(50).optimise();
        assert!(map.find_within_range(Vec3::splat(0.5), 0.0).is_empty());
        assert!(map.find_within_range(Vec3::splat(0.5), -1.0).is_empty());

        let empty = PhotonMapBuilder::new().optimise();
        assert!(empty.is_empty());
        assert_eq!(empty.total_energy(), Color::ZERO);
        assert!(empty.find_within_range(Vec3::ZERO, 10.0).is_empty());
    }

    #[test]
    fn test_scale_energy_scales_every_photon() {
        let mut builder = random_builder(10);
        builder.scale_energy(0.5);
        assert!(builder.photons().iter().all(|p| p.energy == Color::splat(0.05)));
        assert!((builder.optimise().total_energy() - Color::splat(0.5)).length() < 1e-5);
    }

    #[test]
    fn test_total_energy_sums_photons() {
        let map = random_builder(10).optimise();
        assert!((map.total_energy() - Color::splat(1.0)).length() < 1e-5);
    }
}
