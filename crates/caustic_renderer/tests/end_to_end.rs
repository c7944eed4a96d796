//! Whole-pipeline checks: scene build, photon tracing, gathering and the
//! pixel loop together.

use std::sync::Arc;

use caustic_core::{
    AccelerationKind, BlinnPhongMaterial, Color, IntersectionState, Material, MeshObject, PointLight, Scene,
    SceneBuilder, SceneObject,
};
use caustic_math::{refract, Ray, Vec3};
use caustic_renderer::{
    density_estimate, render, BackwardRenderer, ColorSampler, FilterKernel, JitterSampler, PerspectiveCamera,
    PhotonMapKind, PhotonMappingRenderer, PhotonSettings, PhotonTracer, RenderSettings, Renderer,
};
use glam::UVec2;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn quad(name: &str, corners: [Vec3; 4], material: Arc<dyn Material>) -> SceneObject {
    let mut object = SceneObject::new(name);
    object.add_mesh_object(MeshObject::quad(name, corners, material));
    object
}

fn floor_corners(y: f32) -> [Vec3; 4] {
    [
        Vec3::new(-2.0, y, 2.0),
        Vec3::new(2.0, y, 2.0),
        Vec3::new(2.0, y, -2.0),
        Vec3::new(-2.0, y, -2.0),
    ]
}

/// Open box: diffuse floor and back wall, a glass slab and a mirror panel.
fn small_room(kind: AccelerationKind) -> Scene {
    let white: Arc<dyn Material> = Arc::new(BlinnPhongMaterial::new(Color::splat(0.7)));
    let red: Arc<dyn Material> = Arc::new(BlinnPhongMaterial::new(Color::new(0.7, 0.1, 0.1)));
    let glass: Arc<dyn Material> = Arc::new(
        BlinnPhongMaterial::new(Color::ZERO)
            .with_specular(Color::splat(0.2), 32.0)
            .with_transmittance(0.9)
            .with_ior(1.5),
    );
    let mirror: Arc<dyn Material> =
        Arc::new(BlinnPhongMaterial::new(Color::splat(0.05)).with_reflectivity(0.9));

    let mut builder = SceneBuilder::new();
    builder
        .add_scene_object(quad("floor", floor_corners(0.0), white.clone()))
        .add_scene_object(quad(
            "back",
            [
                Vec3::new(-2.0, 0.0, -2.0),
                Vec3::new(2.0, 0.0, -2.0),
                Vec3::new(2.0, 3.0, -2.0),
                Vec3::new(-2.0, 3.0, -2.0),
            ],
            red,
        ))
        .add_scene_object(quad(
            "glass",
            [
                Vec3::new(-0.5, 0.8, 0.5),
                Vec3::new(0.5, 0.8, 0.5),
                Vec3::new(0.5, 0.8, -0.5),
                Vec3::new(-0.5, 0.8, -0.5),
            ],
            glass,
        ))
        .add_scene_object(quad(
            "mirror",
            [
                Vec3::new(1.5, 0.0, 1.0),
                Vec3::new(1.5, 0.0, -1.0),
                Vec3::new(1.5, 2.0, -1.0),
                Vec3::new(1.5, 2.0, 1.0),
            ],
            mirror,
        ));
    builder.add_light(PointLight::new(Vec3::new(0.0, 2.5, 0.0), Color::splat(2.0)));
    if kind != AccelerationKind::None {
        builder.generate_acceleration_data(kind).set_nodes_on_leaves(1);
    }
    builder.build().unwrap()
}

fn sampler() -> Arc<dyn ColorSampler> {
    Arc::new(JitterSampler::new(UVec2::new(2, 2)))
}

fn render_settings() -> RenderSettings {
    RenderSettings {
        width: 24,
        height: 18,
        max_samples_per_pixel: 4,
        min_samples_per_pixel: 4,
        threads: 2,
        seed: 42,
        ..RenderSettings::default()
    }
}

fn camera(settings: &RenderSettings) -> PerspectiveCamera {
    PerspectiveCamera::new(settings.aspect_ratio())
        .with_position(Vec3::new(0.0, 1.5, 4.0), Vec3::new(0.0, 0.8, 0.0), Vec3::Y)
        .with_vfov(60.0)
}

#[test]
fn test_deposited_energy_never_exceeds_emitted() {
    init_logging();
    let mut builder = SceneBuilder::new();
    builder.add_scene_object(quad(
        "floor",
        floor_corners(0.0),
        Arc::new(BlinnPhongMaterial::new(Color::splat(0.8))),
    ));
    builder.add_light(PointLight::new(Vec3::new(0.0, 1.0, 0.0), Color::new(1.0, 0.5, 0.25)));
    let scene = builder.build().unwrap();

    let settings = PhotonSettings {
        diffuse_photons: 5000,
        diffuse_emission_scale: 1.0,
        include_direct: true,
        ..PhotonSettings::default()
    };
    let tracer = PhotonTracer::new(&scene, &settings);
    let (map, stats) = tracer.trace_pass(PhotonMapKind::Diffuse, 5000, 1.0, 42);

    assert_eq!(stats.emitted, 5000);
    assert!(!map.is_empty());
    let stored = map.optimise().total_energy();
    assert!((stored - stats.stored_energy).length() < 1e-2);
    assert!(
        stored.cmple(stats.emitted_energy + Color::splat(1e-3)).all(),
        "stored {stored} > emitted {}",
        stats.emitted_energy
    );
}

#[test]
fn test_range_query_unchanged_by_optimise() {
    init_logging();
    let scene = small_room(AccelerationKind::Bvh);
    let settings = PhotonSettings {
        diffuse_photons: 3000,
        ..PhotonSettings::default()
    };
    let tracer = PhotonTracer::new(&scene, &settings);
    let (builder, _) = tracer.trace_pass(PhotonMapKind::Diffuse, 3000, 1.0, 7);
    let queries = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.5, 0.0, -1.0), Vec3::new(0.0, 1.5, -2.0)];

    let before: Vec<Vec<_>> = queries
        .iter()
        .map(|q| {
            let mut found: Vec<_> = builder.find_within_range(*q, 0.4).into_iter().copied().collect();
            found.sort_by(|a, b| a.position.to_array().partial_cmp(&b.position.to_array()).unwrap());
            found
        })
        .collect();

    let map = builder.optimise();
    for (q, expected) in queries.iter().zip(&before) {
        let mut found: Vec<_> = map.find_within_range(*q, 0.4).into_iter().copied().collect();
        found.sort_by(|a, b| a.position.to_array().partial_cmp(&b.position.to_array()).unwrap());
        assert_eq!(&found, expected);
    }
}

#[test]
fn test_zero_radius_and_empty_map_gather_nothing() {
    init_logging();
    let scene = Arc::new(small_room(AccelerationKind::None));
    let settings = PhotonSettings {
        diffuse_photons: 2000,
        caustic_photons: 0,
        ..PhotonSettings::default()
    };
    let mut renderer = PhotonMappingRenderer::new(scene.clone(), sampler(), settings);
    renderer.initialize_renderer();

    let ray = Ray::new(Vec3::new(0.0, 1.5, 4.0), Vec3::new(0.3, -1.5, -3.0).normalize());
    let mut state = IntersectionState::new(0, 0);
    assert!(scene.trace(&ray, &mut state));

    for kernel in [FilterKernel::Uniform, FilterKernel::cone(), FilterKernel::gaussian()] {
        let zero = density_estimate(renderer.diffuse_map(), &state, &ray, 0.0, kernel);
        assert_eq!(zero, Color::ZERO);
        let empty = density_estimate(renderer.caustic_map(), &state, &ray, 0.5, kernel);
        assert_eq!(empty, Color::ZERO);
        let some = density_estimate(renderer.diffuse_map(), &state, &ray, 0.5, kernel);
        assert!(some.is_finite() && some.cmpge(Color::ZERO).all());
    }
}

#[test]
fn test_zero_photons_matches_backward_renderer() {
    init_logging();
    let scene = Arc::new(small_room(AccelerationKind::UniformGrid));
    let settings = render_settings();
    let camera = camera(&settings);

    let backward = BackwardRenderer::new(scene.clone(), sampler());
    let mut photon = PhotonMappingRenderer::new(scene, sampler(), PhotonSettings::disabled());
    photon.initialize_renderer();
    assert!(photon.diffuse_map().is_empty());
    assert!(photon.caustic_map().is_empty());
    assert_eq!(photon.diffuse_stats().emitted, 0);

    let (expected, expected_stats) = render(&camera, &backward, &settings).unwrap();
    let (actual, actual_stats) = render(&camera, &photon, &settings).unwrap();
    assert_eq!(actual, expected);
    assert_eq!(actual_stats, expected_stats);
}

#[test]
fn test_photon_render_is_finite_and_brighter() {
    init_logging();
    let scene = Arc::new(small_room(AccelerationKind::Bvh));
    let settings = render_settings();
    let camera = camera(&settings);
    let photons = PhotonSettings {
        diffuse_photons: 4000,
        caustic_photons: 4000,
        gather_samples: 4,
        seed: 42,
        ..PhotonSettings::default()
    };

    let backward = BackwardRenderer::new(scene.clone(), sampler());
    let mut photon = PhotonMappingRenderer::new(scene, sampler(), photons);
    photon.initialize_renderer();
    assert!(!photon.diffuse_map().is_empty());
    assert!(!photon.caustic_map().is_empty());

    let (direct, _) = render(&camera, &backward, &settings).unwrap();
    let (full, stats) = render(&camera, &photon, &settings).unwrap();
    assert_eq!(stats.pixels, 24 * 18);
    assert!(full.pixels.iter().all(|c| c.is_finite() && c.cmpge(Color::ZERO).all()));

    let sum = |pixels: &[Color]| pixels.iter().copied().sum::<Color>().element_sum();
    assert!(sum(&full.pixels) > sum(&direct.pixels));
}

#[test]
fn test_total_internal_reflection_gives_unit_direction() {
    init_logging();
    let normal = Vec3::Y;
    // Shallow ray leaving glass into air
    let incident = Vec3::new(1.0, -0.2, 0.0).normalize();
    assert!(refract(incident, normal, 1.5, 1.0).is_none());

    let ray = Ray::new(Vec3::ZERO, incident);
    let bent = ray.refract(normal, 1.5, 1.0);
    assert!(bent.is_finite());
    assert!((bent.length() - 1.0).abs() < 1e-5);
    assert!(bent.y > 0.0);
}
