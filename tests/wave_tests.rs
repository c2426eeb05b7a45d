use geo_types::{Coord, Rect};
use nalgebra::{Point2, Vector2};
use prisma::{
    dispersion::{Dispersion, Substance},
    geom::Scene,
    propagation::Propagator,
    ray::Ray,
    settings,
    simulation::Simulation,
    view::View,
    wave::{WaveField, WaveSettings},
};

const WAVELENGTH: f64 = 650e-9;

#[test]
fn particle_count_follows_distance_travelled() {
    let domain = Rect::new(Coord { x: 0.0, y: -20e-6 }, Coord { x: 20e-6, y: 20e-6 });
    let scene = Scene::new(vec![], Substance::Water.dispersion(), domain).unwrap();
    let n = scene.index_at(&Point2::origin(), WAVELENGTH);
    let tree = Propagator::default().propagate(&scene, Ray::new(Point2::origin(), Vector2::x(), 1.0, WAVELENGTH, n));
    let ray = tree.rays[0].ray();

    let width = ray.wavelength_in_medium;
    let ticks = 50;
    // the light covers 7.3 widths in total, well short of the segment
    let dt = 7.3 * width / (ray.speed() * ticks as f64);
    assert!(7.3 * width < tree.rays[0].length);

    let mut field = WaveField::new(WaveSettings::default());
    for _ in 1..ticks {
        field.advance(&tree, dt, &View::unbounded());
    }
    let snapshot = field.advance(&tree, dt, &View::unbounded());

    let expected = (ray.speed() * ticks as f64 * dt / width).floor() as usize;
    assert_eq!(snapshot.len(), expected);
    assert_eq!(expected, 7);

    // consecutive particles are one width apart and alternate phase
    let particles = &snapshot.particles[&tree.rays[0].id];
    for pair in particles.windows(2) {
        assert!((pair[0].offset - pair[1].offset - width).abs() < 1e-9 * width);
        let phase_step = (pair[1].phase - pair[0].phase).abs();
        assert!((phase_step - std::f64::consts::PI).abs() < 1e-12);
    }
}

#[test]
fn particles_stay_on_their_segments() {
    let settings = settings::load_default_config().unwrap();
    let mut simulation = Simulation::new(
        settings.build_scene().unwrap(),
        settings.build_laser(),
        settings.propagator(),
        settings.wave,
        settings.view(),
    );
    simulation.update_laser(|laser| laser.wave = true);

    for _ in 1..200 {
        simulation.step(settings.run.dt);
    }
    let snapshot = simulation.step(settings.run.dt);
    let tree = simulation.tree();

    assert!(!snapshot.is_empty());
    assert_eq!(snapshot.pass, tree.pass);
    for particle in snapshot.iter() {
        let traced = tree.get(particle.ray).unwrap();
        assert!(particle.offset >= 0.0 && particle.offset <= traced.length);
        assert!((particle.speed - traced.ray().speed()).abs() < 1e-6);
    }
}

#[test]
fn laser_change_resets_the_particles() {
    let domain = Rect::new(Coord { x: -10e-6, y: -10e-6 }, Coord { x: 10e-6, y: 10e-6 });
    let scene = Scene::new(vec![], Dispersion::Constant(1.0), domain).unwrap();
    let laser = settings::load_default_config().unwrap().build_laser();
    let mut simulation = Simulation::new(scene, laser, Propagator::default(), WaveSettings::default(), View::unbounded());
    simulation.update_laser(|laser| laser.wave = true);

    let dt = 5.0 * WAVELENGTH / prisma::config::SPEED_OF_LIGHT;
    assert!(!simulation.step(dt).is_empty());

    simulation.update_laser(|laser| laser.set_angle(laser.angle() + 0.1));
    let snapshot = simulation.step(0.0);
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.pass, simulation.tree().pass);
}
