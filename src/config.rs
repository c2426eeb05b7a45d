use std::f64::consts::PI;

/// Speed of light in vacuum (m/s).
pub const SPEED_OF_LIGHT: f64 = 2.99792458e8;
/// Reference wavelength (m) at which a blended dispersion curve hits its nominal index.
pub const WAVELENGTH_RED: f64 = 650e-9;
/// Wavelengths (m) used to sample a white laser, ascending.
pub const WHITE_LIGHT_WAVELENGTHS: [f64; 11] = [
    380e-9, 420e-9, 460e-9, 500e-9, 540e-9, 580e-9, 620e-9, 660e-9, 700e-9, 740e-9, 780e-9,
];
/// Minimum distance traversed by a ray to an intersection, as a fraction of the domain diagonal.
/// Intersections closer than this are ignored.
pub const RAYCAST_RELATIVE_EPSILON: f64 = 1e-9;
/// Integer steps across the domain diagonal used when clipping polygons against each other.
pub const CLIP_RESOLUTION: f64 = 1e12;
/// Slack on the edge parameter so that hits exactly on a vertex are not lost.
pub const EDGE_PARAMETER_TOLERANCE: f64 = 1e-12;
/// Angles of incidence are clamped below this before evaluating the Fresnel equations.
pub const MAX_INCIDENCE_ANGLE: f64 = PI / 2.0 - 1e-6;
/// Minimum vector length to be considered a direction.
pub const VEC_LENGTH_THRESHOLD: f64 = 1e-12;
/// Default maximum number of ray generations in a tree (the root is the first).
pub const DEFAULT_MAX_DEPTH: usize = 12;
/// Default minimum power for a child ray to be created, as a fraction of full laser power.
pub const DEFAULT_MIN_POWER: f64 = 1e-3;
/// Largest laser angle allowed in wave mode while the laser sits in the top-left quadrant.
pub const MAX_ANGLE_IN_WAVE_MODE: f64 = 3.0 * PI / 4.0;
/// Brightness of the dark stripe colour relative to the particle colour.
pub const STRIPE_DARKNESS: f64 = 0.3;
