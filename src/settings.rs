use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use config::{Config, Environment, File};
use geo_types::{Coord, Rect};
use log::info;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::color::LaserColor;
use crate::config::VEC_LENGTH_THRESHOLD;
use crate::dispersion::{Dispersion, Substance};
use crate::geom::Scene;
use crate::laser::Laser;
use crate::medium::{Medium, Prototype};
use crate::propagation::Propagator;
use crate::view::{View, ViewSettings};
use crate::wave::WaveSettings;


/// Runtime configuration for the application.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    pub laser: LaserSettings,
    pub environment: EnvironmentSettings,
    pub media: Vec<MediumSettings>,
    pub domain: DomainSettings,
    pub engine: EngineSettings,
    pub wave: WaveSettings,
    pub view: ViewSettings,
    pub run: RunSettings,
}

fn default_directory() -> PathBuf {
    PathBuf::from("output")
}

fn default_size() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LaserSettings {
    pub emission_point: [f64; 2], // (m)
    pub pivot: [f64; 2],          // (m)
    pub angle: Option<f64>,       // degrees, rotates the emission point about the pivot
    pub wavelength: f64,          // vacuum wavelength (m)
    #[serde(default)]
    pub white: bool,
    pub power: f64,
    #[serde(default)]
    pub wave: bool,
    #[serde(default = "default_true")]
    pub on: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EnvironmentSettings {
    pub substance: Option<Substance>,
    pub index: Option<f64>,
    #[serde(default)]
    pub dispersive: bool,
}

/// One prism: either explicit vertices or a prototype, then moved into place.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MediumSettings {
    #[serde(default)]
    pub vertices: Vec<[f64; 2]>,
    pub prototype: Option<Prototype>,
    #[serde(default = "default_size")]
    pub size: f64,
    #[serde(default)]
    pub translate: [f64; 2],
    #[serde(default)]
    pub rotate: f64, // degrees, about the prism's rotation centre
    pub substance: Option<Substance>,
    pub index: Option<f64>,
    #[serde(default)]
    pub dispersive: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DomainSettings {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EngineSettings {
    pub max_depth: usize,
    pub min_power: f64,
    #[serde(default = "default_true")]
    pub show_reflections: bool, // partial reflections, TIR is always shown
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RunSettings {
    pub ticks: usize, // wave ticks simulated by the binary
    pub dt: f64,      // seconds per tick
}

/// Resolves a substance or an explicit index into a dispersion curve.
fn dispersion_of(substance: Option<Substance>, index: Option<f64>, dispersive: bool) -> Result<Dispersion> {
    match (substance, index) {
        (Some(substance), _) => Ok(substance.dispersion()),
        (None, Some(index)) => Ok(Dispersion::new(index, dispersive)),
        (None, None) => Err(anyhow!("either a substance or an index is required")),
    }
}

impl EnvironmentSettings {
    pub fn dispersion(&self) -> Result<Dispersion> {
        dispersion_of(self.substance, self.index, self.dispersive).context("invalid environment")
    }
}

impl MediumSettings {
    pub fn dispersion(&self) -> Result<Dispersion> {
        dispersion_of(self.substance, self.index, self.dispersive)
    }

    /// Builds the prism and moves it into place.
    pub fn build(&self) -> Result<Medium> {
        let dispersion = self.dispersion()?;
        let mut medium = match (self.prototype, self.vertices.is_empty()) {
            (Some(prototype), _) => Medium::prototype(prototype, self.size, dispersion)?,
            (None, false) => Medium::from_vertices(&self.vertices, dispersion)?,
            (None, true) => bail!("a medium needs either vertices or a prototype"),
        };
        medium.rotate(self.rotate.to_radians());
        medium.translate(Vector2::new(self.translate[0], self.translate[1]));
        Ok(medium)
    }
}

impl DomainSettings {
    pub fn rect(&self) -> Rect<f64> {
        Rect::new(
            Coord { x: self.min[0], y: self.min[1] },
            Coord { x: self.max[0], y: self.max[1] },
        )
    }
}

impl Settings {
    /// Builds the scene described by the environment, media and domain.
    pub fn build_scene(&self) -> Result<Scene> {
        let media = self
            .media
            .iter()
            .enumerate()
            .map(|(i, medium)| medium.build().with_context(|| format!("invalid medium #{}", i)))
            .collect::<Result<Vec<_>>>()?;
        let scene = Scene::new(media, self.environment.dispersion()?, self.domain.rect())?;
        Ok(scene)
    }

    pub fn build_laser(&self) -> Laser {
        let settings = &self.laser;
        let color = if settings.white {
            LaserColor::White
        } else {
            LaserColor::OneColor(settings.wavelength)
        };
        let mut laser = Laser::new(
            Point2::from(settings.emission_point),
            Point2::from(settings.pivot),
            color,
            settings.power,
        );
        laser.wave = settings.wave;
        laser.on = settings.on;
        if let Some(angle) = settings.angle {
            laser.set_angle(angle.to_radians());
        }
        laser
    }

    pub fn propagator(&self) -> Propagator {
        Propagator::new(self.engine.max_depth, self.engine.min_power).with_reflections(self.engine.show_reflections)
    }

    /// A view of the configured pixel size showing the whole domain.
    pub fn view(&self) -> View {
        self.view.view_of(&self.domain.rect())
    }
}

/// Loads only `config/default.toml`.
pub fn load_default_config() -> Result<Settings> {
    let prisma_dir = retrieve_project_root()?;
    let default_config_file = prisma_dir.join("config/default.toml");

    let settings: Config = Config::builder()
        .add_source(File::from(default_config_file).required(true))
        .build()
        .context("error loading configuration")?;

    let config: Settings = settings
        .try_deserialize()
        .context("error deserializing configuration")?;

    validate_config(&config)?;

    Ok(config)
}

/// Loads the configuration, parsing the command line.
pub fn load_config() -> Result<Settings> {
    load_config_with(&CliArgs::parse())
}

/// Loads the configuration layers in order: the default file, the local file (or the
/// file given with `--config`), `PRISMA_` environment variables, then command line flags.
pub fn load_config_with(args: &CliArgs) -> Result<Settings> {
    let prisma_dir = retrieve_project_root()?;

    let default_config_file = prisma_dir.join("config/default.toml");
    let overlay = match &args.config {
        Some(path) => Some(path.clone()),
        None => {
            let local_config = prisma_dir.join("config/local.toml");
            local_config.exists().then_some(local_config)
        }
    };

    let mut builder = Config::builder().add_source(File::from(default_config_file).required(true));
    if let Some(path) = &overlay {
        info!("Using configuration overlay: {:?}", path);
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    let settings: Config = builder
        .add_source(
            Environment::with_prefix("prisma")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("error loading configuration")?;

    let mut config: Settings = settings
        .try_deserialize()
        .context("error deserializing configuration")?;

    // Override values with command line arguments
    if let Some(wavelength) = args.wavelength {
        config.laser.wavelength = wavelength * 1e-9;
    }
    if args.white {
        config.laser.white = true;
    }
    if let Some(angle) = args.angle {
        config.laser.angle = Some(angle);
    }
    if let Some(emission) = args.emission {
        // the pivot moves with the emission point
        let laser = &mut config.laser;
        laser.pivot = [
            laser.pivot[0] + emission[0] - laser.emission_point[0],
            laser.pivot[1] + emission[1] - laser.emission_point[1],
        ];
        laser.emission_point = emission;
    }
    if let Some(power) = args.power {
        config.laser.power = power;
    }
    if args.wave {
        config.laser.wave = true;
    }
    if let Some(max_depth) = args.max_depth {
        config.engine.max_depth = max_depth;
    }
    if let Some(min_power) = args.min_power {
        config.engine.min_power = min_power;
    }
    if args.hide_reflections {
        config.engine.show_reflections = false;
    }
    if let Some(ticks) = args.ticks {
        config.run.ticks = ticks;
    }
    if let Some(dt) = args.dt {
        config.run.dt = dt;
    }
    if let Some(dir) = &args.dir {
        config.directory = dir.clone();
    }

    validate_config(&config)?;

    info!("{}", config);

    Ok(config)
}

/// Retrieve the project root directory.
/// This function tries to find the project root directory in different ways:
/// 1. If the CARGO_MANIFEST_DIR environment variable is set, use it.
/// 2. If the PRISMA_ROOT_DIR environment variable is set, use it.
/// 3. If the "config" subdirectory is found in the executable directory or any of its parents, use it.
fn retrieve_project_root() -> Result<PathBuf> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        // When running through cargo (e.g. cargo run, cargo test)
        return Ok(PathBuf::from(manifest_dir));
    }
    if let Ok(path) = env::var("PRISMA_ROOT_DIR") {
        return Ok(PathBuf::from(path));
    }

    // Fallback: walk upward from the executable directory
    let exe_path = env::current_exe().context("failed to get current executable path")?;
    exe_path
        .ancestors()
        .skip(1)
        .find(|dir| dir.join("config").is_dir())
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("could not find project root directory"))
}

/// Rejects settings the engine cannot run with.
pub fn validate_config(config: &Settings) -> Result<()> {
    let laser = &config.laser;
    if !(laser.wavelength.is_finite() && laser.wavelength > 0.0) {
        bail!("wavelength must be greater than 0, got {}", laser.wavelength);
    }
    let (dx, dy) = (laser.pivot[0] - laser.emission_point[0], laser.pivot[1] - laser.emission_point[1]);
    if !(dx.hypot(dy) > VEC_LENGTH_THRESHOLD) {
        bail!("laser emission point {:?} must not coincide with the pivot", laser.emission_point);
    }
    if !(laser.power > 0.0 && laser.power <= 1.0) {
        bail!("laser power must be in (0, 1], got {}", laser.power);
    }
    if config.engine.max_depth == 0 {
        bail!("maximum depth must be at least 1");
    }
    if !(config.engine.min_power >= 0.0) {
        bail!("minimum power must not be negative, got {}", config.engine.min_power);
    }
    if !(config.run.dt.is_finite() && config.run.dt >= 0.0) {
        bail!("time step must not be negative, got {}", config.run.dt);
    }
    if !(config.wave.width_scale.is_finite() && config.wave.width_scale > 0.0) {
        bail!("wave width scale must be greater than 0, got {}", config.wave.width_scale);
    }
    let domain = &config.domain;
    if !(domain.max[0] > domain.min[0] && domain.max[1] > domain.min[1]) {
        bail!("domain max {:?} must lie above and right of min {:?}", domain.max, domain.min);
    }
    if !(config.view.width > 0.0 && config.view.height > 0.0) {
        bail!("view size must be positive");
    }
    Ok(())
}

#[derive(Parser, Debug, Default)]
#[command(version, about = "Prisma - ray and wave optics through polygonal prisms")]
pub struct CliArgs {
    /// Laser wavelength in nanometres.
    #[arg(short, long)]
    pub wavelength: Option<f64>,

    /// Emit white light instead of a single wavelength.
    #[arg(long)]
    pub white: bool,

    /// Laser angle in degrees, measured from +x of the vector pivot to emission point.
    #[arg(short, long, allow_hyphen_values = true)]
    pub angle: Option<f64>,

    /// Laser emission point in metres. Format: x,y
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub emission: Option<[f64; 2]>,

    /// Laser power as a fraction of full intensity.
    #[arg(short, long)]
    pub power: Option<f64>,

    /// Do not propagate partial reflections. Total internal reflections are kept.
    #[arg(long)]
    pub hide_reflections: bool,

    /// Show the light as waves and simulate particle motion.
    #[arg(long)]
    pub wave: bool,

    /// The maximum number of ray generations in a tree.
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Minimum power for a new ray to be created.
    #[arg(long)]
    pub min_power: Option<f64>,

    /// Number of wave ticks to simulate.
    #[arg(long)]
    pub ticks: Option<usize>,

    /// Duration of one wave tick in seconds.
    #[arg(long)]
    pub dt: Option<f64>,

    /// Output directory.
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Configuration file laid over the defaults, in place of config/local.toml.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity. Overridden by RUST_LOG.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a point in the format "x,y"
fn parse_point(s: &str) -> Result<[f64; 2], String> {
    let values: Vec<&str> = s.split(',').collect();
    if values.len() != 2 {
        return Err(format!("Invalid point format: '{}'. Expected 'x,y'", s));
    }

    let x = values[0]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("Failed to parse x coordinate: {}", values[0]))?;
    let y = values[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("Failed to parse y coordinate: {}", values[1]))?;

    Ok([x, y])
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let color = if self.laser.white {
            "white".to_string()
        } else {
            format!("{:.1} nm", self.laser.wavelength * 1e9)
        };
        write!(
            f,
            "Settings:
  - Laser: {} at {:?} toward {:?}, power {:.3}
  - Mode: {}
  - Media: {}
  - Max Depth: {}
  - Min Power: {:.3e}
  - Reflections: {}
  - Ticks: {} x {:.3e} s
  - Directory: {:?}",
            color,
            self.laser.emission_point,
            self.laser.pivot,
            self.laser.power,
            if self.laser.wave { "wave" } else { "ray" },
            self.media.len(),
            self.engine.max_depth,
            self.engine.min_power,
            if self.engine.show_reflections { "shown" } else { "hidden" },
            self.run.ticks,
            self.run.dt,
            self.directory,
        )
    }
}
