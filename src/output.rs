use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use log::info;
use serde::Serialize;

use crate::color::{ray_color, Color};
use crate::powers::Powers;
use crate::propagation::{RayTree, Termination};
use crate::ray::RayId;
use crate::settings::Settings;
use crate::wave::WaveSnapshot;


/// A ray segment as written to disk.
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub id: RayId,
    pub parent: Option<usize>,
    pub kind: &'static str,
    pub depth: usize,
    pub start: [f64; 2],
    pub end: [f64; 2],
    pub power: f64,
    pub wavelength: f64,
    pub refractive_index: f64,
    pub termination: Termination,
    pub normal: Option<[f64; 2]>, // outward normal at `end`
    pub color: Color,
}

/// Flattens a tree into drawable segments.
pub fn segments(tree: &RayTree) -> Vec<Segment> {
    tree.rays
        .iter()
        .map(|traced| {
            let ray = traced.ray();
            let kind = if traced.branch.is_reflected() {
                "reflected"
            } else if traced.branch.is_refracted() {
                "refracted"
            } else {
                "incident"
            };
            Segment {
                id: traced.id,
                parent: traced.parent,
                kind,
                depth: traced.depth,
                start: [ray.origin.x, ray.origin.y],
                end: [traced.end.x, traced.end.y],
                power: ray.power,
                wavelength: ray.wavelength,
                refractive_index: ray.refractive_index,
                termination: traced.termination,
                normal: traced.normal.map(|n| [n.x, n.y]),
                color: ray_color(ray),
            }
        })
        .collect()
}

#[derive(Serialize)]
struct TreeFile<'a> {
    pass: u64,
    powers: &'a Powers,
    rays: Vec<Segment>,
}

#[derive(Serialize)]
struct Summary<'a> {
    timestamp: String,
    pass: u64,
    rays: usize,
    particles: usize,
    powers: &'a Powers,
    missing: f64,
}

fn create(dir: &Path, name: &str) -> Result<BufWriter<File>> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create directory {:?}", dir))?;
    let path = dir.join(name);
    let file = File::create(&path).with_context(|| format!("failed to create {:?}", path))?;
    info!("writing {:?}", path);
    Ok(BufWriter::new(file))
}

fn write_json<T: Serialize>(value: &T, dir: &Path, name: &str) -> Result<()> {
    let mut writer = create(dir, name)?;
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Write the ray segments of a tree to `rays.json`.
pub fn write_tree(tree: &RayTree, dir: &Path) -> Result<()> {
    let file = TreeFile {
        pass: tree.pass,
        powers: &tree.powers,
        rays: segments(tree),
    };
    write_json(&file, dir, "rays.json")
}

/// Write the particle population to `particles.json`.
pub fn write_particles(snapshot: &WaveSnapshot, dir: &Path) -> Result<()> {
    write_json(snapshot, dir, "particles.json")
}

/// Write the settings used for a run to `settings.toml`.
pub fn write_settings(settings: &Settings, dir: &Path) -> Result<()> {
    let text = toml::to_string_pretty(settings).context("failed to serialize settings")?;
    let mut writer = create(dir, "settings.toml")?;
    writer.write_all(text.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Write the power budget of a pass to `summary.json`.
pub fn write_summary(tree: &RayTree, snapshot: &WaveSnapshot, dir: &Path) -> Result<()> {
    let summary = Summary {
        timestamp: Local::now().to_rfc3339(),
        pass: tree.pass,
        rays: tree.len(),
        particles: snapshot.len(),
        powers: &tree.powers,
        missing: tree.powers.missing(),
    };
    write_json(&summary, dir, "summary.json")
}
