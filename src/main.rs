use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use prisma::logger::{init_logger, level_from_verbosity};
use prisma::output;
use prisma::settings::{self, CliArgs};
use prisma::simulation::Simulation;
use prisma::wave::WaveSnapshot;

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logger(level_from_verbosity(args.verbose));

    let settings = settings::load_config_with(&args)?;
    let start = Instant::now();

    let mut simulation = Simulation::new(
        settings.build_scene()?,
        settings.build_laser(),
        settings.propagator(),
        settings.wave,
        settings.view(),
    );
    let tree = simulation.tree();
    println!("{}", tree.powers);

    let mut snapshot = Arc::new(WaveSnapshot::default());
    if simulation.laser().wave && settings.run.ticks > 0 {
        let pb = ProgressBar::new(settings.run.ticks as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] {bar:40.green/blue} {pos:>5}/{len:5} {msg} ETA: {eta_precise}",
            )?
            .progress_chars("█▇▆▅▄▃▂▁"),
        );
        pb.set_message("tick".to_string());

        for _ in 0..settings.run.ticks {
            snapshot = simulation.step(settings.run.dt);
            pb.inc(1);
        }
        pb.finish_and_clear();
        println!("{} wave particles after {} ticks", snapshot.len(), settings.run.ticks);
    }

    info!("Time taken: {:.2?}", start.elapsed());

    let dir = &settings.directory;
    output::write_tree(&tree, dir)?;
    output::write_particles(&snapshot, dir)?;
    output::write_settings(&settings, dir)?;
    output::write_summary(&tree, &snapshot, dir)?;

    Ok(())
}
