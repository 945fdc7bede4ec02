use std::{path::PathBuf, time::Instant};

use clap::Parser;
use kurbo::Point;

use lightsweep::{
    generators, Color, ConeLight, CycleReport, LayerConfig, LightLayer, OccluderGroup,
    RadialLight, Recording, Scene, SunLight,
};

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
enum Scenery {
    Grid,
    Slanted,
    Stairs,
}

/// Runs the light pipeline against a recording canvas and reports timings.
#[derive(Parser)]
struct Cli {
    /// Layer settings, as JSON. Defaults are used for anything left out.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "grid")]
    scenery: Scenery,

    #[arg(long, default_value_t = 60)]
    frames: u32,

    #[arg(long, default_value_t = 16)]
    lights: u32,

    /// Add sunlight on top of the point lights.
    #[arg(long)]
    sun: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Cli::parse();

    let config: LayerConfig = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => LayerConfig::default(),
    };
    let (w, h) = (f64::from(config.width), f64::from(config.height));

    let scene = Scene::new();
    {
        let lines = match args.scenery {
            Scenery::Grid => generators::box_grid(Point::new(20.0, 20.0), 8, 30.0, w / 8.0),
            Scenery::Slanted => generators::slanted_grid(Point::new(20.0, 20.0), 8, 30.0, w / 8.0),
            Scenery::Stairs => generators::staircase(w, h, 24),
        };
        let mut occluders = scene.write();
        for line in lines {
            occluders.insert_line(line)?;
        }
    }
    // A bar turning in one of the gaps between boxes.
    let mut spinner = match args.scenery {
        Scenery::Stairs => None,
        Scenery::Grid | Scenery::Slanted => Some(OccluderGroup::new_box(
            scene.clone(),
            Point::new(w / 16.0 + 5.0, w / 16.0 + 30.0),
            60.0,
            10.0,
        )?),
    };

    let mut canvas = Recording::new().with_asset(&config.mask_asset, 256, 256);
    let frame = canvas.create_surface(config.width, config.height);
    let mut layer = LightLayer::new(config.clone(), scene, &mut canvas)?;

    let mut handles = Vec::new();
    for i in 0..args.lights {
        let t = f64::from(i) / f64::from(args.lights.max(1));
        let pos = Point::new(w * t, h * (0.25 + 0.5 * (t * 7.0).fract()));
        let handle = if i % 4 == 3 {
            layer.add_light(ConeLight::new(200.0, 1.2, Color::rgb(255, 255, 200))?)
        } else {
            layer.add_light(RadialLight::new(150.0, Color::rgb(255, 210, 160))?)
        };
        handle.set_position(pos);
        handles.push(handle);
    }
    if args.sun {
        layer.add_light(SunLight::for_layer(&config, 4.0, Color::rgb(60, 60, 90))?);
    }

    let start = Instant::now();
    let mut total = CycleReport::default();
    for n in 0..args.frames {
        if let Some(spinner) = &mut spinner {
            spinner.rotate_by_degrees(3.0);
        }
        for handle in handles.iter().filter(|_| n % 2 == 0) {
            handle.rotate_by_degrees(5.0);
        }

        layer.detach();
        layer.draw(&mut canvas, frame);
        let commands = canvas.take_commands();

        let reports = layer.cycle_stats();
        for r in &reports {
            total.lights += r.lights;
            total.stats += r.stats;
            total.run_time += r.run_time;
        }
        log::info!(
            "frame {n}: {} draw calls, slowest worker {:?}",
            commands.len(),
            reports.iter().map(|r| r.run_time).max().unwrap_or_default()
        );
    }

    println!(
        "{} frames in {:?}; totals: {}",
        args.frames,
        start.elapsed(),
        serde_json::to_string_pretty(&total)?
    );
    Ok(())
}
