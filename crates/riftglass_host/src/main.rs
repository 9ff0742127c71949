mod backend;
mod config;
mod gpu;
mod physics;
mod placement;
mod runner;

use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use backend::{IndicatorBoard, RecordingTargets};
use config::SceneConfig;

const USAGE: &str = "Usage: riftglass_host [--scene <path>] [--frames <n>] [--gpu]";

fn main() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    let mut scene_path = PathBuf::from("scenes/demo.toml");
    let mut max_frames: Option<u64> = None;
    let mut use_gpu = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--scene" => {
                let Some(value) = args.next() else {
                    eprintln!("--scene expects a path argument");
                    std::process::exit(2);
                };
                scene_path = PathBuf::from(value);
            }
            "--frames" => {
                let Some(value) = args.next() else {
                    eprintln!("--frames expects a numeric argument");
                    std::process::exit(2);
                };
                match value.parse::<u64>() {
                    Ok(parsed) => max_frames = Some(parsed),
                    Err(err) => {
                        eprintln!("invalid frame count '{value}': {err}");
                        std::process::exit(2);
                    }
                }
            }
            "--gpu" => use_gpu = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                return;
            }
            other => {
                eprintln!("unknown argument: {other}");
                std::process::exit(2);
            }
        }
    }

    let config = match SceneConfig::load(&scene_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load scene {}: {err}", scene_path.display());
            std::process::exit(1);
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        eprintln!("\nShutdown signal received, stopping run...");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl+C handler: {err}");
    }

    let mut indicators = IndicatorBoard::new();
    let result = if use_gpu {
        match gpu::GpuTargets::new() {
            Ok(mut targets) => {
                let result = runner::run(&config, max_frames, &mut targets, &mut indicators, &running);
                info!("GPU targets rendered {} frames", targets.total_frames_rendered());
                result
            }
            Err(err) => {
                warn!("{err}, falling back to recording targets");
                run_recording(&config, max_frames, &mut indicators, &running)
            }
        }
    } else {
        run_recording(&config, max_frames, &mut indicators, &running)
    };

    match result {
        Ok(summary) => {
            println!(
                "{} frames, {} portals, {} entries, {} exits, inside: {}",
                summary.frames,
                summary.portals,
                summary.entered,
                summary.exited,
                summary.occupied_portal.as_deref().unwrap_or("none")
            );
        }
        Err(err) => {
            eprintln!("run failed: {err}");
            std::process::exit(1);
        }
    }
}

fn run_recording(
    config: &SceneConfig,
    max_frames: Option<u64>,
    indicators: &mut IndicatorBoard,
    running: &AtomicBool,
) -> Result<runner::RunSummary, runner::RunError> {
    let mut targets = RecordingTargets::new();
    let result = runner::run(config, max_frames, &mut targets, indicators, running);
    info!(
        "Recorded {} portal frames ({} oblique), released {} targets",
        targets.total_frames_rendered(),
        targets.total_oblique_frames(),
        targets.released_targets()
    );
    result
}
