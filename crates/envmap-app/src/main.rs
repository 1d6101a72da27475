//! Nebula environment-map demo.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `--headless --frames 60 --output out` to write the two environment
//! textures as PNG instead of opening a window.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use envmap_app::{run, run_headless};
use envmap_config::{CliArgs, Config, default_config_dir};
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args
        .config
        .clone()
        .or_else(default_config_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    let (mut config, load_error) = match Config::load_or_create(&config_dir) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    config.apply_cli_overrides(&args);

    envmap_log::init_logging(
        Some(&config_dir.join("logs")),
        cfg!(debug_assertions),
        Some(&config),
    );
    if let Some(e) = load_error {
        warn!("Failed to load config, using defaults: {e}");
    }
    info!("Config directory: {}", config_dir.display());

    let result = if args.headless {
        run_headless(&config, args.frames, &args.output).map(|report| {
            info!(
                "Wrote {} and {}",
                report.equirectangular.display(),
                report.cartesian.display()
            );
        })
    } else {
        run(config, Some(config_dir))
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
