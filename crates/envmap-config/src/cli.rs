//! Command-line argument parsing for the demo binary.

use std::path::PathBuf;

use clap::Parser;

use crate::{Config, ProjectionSetting, Shape, SurfaceMode};

/// Envmap demo command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "envmap", about = "Raymarched nebula environment-map demo")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Environment target width (height follows at 2:1).
    #[arg(long)]
    pub target_width: Option<u32>,

    /// Object to display.
    #[arg(long, value_enum)]
    pub shape: Option<Shape>,

    /// Environment texture the object samples.
    #[arg(long, value_enum)]
    pub projection: Option<ProjectionSetting>,

    /// Reflective or refractive material.
    #[arg(long, value_enum)]
    pub surface: Option<SurfaceMode>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Render without a window and write both environment textures as PNG.
    #[arg(long)]
    pub headless: bool,

    /// Number of frames to simulate in headless mode.
    #[arg(long, default_value_t = 1)]
    pub frames: u32,

    /// Output directory for headless snapshots.
    #[arg(long, default_value = ".")]
    pub output: PathBuf,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(tw) = args.target_width {
            self.render.target_width = tw.max(2);
            self.render.target_height = self.render.target_width / 2;
        }
        if let Some(shape) = args.shape {
            self.scene.shape = shape;
        }
        if let Some(projection) = args.projection {
            self.scene.projection = projection;
        }
        if let Some(surface) = args.surface {
            self.scene.surface = surface;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            width: Some(1920),
            shape: Some(Shape::Plane),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.window.width, 1920);
        assert_eq!(config.scene.shape, Shape::Plane);
        // Non-overridden fields retain defaults
        assert_eq!(config.window.height, 720);
        assert_eq!(config.scene.projection, ProjectionSetting::Equirectangular);
    }

    #[test]
    fn test_target_width_keeps_two_to_one() {
        let mut config = Config::default();
        let args = CliArgs {
            target_width: Some(512),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.render.target_width, 512);
        assert_eq!(config.render.target_height, 256);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_parse_value_enums() {
        let args = CliArgs::parse_from([
            "envmap",
            "--shape",
            "torus-knot",
            "--projection",
            "cartesian",
            "--surface",
            "refract",
            "--headless",
            "--frames",
            "3",
        ]);
        assert_eq!(args.shape, Some(Shape::TorusKnot));
        assert_eq!(args.projection, Some(ProjectionSetting::Cartesian));
        assert_eq!(args.surface, Some(SurfaceMode::Refract));
        assert!(args.headless);
        assert_eq!(args.frames, 3);
    }
}
