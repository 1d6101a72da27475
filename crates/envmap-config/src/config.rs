//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const APP_NAME: &str = "envmap-nebula";

/// Top-level demo configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window settings.
    pub window: WindowConfig,
    /// Offscreen target and noise settings.
    pub render: RenderConfig,
    /// Which object is shown and how it picks up the environment.
    pub scene: SceneConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in logical pixels.
    pub width: u32,
    /// Window height in logical pixels.
    pub height: u32,
    /// Enable vsync (PresentMode::Fifo).
    pub vsync: bool,
    /// Window title.
    pub title: String,
}

/// Offscreen rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Width of both environment targets in pixels. A window keeps this size
    /// until it is resized, after which the targets follow the window width.
    pub target_width: u32,
    /// Height of both environment targets in pixels. Demos use a 2:1 aspect.
    pub target_height: u32,
    /// Edge length of the generated blue-noise tile.
    pub noise_size: u32,
    /// Seed for the generated blue-noise tile.
    pub noise_seed: u64,
    /// Optional PNG to use instead of the generated noise tile.
    pub noise_path: Option<PathBuf>,
    /// Clear color for the on-screen pass (linear RGBA).
    pub clear_color: [f32; 4],
}

/// Which environment texture the scene materials sample.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum ProjectionSetting {
    /// Spherical mapping, suitable for reflections.
    #[default]
    Equirectangular,
    /// Flat aspect-corrected mapping.
    Cartesian,
}

/// The object placed in the middle of the scene.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum Shape {
    #[default]
    Sphere,
    TorusKnot,
    Plane,
}

impl Shape {
    /// The next shape in display order, wrapping around.
    pub fn next(self) -> Self {
        match self {
            Shape::Sphere => Shape::TorusKnot,
            Shape::TorusKnot => Shape::Plane,
            Shape::Plane => Shape::Sphere,
        }
    }
}

/// How the environment is carried onto the object surface.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum SurfaceMode {
    #[default]
    Reflect,
    Refract,
}

/// Scene configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Object to display.
    pub shape: Shape,
    /// Environment texture bound by the object material and skybox.
    pub projection: ProjectionSetting,
    /// Reflective or refractive object material.
    pub surface: SurfaceMode,
    /// Index of refraction used when `surface` is `Refract`.
    pub refraction_index: f32,
    /// Draw the raw fullscreen quad over the scene.
    pub show_quad: bool,
    /// Camera orbit speed in radians per second.
    pub orbit_speed: f32,
    /// Camera distance from the origin.
    pub camera_distance: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            vsync: true,
            title: "Envmap Nebula".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            target_width: 1024,
            target_height: 512,
            noise_size: 64,
            noise_seed: 0,
            noise_path: None,
            clear_color: [1.0, 0.0, 0.0, 1.0],
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            shape: Shape::Sphere,
            projection: ProjectionSetting::Equirectangular,
            surface: SurfaceMode::Reflect,
            refraction_index: 1.33,
            show_quad: false,
            orbit_speed: 0.2,
            camera_distance: 5.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Platform configuration directory for the demos, if the OS exposes one.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join(APP_NAME))
}

/// File name inside the config directory.
pub const CONFIG_FILE: &str = "config.ron";

impl Config {
    /// Read `config.ron` from `config_dir`. A missing file is replaced by the
    /// defaults, which are written out so the user has something to edit.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if !path.exists() {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Wrote default config to {}", path.display());
            return Ok(config);
        }
        let config = read_config(&path)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write this config to `config_dir/config.ron`, creating the directory.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        let write_err = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_err)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .enumerate_arrays(false);
        let text = ron::ser::to_string_pretty(self, pretty)?;
        std::fs::write(&path, text).map_err(write_err)
    }

    /// Re-read the file. Returns `Some` only when its contents differ from
    /// `self`, so callers can skip re-applying an unchanged config.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = read_config(&config_dir.join(CONFIG_FILE))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("Config file changed");
        Ok(Some(fresh))
    }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("width: 1280"));
        assert!(ron_str.contains("target_width: 1024"));
        assert!(ron_str.contains("shape: Sphere"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.scene.shape = Shape::TorusKnot;
        config.render.noise_path = Some(PathBuf::from("noise/blue.png"));
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_default_targets_are_two_to_one() {
        let render = RenderConfig::default();
        assert_eq!(render.target_width, render.target_height * 2);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(window: (), render: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.scene, SceneConfig::default());
        assert_eq!(config.debug, DebugConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_shape_cycle_visits_every_shape() {
        let mut shape = Shape::Sphere;
        let mut seen = vec![shape];
        for _ in 0..2 {
            shape = shape.next();
            seen.push(shape);
        }
        assert_eq!(seen, vec![Shape::Sphere, Shape::TorusKnot, Shape::Plane]);
        assert_eq!(shape.next(), Shape::Sphere);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.window.width = 1920;
        config.scene.projection = ProjectionSetting::Cartesian;
        config.scene.surface = SurfaceMode::Refract;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.render.target_width = 2048;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.map(|c| c.render.target_width), Some(2048));
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{{not valid}}").unwrap();
        let err = Config::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE));
    }

    #[test]
    fn test_reload_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::default().reload(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
