//! Windowed and headless drivers for the nebula environment-map demo.

pub mod error;
pub mod frame_clock;
pub mod headless;
pub mod scene;
pub mod window;

pub use error::AppError;
pub use frame_clock::{FIXED_DT, FrameClock, FrameTick, MAX_FRAME_TIME};
pub use headless::{SnapshotReport, render_snapshots, run_headless};
pub use scene::SceneContext;
pub use window::{
    AppState, KeyAction, SurfaceRecovery, key_action, run, window_attributes_from_config,
};
