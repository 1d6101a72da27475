//! Typed uniform model for the nebula program.

use std::fmt;
use std::str::FromStr;

use bytemuck::{Pod, Zeroable};

use crate::bluenoise::NoiseTexture;
use crate::error::EquirectError;

/// Which screen-to-direction mapping a pass is painted with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProjectionKind {
    /// Texture coordinates are longitude/latitude on the unit sphere.
    Equirectangular,
    /// Texture coordinates are an aspect-corrected plane in front of the origin.
    Cartesian,
}

impl ProjectionKind {
    /// Render order within a frame.
    pub const ALL: [ProjectionKind; 2] = [ProjectionKind::Equirectangular, ProjectionKind::Cartesian];

    pub fn name(self) -> &'static str {
        match self {
            ProjectionKind::Equirectangular => "equirectangular",
            ProjectionKind::Cartesian => "cartesian",
        }
    }

    pub fn is_equirected(self) -> bool {
        self == ProjectionKind::Equirectangular
    }

    pub fn toggle(self) -> Self {
        match self {
            ProjectionKind::Equirectangular => ProjectionKind::Cartesian,
            ProjectionKind::Cartesian => ProjectionKind::Equirectangular,
        }
    }
}

impl fmt::Display for ProjectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProjectionKind {
    type Err = EquirectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equirectangular" => Ok(ProjectionKind::Equirectangular),
            "cartesian" => Ok(ProjectionKind::Cartesian),
            other => Err(EquirectError::UnknownTexture(other.to_string())),
        }
    }
}

/// GPU layout of the nebula program's uniform block.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct EquirectUniform {
    pub resolution: [f32; 2],
    /// Seconds.
    pub time: f32,
    /// Non-zero selects the spherical mapping.
    pub equirected: u32,
}

/// Recognized uniform keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformName {
    Time,
    BlueNoise,
    Equirected,
    Resolution,
}

impl UniformName {
    pub fn parse(key: &str) -> Result<Self, EquirectError> {
        match key {
            "time" => Ok(UniformName::Time),
            "bluenoise" => Ok(UniformName::BlueNoise),
            "equirected" => Ok(UniformName::Equirected),
            "resolution" => Ok(UniformName::Resolution),
            other => Err(EquirectError::UnknownUniform(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UniformName::Time => "time",
            UniformName::BlueNoise => "bluenoise",
            UniformName::Equirected => "equirected",
            UniformName::Resolution => "resolution",
        }
    }
}

impl FromStr for UniformName {
    type Err = EquirectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A single uniform overwrite.
#[derive(Clone, Debug)]
pub enum UniformUpdate {
    /// Seconds.
    Time(f32),
    BlueNoise(NoiseTexture),
    Equirected(bool),
    Resolution(u32, u32),
}

impl UniformUpdate {
    pub fn name(&self) -> UniformName {
        match self {
            UniformUpdate::Time(_) => UniformName::Time,
            UniformUpdate::BlueNoise(_) => UniformName::BlueNoise,
            UniformUpdate::Equirected(_) => UniformName::Equirected,
            UniformUpdate::Resolution(..) => UniformName::Resolution,
        }
    }
}

/// CPU mirror of the scalar uniforms.
///
/// Each pass gets its own block built from this state with the pass's
/// projection forced, so nothing shared is mutated between passes. The
/// display block uses the stored `equirected` flag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformState {
    pub width: u32,
    pub height: u32,
    pub time: f32,
    pub equirected: bool,
}

impl UniformState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            time: 0.0,
            equirected: true,
        }
    }

    pub fn resolution(&self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }

    pub fn for_pass(&self, projection: ProjectionKind) -> EquirectUniform {
        EquirectUniform {
            resolution: self.resolution(),
            time: self.time,
            equirected: projection.is_equirected() as u32,
        }
    }

    pub fn display(&self) -> EquirectUniform {
        EquirectUniform {
            resolution: self.resolution(),
            time: self.time,
            equirected: self.equirected as u32,
        }
    }
}
