//! Procedural geometry for environment-mapped scene objects.

pub mod mesh_data;
pub mod plane;
pub mod sphere;
pub mod torus_knot;

pub use mesh_data::MeshData;
pub use plane::{PlaneParams, plane};
pub use sphere::{SphereParams, uv_sphere};
pub use torus_knot::{TorusKnotParams, torus_knot};
