//! Core data structures and traits for segmesh
//!
//! This crate provides the fundamental types shared by the loader, the mesh
//! builder and the writers: volumes with their image geometry, triangle
//! meshes, and the common error type.

pub mod point;
pub mod mesh;
pub mod traits;
pub mod transform;
pub mod volume;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use traits::*;
pub use transform::*;
pub use volume::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
