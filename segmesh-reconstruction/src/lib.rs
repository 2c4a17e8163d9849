//! # segmesh reconstruction
//!
//! Isosurface extraction for segmentation volumes.
//!
//! [`marching_cubes`] triangulates a sample array in array coordinates;
//! [`surface`] places that triangulation in the volume's physical space with
//! consistent outward winding and vertex normals.

pub mod marching_cubes;
pub mod surface;

// Re-export commonly used items
pub use marching_cubes::*;
pub use surface::*;
