//! Physical-space surface meshes from volumes

use crate::marching_cubes::{MarchingCubes, MarchingCubesConfig};
use nalgebra::Matrix3;
use segmesh_core::{Bounded, ImageGeometry, Point3d, Result, TriangleMesh, Volume};

/// Permutation taking array coordinates `(a0, a1, a2)` to index `(i, j, k)`
fn array_to_index() -> Matrix3<f64> {
    Matrix3::new(
        0.0, 0.0, 1.0,
        0.0, 1.0, 0.0,
        1.0, 0.0, 0.0,
    )
}

/// Whether mapping array coordinates to physical space mirrors the surface.
///
/// The axis reorder alone is a reflection, so an identity geometry does
/// mirror; a geometry with a left-handed direction matrix undoes it.
pub fn reverses_orientation(geometry: &ImageGeometry) -> bool {
    (geometry.linear() * array_to_index()).determinant() < 0.0
}

/// Extract the isosurface of a volume in physical coordinates.
///
/// Vertices are placed by the volume's geometry, triangles face from samples
/// at or above the level toward samples below it, and vertex normals are
/// computed afterwards when the configuration asks for them.
pub fn build_mesh(volume: &Volume, config: &MarchingCubesConfig) -> Result<TriangleMesh> {
    // Normals are only meaningful once the vertices are in physical space
    let extractor = MarchingCubes::new(MarchingCubesConfig {
        compute_normals: false,
        ..*config
    });
    let mut mesh = extractor.extract_isosurface(volume.samples())?;

    let geometry = volume.geometry();
    for vertex in &mut mesh.vertices {
        let index = Point3d::new(f64::from(vertex.z), f64::from(vertex.y), f64::from(vertex.x));
        *vertex = geometry.index_to_physical(&index).cast::<f32>();
    }

    if reverses_orientation(geometry) {
        mesh.flip_winding();
    }

    if config.compute_normals {
        mesh.compute_vertex_normals();
    }

    log::info!(
        "Isosurface at level {}: {} vertices, {} faces",
        config.iso_level,
        mesh.vertex_count(),
        mesh.face_count()
    );
    let (min, max) = mesh.bounding_box();
    log::debug!("Mesh bounds {:?} to {:?}", min.coords.as_slice(), max.coords.as_slice());

    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use segmesh_core::Vector3d;

    fn geometry(direction: Matrix3<f64>) -> ImageGeometry {
        ImageGeometry::new(Point3d::origin(), Vector3d::new(1.0, 1.0, 1.0), direction).unwrap()
    }

    #[test]
    fn test_array_to_index_is_a_reflection() {
        assert_eq!(array_to_index().determinant(), -1.0);
    }

    #[test]
    fn test_reverses_orientation() {
        assert!(reverses_orientation(&ImageGeometry::identity()));

        let mirrored = geometry(Matrix3::from_diagonal(&Vector3d::new(-1.0, 1.0, 1.0)));
        assert!(!reverses_orientation(&mirrored));

        let rotated = geometry(Matrix3::new(
            0.0, -1.0, 0.0,
            1.0, 0.0, 0.0,
            0.0, 0.0, 1.0,
        ));
        assert!(reverses_orientation(&rotated));
    }

    #[test]
    fn test_axes_are_reordered() {
        // A single bright sample at array position (1, 1, 2), i.e. index (2, 1, 1)
        let volume = Volume::from_shape_fn([3, 3, 4], ImageGeometry::identity(), |k, j, i| {
            if (k, j, i) == (1, 1, 2) {
                1.0
            } else {
                0.0
            }
        })
        .unwrap();

        let mesh = build_mesh(&volume, &MarchingCubesConfig::default()).unwrap();
        let max_x = mesh.vertices.iter().map(|v| v.x).fold(f32::MIN, f32::max);
        let max_z = mesh.vertices.iter().map(|v| v.z).fold(f32::MIN, f32::max);

        assert_eq!(max_x, 2.5);
        assert_eq!(max_z, 1.5);
    }
}
