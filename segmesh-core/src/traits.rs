//! Core traits for segmesh

use crate::{mesh::*, point::*};

/// Trait for objects with a spatial extent
pub trait Bounded {
    /// Get the bounding box of the object
    fn bounding_box(&self) -> (Point3f, Point3f);

    /// Get the center point of the object
    fn center(&self) -> Point3f {
        let (min, max) = self.bounding_box();
        nalgebra::center(&min, &max)
    }
}

impl Bounded for TriangleMesh {
    fn bounding_box(&self) -> (Point3f, Point3f) {
        if self.vertices.is_empty() {
            return (Point3f::origin(), Point3f::origin());
        }

        let mut min = self.vertices[0];
        let mut max = self.vertices[0];

        for vertex in &self.vertices {
            min = min.inf(vertex);
            max = max.sup(vertex);
        }

        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_bounding_box() {
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(-1.0, 2.0, 0.5),
                Point3f::new(3.0, -4.0, 0.0),
                Point3f::new(0.0, 0.0, 6.0),
            ],
            vec![[0, 1, 2]],
        );

        let (min, max) = mesh.bounding_box();
        assert_eq!(min, Point3f::new(-1.0, -4.0, 0.0));
        assert_eq!(max, Point3f::new(3.0, 2.0, 6.0));
        assert_eq!(mesh.center(), Point3f::new(1.0, -1.0, 3.0));
    }

    #[test]
    fn test_empty_mesh_bounding_box() {
        let mesh = TriangleMesh::new();
        assert_eq!(mesh.bounding_box(), (Point3f::origin(), Point3f::origin()));
    }
}
