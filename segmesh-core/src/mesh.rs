//! Mesh data structures and functionality

use crate::point::*;
use serde::{Deserialize, Serialize};

/// A triangle mesh with vertices, faces and optional per-vertex normals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Unit normal of a single face, following its winding.
    ///
    /// Degenerate (zero-area) faces yield a zero vector.
    pub fn face_normal(&self, face: &[usize; 3]) -> Vector3f {
        let v0 = self.vertices[face[0]];
        let v1 = self.vertices[face[1]];
        let v2 = self.vertices[face[2]];

        (v1 - v0)
            .cross(&(v2 - v0))
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3f::zeros)
    }

    /// Calculate face normals
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        self.faces.iter().map(|face| self.face_normal(face)).collect()
    }

    /// Compute per-vertex normals from face geometry and store them.
    ///
    /// Each vertex normal is the normalized sum of the unit normals of the faces
    /// that reference it. Vertices whose sum vanishes (unreferenced, or sitting
    /// between opposing faces) get a zero normal.
    pub fn compute_vertex_normals(&mut self) {
        let mut accumulated = vec![Vector3f::zeros(); self.vertices.len()];

        for (face, normal) in self.faces.iter().zip(self.calculate_face_normals()) {
            for &index in face {
                accumulated[index] += normal;
            }
        }

        let normals = accumulated
            .into_iter()
            .map(|n| n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::zeros))
            .collect();

        self.normals = Some(normals);
    }

    /// Reverse the winding of every face.
    ///
    /// Stored vertex normals are negated so they stay consistent with the faces.
    pub fn flip_winding(&mut self) {
        for face in &mut self.faces {
            face.swap(1, 2);
        }
        if let Some(normals) = &mut self.normals {
            for normal in normals.iter_mut() {
                *normal = -*normal;
            }
        }
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Check that every face references an existing vertex
    pub fn has_valid_indices(&self) -> bool {
        let count = self.vertices.len();
        self.faces.iter().flatten().all(|&index| index < count)
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_triangle() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_face_normal_follows_winding() {
        let mesh = unit_triangle();
        assert_relative_eq!(mesh.face_normal(&[0, 1, 2]), Vector3f::new(0.0, 0.0, 1.0));
        assert_relative_eq!(mesh.face_normal(&[0, 2, 1]), Vector3f::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_degenerate_face_normal_is_zero() {
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 1.0),
                Point3f::new(2.0, 2.0, 2.0),
            ],
            vec![[0, 1, 2]],
        );
        assert_eq!(mesh.face_normal(&[0, 1, 2]), Vector3f::zeros());
    }

    #[test]
    fn test_vertex_normals_average_adjacent_faces() {
        // Two faces meeting at a right angle along the x axis
        let mut mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(0.0, 0.0, 1.0),
            ],
            vec![[0, 1, 2], [0, 1, 3]],
        );
        mesh.compute_vertex_normals();

        let normals = mesh.normals.as_ref().unwrap();
        assert_eq!(normals.len(), 4);

        let shared = Vector3f::new(0.0, -1.0, 1.0).normalize();
        assert_relative_eq!(normals[0], shared, epsilon = 1e-6);
        assert_relative_eq!(normals[1], shared, epsilon = 1e-6);
        assert_relative_eq!(normals[2], Vector3f::new(0.0, 0.0, 1.0), epsilon = 1e-6);
        assert_relative_eq!(normals[3], Vector3f::new(0.0, -1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_unreferenced_vertex_gets_zero_normal() {
        let mut mesh = unit_triangle();
        mesh.vertices.push(Point3f::new(5.0, 5.0, 5.0));
        mesh.compute_vertex_normals();

        assert_eq!(mesh.normals.as_ref().unwrap()[3], Vector3f::zeros());
    }

    #[test]
    fn test_flip_winding() {
        let mut mesh = unit_triangle();
        mesh.compute_vertex_normals();
        mesh.flip_winding();

        assert_eq!(mesh.faces[0], [0, 2, 1]);
        assert_relative_eq!(mesh.normals.as_ref().unwrap()[0], Vector3f::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_set_normals_rejects_wrong_length() {
        let mut mesh = unit_triangle();
        mesh.set_normals(vec![Vector3f::z()]);
        assert!(mesh.normals.is_none());
    }

    #[test]
    fn test_index_validation() {
        let mut mesh = unit_triangle();
        assert!(mesh.has_valid_indices());
        mesh.faces.push([0, 1, 3]);
        assert!(!mesh.has_valid_indices());
    }
}
