//! STL format support
//!
//! Binary STL is an 80-byte header, a little-endian `u32` triangle count and
//! 50 bytes per triangle (normal, three vertices, `u16` attribute). ASCII STL
//! is the `solid`/`facet`/`endsolid` text form.
//!
//! STL stores a triangle soup. The reader welds vertices with bit-identical
//! positions back together so the result is an indexed mesh again.

use crate::{Encoding, MeshReader, MeshWriter, WriteOptions};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use segmesh_core::{Error, Point3f, Result, TriangleMesh};
use std::collections::HashMap;
use std::io::{Read, Write};

pub struct StlReader;
pub struct StlWriter;

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;
const DEFAULT_NAME: &str = "segmesh";

impl MeshWriter for StlWriter {
    fn write_mesh_to<W: Write>(mesh: &TriangleMesh, mut writer: W, options: &WriteOptions) -> Result<()> {
        let name = options.comment.as_deref().unwrap_or(DEFAULT_NAME);
        match options.encoding {
            Encoding::Binary => write_binary(mesh, &mut writer, name),
            Encoding::Ascii => write_ascii(mesh, &mut writer, name),
        }
    }
}

fn write_binary<W: Write>(mesh: &TriangleMesh, writer: &mut W, name: &str) -> Result<()> {
    let count = u32::try_from(mesh.faces.len()).map_err(|_| {
        Error::InvalidData(format!("{} triangles exceed the binary STL limit", mesh.faces.len()))
    })?;

    let mut header = [0u8; HEADER_LEN];
    // A binary header must not look like an ASCII file
    let name = name.trim_start_matches("solid").as_bytes();
    let len = name.len().min(HEADER_LEN);
    header[..len].copy_from_slice(&name[..len]);
    writer.write_all(&header)?;
    writer.write_u32::<LittleEndian>(count)?;

    for face in &mesh.faces {
        let normal = mesh.face_normal(face);
        write_vector(writer, normal.x, normal.y, normal.z)?;
        for &v in face {
            let p = &mesh.vertices[v];
            write_vector(writer, p.x, p.y, p.z)?;
        }
        writer.write_u16::<LittleEndian>(0)?;
    }

    Ok(())
}

fn write_vector<W: Write>(writer: &mut W, x: f32, y: f32, z: f32) -> Result<()> {
    writer.write_f32::<LittleEndian>(x)?;
    writer.write_f32::<LittleEndian>(y)?;
    writer.write_f32::<LittleEndian>(z)?;
    Ok(())
}

fn write_ascii<W: Write>(mesh: &TriangleMesh, writer: &mut W, name: &str) -> Result<()> {
    let name = name.lines().next().unwrap_or(DEFAULT_NAME);

    writeln!(writer, "solid {}", name)?;
    for face in &mesh.faces {
        let n = mesh.face_normal(face);
        writeln!(writer, "  facet normal {:e} {:e} {:e}", n.x, n.y, n.z)?;
        writeln!(writer, "    outer loop")?;
        for &v in face {
            let p = &mesh.vertices[v];
            writeln!(writer, "      vertex {:e} {:e} {:e}", p.x, p.y, p.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }
    writeln!(writer, "endsolid {}", name)?;

    Ok(())
}

impl MeshReader for StlReader {
    fn read_mesh_from<R: Read>(mut reader: R) -> Result<TriangleMesh> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let triangles = if is_ascii(&bytes) {
            parse_ascii(&bytes)?
        } else {
            parse_binary(&bytes)?
        };

        Ok(weld(&triangles))
    }
}

/// ASCII files start with `solid` and contain facets; some binary exporters
/// also start their header with `solid`, so the size check has the last word.
fn is_ascii(bytes: &[u8]) -> bool {
    if !bytes.starts_with(b"solid") {
        return false;
    }
    if bytes.len() >= HEADER_LEN + 4 {
        let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
        if bytes.len() == HEADER_LEN + 4 + count * TRIANGLE_LEN {
            return false;
        }
    }
    true
}

fn parse_binary(bytes: &[u8]) -> Result<Vec<[Point3f; 3]>> {
    if bytes.len() < HEADER_LEN + 4 {
        return Err(Error::InvalidData("Binary STL shorter than its header".to_string()));
    }

    let mut cursor = &bytes[HEADER_LEN..];
    let count = cursor.read_u32::<LittleEndian>()? as usize;
    if cursor.len() < count * TRIANGLE_LEN {
        return Err(Error::InvalidData(format!(
            "Binary STL declares {} triangles but holds {} bytes of facet data",
            count,
            cursor.len()
        )));
    }

    let mut triangles = Vec::with_capacity(count);
    for _ in 0..count {
        // Stored normals are recomputed from the winding
        read_point(&mut cursor)?;
        let triangle = [
            read_point(&mut cursor)?,
            read_point(&mut cursor)?,
            read_point(&mut cursor)?,
        ];
        cursor.read_u16::<LittleEndian>()?;
        triangles.push(triangle);
    }

    Ok(triangles)
}

fn read_point(cursor: &mut &[u8]) -> Result<Point3f> {
    let x = cursor.read_f32::<LittleEndian>()?;
    let y = cursor.read_f32::<LittleEndian>()?;
    let z = cursor.read_f32::<LittleEndian>()?;
    Ok(Point3f::new(x, y, z))
}

fn parse_ascii(bytes: &[u8]) -> Result<Vec<[Point3f; 3]>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::InvalidData(format!("ASCII STL is not valid UTF-8: {}", e)))?;

    let mut triangles = Vec::new();
    let mut corners: Vec<Point3f> = Vec::with_capacity(3);

    for (line_number, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("vertex") => {
                let coords = tokens
                    .map(str::parse::<f32>)
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| {
                        Error::InvalidData(format!("Line {}: bad vertex: {}", line_number + 1, e))
                    })?;
                if coords.len() != 3 {
                    return Err(Error::InvalidData(format!(
                        "Line {}: vertex needs 3 coordinates",
                        line_number + 1
                    )));
                }
                corners.push(Point3f::new(coords[0], coords[1], coords[2]));
            }
            Some("endloop") => {
                if corners.len() != 3 {
                    return Err(Error::InvalidData(format!(
                        "Line {}: facet has {} vertices, expected 3",
                        line_number + 1,
                        corners.len()
                    )));
                }
                triangles.push([corners[0], corners[1], corners[2]]);
                corners.clear();
            }
            _ => {}
        }
    }

    Ok(triangles)
}

/// Merge corners with identical coordinates into shared vertices
fn weld(triangles: &[[Point3f; 3]]) -> TriangleMesh {
    let mut lookup: HashMap<[u32; 3], usize> = HashMap::new();
    let mut vertices = Vec::new();
    let mut faces = Vec::with_capacity(triangles.len());

    for triangle in triangles {
        let mut face = [0usize; 3];
        for (slot, p) in face.iter_mut().zip(triangle) {
            // +0.0 and -0.0 are the same position
            let key = [p.x + 0.0, p.y + 0.0, p.z + 0.0].map(f32::to_bits);
            *slot = *lookup.entry(key).or_insert_with(|| {
                vertices.push(*p);
                vertices.len() - 1
            });
        }
        faces.push(face);
    }

    let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
    mesh.compute_vertex_normals();
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tetrahedron() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(0.0, 0.0, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        )
    }

    fn write_to_vec(mesh: &TriangleMesh, options: &WriteOptions) -> Vec<u8> {
        let mut buffer = Vec::new();
        StlWriter::write_mesh_to(mesh, &mut buffer, options).unwrap();
        buffer
    }

    #[test]
    fn test_binary_layout() {
        let bytes = write_to_vec(&tetrahedron(), &WriteOptions::binary());

        assert_eq!(bytes.len(), 84 + 4 * 50);
        assert!(!bytes.starts_with(b"solid"));
        assert_eq!(u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]), 4);

        // First facet normal: face [0, 2, 1] lies in z = 0 and faces -z
        let mut cursor = &bytes[84..];
        let normal = read_point(&mut cursor).unwrap();
        assert_relative_eq!(normal, Point3f::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_binary_header_never_starts_with_solid() {
        let options = WriteOptions::binary().with_comment("solid brain");
        let bytes = write_to_vec(&tetrahedron(), &options);

        assert!(!bytes.starts_with(b"solid"));
        assert!(bytes.starts_with(b" brain"));
    }

    #[test]
    fn test_ascii_layout() {
        let options = WriteOptions::ascii().with_comment("lesion");
        let text = String::from_utf8(write_to_vec(&tetrahedron(), &options)).unwrap();

        assert!(text.starts_with("solid lesion\n"));
        assert!(text.trim_end().ends_with("endsolid lesion"));
        assert_eq!(text.matches("facet normal").count(), 4);
        assert_eq!(text.matches("vertex ").count(), 12);
    }

    #[test]
    fn test_round_trip_welds_vertices() {
        let mesh = tetrahedron();

        for options in [WriteOptions::binary(), WriteOptions::ascii()] {
            let bytes = write_to_vec(&mesh, &options);
            let loaded = StlReader::read_mesh_from(bytes.as_slice()).unwrap();

            assert_eq!(loaded.vertex_count(), 4);
            assert_eq!(loaded.face_count(), 4);
            assert!(loaded.has_valid_indices());
            assert!(loaded.normals.is_some());

            for (a, b) in loaded.faces.iter().zip(&mesh.faces) {
                for c in 0..3 {
                    assert_relative_eq!(loaded.vertices[a[c]], mesh.vertices[b[c]]);
                }
            }
        }
    }

    #[test]
    fn test_binary_with_solid_header_is_detected() {
        let mut bytes = write_to_vec(&tetrahedron(), &WriteOptions::binary());
        bytes[..5].copy_from_slice(b"solid");

        let loaded = StlReader::read_mesh_from(bytes.as_slice()).unwrap();
        assert_eq!(loaded.face_count(), 4);
    }

    #[test]
    fn test_truncated_binary_is_rejected() {
        let bytes = write_to_vec(&tetrahedron(), &WriteOptions::binary());
        let result = StlReader::read_mesh_from(&bytes[..bytes.len() - 10]);
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_malformed_ascii_is_rejected() {
        let text = "solid x\nfacet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nendloop\nendfacet\nendsolid x\n";
        let result = StlReader::read_mesh_from(text.as_bytes());
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_empty_mesh() {
        let bytes = write_to_vec(&TriangleMesh::new(), &WriteOptions::binary());
        assert_eq!(bytes.len(), 84);

        let loaded = StlReader::read_mesh_from(bytes.as_slice()).unwrap();
        assert!(loaded.is_empty());
    }
}
