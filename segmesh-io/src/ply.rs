//! PLY format support

use crate::{Encoding, MeshReader, MeshWriter, WriteOptions};
use byteorder::{LittleEndian, WriteBytesExt};
use ply_rs::{
    parser::Parser,
    ply::{
        Addable, DefaultElement, ElementDef, Encoding as PlyEncoding, Ply, Property, PropertyDef,
        PropertyType, ScalarType,
    },
    writer::Writer,
};
use segmesh_core::{Error, Point3f, Result, TriangleMesh, Vector3f};
use std::io::{BufReader, Read, Write};

pub struct PlyReader;
pub struct PlyWriter;

impl MeshReader for PlyReader {
    fn read_mesh_from<R: Read>(reader: R) -> Result<TriangleMesh> {
        let mut reader = BufReader::new(reader);

        let parser = Parser::<DefaultElement>::new();
        let ply = parser.read_ply(&mut reader)?;

        // Extract vertices
        let mut vertices = Vec::new();
        if let Some(vertex_element) = ply.payload.get("vertex") {
            for vertex in vertex_element {
                let x = extract_property_value(vertex, "x")?;
                let y = extract_property_value(vertex, "y")?;
                let z = extract_property_value(vertex, "z")?;

                vertices.push(Point3f::new(x, y, z));
            }
        }

        // Extract faces, fan-triangulating polygons
        let mut faces = Vec::new();
        if let Some(face_element) = ply.payload.get("face") {
            for face in face_element {
                let indices = extract_face_indices(face)?;
                for i in 1..indices.len().saturating_sub(1) {
                    faces.push([indices[0], indices[i], indices[i + 1]]);
                }
            }
        }

        // Extract normals if every vertex carries them
        let normals = ply.payload.get("vertex").and_then(|vertex_element| {
            vertex_element
                .iter()
                .map(|vertex| {
                    Some(Vector3f::new(
                        extract_property_value(vertex, "nx").ok()?,
                        extract_property_value(vertex, "ny").ok()?,
                        extract_property_value(vertex, "nz").ok()?,
                    ))
                })
                .collect::<Option<Vec<_>>>()
                .filter(|normals| !normals.is_empty())
        });

        let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        if !mesh.has_valid_indices() {
            return Err(Error::InvalidData(
                "PLY face references a vertex that does not exist".to_string(),
            ));
        }
        if let Some(normals) = normals {
            mesh.set_normals(normals);
        }

        Ok(mesh)
    }
}

impl MeshWriter for PlyWriter {
    fn write_mesh_to<W: Write>(mesh: &TriangleMesh, mut writer: W, options: &WriteOptions) -> Result<()> {
        let mut ply = Ply::<DefaultElement>::new();
        ply.header.encoding = match options.encoding {
            Encoding::Binary => PlyEncoding::BinaryLittleEndian,
            Encoding::Ascii => PlyEncoding::Ascii,
        };
        if let Some(comment) = &options.comment {
            ply.header.comments.push(comment.clone());
        }

        let normals = mesh
            .normals
            .as_deref()
            .filter(|normals| normals.len() == mesh.vertices.len());

        // Define vertex element
        let mut vertex_element = ElementDef::new("vertex".to_string());
        vertex_element.count = mesh.vertices.len();
        let mut names = vec!["x", "y", "z"];
        if normals.is_some() {
            names.extend(["nx", "ny", "nz"]);
        }
        for name in names {
            vertex_element.properties.add(PropertyDef::new(
                name.to_string(),
                PropertyType::Scalar(ScalarType::Float),
            ));
        }
        ply.header.elements.add(vertex_element);

        // Define face element
        let mut face_element = ElementDef::new("face".to_string());
        face_element.count = mesh.faces.len();
        face_element.properties.add(PropertyDef::new(
            "vertex_indices".to_string(),
            PropertyType::List(ScalarType::UChar, ScalarType::Int),
        ));
        ply.header.elements.add(face_element);

        let faces = face_indices(mesh)?;
        let writer_instance = Writer::<DefaultElement>::new();

        match options.encoding {
            Encoding::Ascii => {
                ply.payload.insert("vertex".to_string(), vertex_payload(mesh, normals));
                ply.payload.insert("face".to_string(), face_payload(&faces));
                writer_instance.write_ply(&mut writer, &mut ply)?;
            }
            Encoding::Binary => {
                // ply-rs prefixes binary lists with the element count, so only
                // the header goes through it
                writer_instance.write_header(&mut writer, &ply.header)?;
                write_binary_body(&mut writer, mesh, normals, &faces)?;
            }
        }

        writer.flush()?;
        Ok(())
    }
}

/// Face indices as PLY `int`s
fn face_indices(mesh: &TriangleMesh) -> Result<Vec<[i32; 3]>> {
    let to_int = |index: usize| {
        i32::try_from(index).map_err(|_| {
            Error::InvalidData(format!("Vertex index {} does not fit in a PLY int", index))
        })
    };

    mesh.faces
        .iter()
        .map(|face| Ok([to_int(face[0])?, to_int(face[1])?, to_int(face[2])?]))
        .collect()
}

fn vertex_payload(mesh: &TriangleMesh, normals: Option<&[Vector3f]>) -> Vec<DefaultElement> {
    let mut vertices = Vec::with_capacity(mesh.vertices.len());
    for (i, vertex) in mesh.vertices.iter().enumerate() {
        let mut element = DefaultElement::new();
        element.insert("x".to_string(), Property::Float(vertex.x));
        element.insert("y".to_string(), Property::Float(vertex.y));
        element.insert("z".to_string(), Property::Float(vertex.z));

        if let Some(normals) = normals {
            element.insert("nx".to_string(), Property::Float(normals[i].x));
            element.insert("ny".to_string(), Property::Float(normals[i].y));
            element.insert("nz".to_string(), Property::Float(normals[i].z));
        }

        vertices.push(element);
    }
    vertices
}

fn face_payload(faces: &[[i32; 3]]) -> Vec<DefaultElement> {
    faces
        .iter()
        .map(|face| {
            let mut element = DefaultElement::new();
            element.insert("vertex_indices".to_string(), Property::ListInt(face.to_vec()));
            element
        })
        .collect()
}

/// Little-endian body matching the header: vertex records, then
/// `uchar 3` followed by three `int` indices per face
fn write_binary_body<W: Write>(
    writer: &mut W,
    mesh: &TriangleMesh,
    normals: Option<&[Vector3f]>,
    faces: &[[i32; 3]],
) -> std::io::Result<()> {
    for (i, vertex) in mesh.vertices.iter().enumerate() {
        writer.write_f32::<LittleEndian>(vertex.x)?;
        writer.write_f32::<LittleEndian>(vertex.y)?;
        writer.write_f32::<LittleEndian>(vertex.z)?;

        if let Some(normals) = normals {
            writer.write_f32::<LittleEndian>(normals[i].x)?;
            writer.write_f32::<LittleEndian>(normals[i].y)?;
            writer.write_f32::<LittleEndian>(normals[i].z)?;
        }
    }

    for face in faces {
        writer.write_u8(3)?;
        for &index in face {
            writer.write_i32::<LittleEndian>(index)?;
        }
    }
    Ok(())
}

/// Extract a property value as f32 from a PLY element
fn extract_property_value(element: &DefaultElement, name: &str) -> Result<f32> {
    match element.get(name) {
        Some(Property::Float(val)) => Ok(*val),
        Some(Property::Double(val)) => Ok(*val as f32),
        Some(Property::Int(val)) => Ok(*val as f32),
        Some(Property::UInt(val)) => Ok(*val as f32),
        Some(Property::Short(val)) => Ok(f32::from(*val)),
        Some(Property::UShort(val)) => Ok(f32::from(*val)),
        Some(Property::Char(val)) => Ok(f32::from(*val)),
        Some(Property::UChar(val)) => Ok(f32::from(*val)),
        _ => Err(Error::InvalidData(format!(
            "Property '{}' not found or invalid type",
            name
        ))),
    }
}

/// Extract face indices from a PLY face element
fn extract_face_indices(element: &DefaultElement) -> Result<Vec<usize>> {
    let negative = || Error::InvalidData("Negative PLY face index".to_string());

    match element.get("vertex_indices").or_else(|| element.get("vertex_index")) {
        Some(Property::ListInt(indices)) => indices
            .iter()
            .map(|&idx| usize::try_from(idx).map_err(|_| negative()))
            .collect(),
        Some(Property::ListShort(indices)) => indices
            .iter()
            .map(|&idx| usize::try_from(idx).map_err(|_| negative()))
            .collect(),
        Some(Property::ListUInt(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        Some(Property::ListUShort(indices)) => Ok(indices.iter().map(|&idx| usize::from(idx)).collect()),
        Some(Property::ListUChar(indices)) => Ok(indices.iter().map(|&idx| usize::from(idx)).collect()),
        _ => Err(Error::InvalidData("Face indices not found".to_string())),
    }
}
