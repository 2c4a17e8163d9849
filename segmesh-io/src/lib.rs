//! Volume reading and mesh writing
//!
//! This crate loads segmentation volumes (NIfTI) together with their image
//! geometry, and reads and writes triangle meshes in PLY and STL, selecting
//! the format from the file extension.

pub mod nii;
pub mod ply;
pub mod stl;
pub mod registry;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use registry::{MeshFormat, VolumeFormat};

use segmesh_core::{CoordinateSpace, Error, Result, TriangleMesh, Volume};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Text or binary encoding for mesh formats that support both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Little-endian binary
    #[default]
    Binary,
    Ascii,
}

/// Options controlling how meshes are written
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub encoding: Encoding,
    /// Free-form text placed in the file header (PLY comment, STL header/solid name)
    pub comment: Option<String>,
}

impl WriteOptions {
    /// Options for ASCII output
    pub fn ascii() -> Self {
        Self {
            encoding: Encoding::Ascii,
            ..Default::default()
        }
    }

    /// Options for binary output
    pub fn binary() -> Self {
        Self::default()
    }

    /// Attach a header comment
    pub fn with_comment<S: Into<String>>(mut self, comment: S) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Options controlling how volumes are read
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeReadOptions {
    /// Physical coordinate convention of the returned geometry
    pub space: CoordinateSpace,
}

/// Trait for reading volumes from files
pub trait VolumeReader {
    fn read_volume<P: AsRef<Path>>(path: P, options: &VolumeReadOptions) -> Result<Volume>;
}

/// Trait for reading meshes
pub trait MeshReader {
    /// Read a mesh from any byte source
    fn read_mesh_from<R: Read>(reader: R) -> Result<TriangleMesh>;

    /// Read a mesh from a file
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => Error::Io(e),
        })?;
        Self::read_mesh_from(BufReader::new(file))
    }
}

/// Trait for writing meshes
pub trait MeshWriter {
    /// Serialize a mesh into any byte sink
    fn write_mesh_to<W: Write>(mesh: &TriangleMesh, writer: W, options: &WriteOptions) -> Result<()>;

    /// Serialize a mesh into a file, creating or truncating it.
    ///
    /// I/O failures are reported as [`Error::MeshWrite`] carrying the path.
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P, options: &WriteOptions) -> Result<()> {
        let path = path.as_ref();
        let with_path = |source: std::io::Error| Error::MeshWrite {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(with_path)?;
        let mut writer = BufWriter::new(file);
        match Self::write_mesh_to(mesh, &mut writer, options) {
            Ok(()) => {}
            Err(Error::Io(e)) => return Err(with_path(e)),
            Err(e) => return Err(e),
        }
        writer.flush().map_err(with_path)
    }
}

/// Auto-detect format and read a volume
pub fn read_volume<P: AsRef<Path>>(path: P, options: &VolumeReadOptions) -> Result<Volume> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match VolumeFormat::from_path(path)? {
        VolumeFormat::Nifti => nii::NiftiReader::read_volume(path, options),
    }
}

/// Auto-detect format and read a mesh.
///
/// The extension decides the format; files without a known extension are
/// sniffed by their header.
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    let format = MeshFormat::from_path(path)
        .or_else(|e| MeshFormat::detect_by_header(path).ok_or(e))?;

    match format {
        MeshFormat::Ply => ply::PlyReader::read_mesh(path),
        MeshFormat::Stl => stl::StlReader::read_mesh(path),
    }
}

/// Write a mesh in the format implied by the path's extension.
///
/// Missing parent directories are created first.
pub fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P, options: &WriteOptions) -> Result<MeshFormat> {
    let path = path.as_ref();
    let format = MeshFormat::from_path(path)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| Error::MeshWrite {
            path: path.to_path_buf(),
            source,
        })?;
    }

    log::debug!(
        "Writing {} vertices and {} faces as {} ({:?})",
        mesh.vertex_count(),
        mesh.face_count(),
        format,
        options.encoding
    );

    match format {
        MeshFormat::Ply => ply::PlyWriter::write_mesh(mesh, path, options)?,
        MeshFormat::Stl => stl::StlWriter::write_mesh(mesh, path, options)?,
    }

    Ok(format)
}

#[cfg(test)]
mod tests;
