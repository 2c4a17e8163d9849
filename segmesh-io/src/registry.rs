//! Format detection from file names and headers
//!
//! Formats are resolved once, up front, so callers can reject an unsupported
//! output path before doing any expensive work.

use segmesh_core::{Error, Result};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Mesh file formats segmesh can write and read back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    /// Polygon File Format
    Ply,
    /// Stereolithography
    Stl,
}

impl MeshFormat {
    /// All supported mesh formats
    pub const ALL: [MeshFormat; 2] = [MeshFormat::Ply, MeshFormat::Stl];

    /// Resolve the format from a path's extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                Error::UnsupportedFormat(format!(
                    "No mesh file extension in {} (expected one of: {})",
                    path.display(),
                    Self::extension_list()
                ))
            })?;

        Self::from_extension(extension).ok_or_else(|| {
            Error::UnsupportedFormat(format!(
                "Unsupported mesh format: .{} (expected one of: {})",
                extension,
                Self::extension_list()
            ))
        })
    }

    /// Resolve the format from a bare extension such as `"ply"`
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "ply" => Some(MeshFormat::Ply),
            "stl" => Some(MeshFormat::Stl),
            _ => None,
        }
    }

    /// Canonical file extension
    pub fn extension(self) -> &'static str {
        match self {
            MeshFormat::Ply => "ply",
            MeshFormat::Stl => "stl",
        }
    }

    /// Guess the format of an existing file from its first bytes.
    ///
    /// ASCII STL starts with `solid`; binary STL has no signature, so any file
    /// whose size matches the binary STL layout is reported as STL.
    pub fn detect_by_header(path: &Path) -> Option<Self> {
        let mut file = File::open(path).ok()?;
        let mut header = [0u8; 84];
        let bytes_read = file.read(&mut header).ok()?;

        if header[..bytes_read].starts_with(b"ply") {
            return Some(MeshFormat::Ply);
        }
        if header[..bytes_read].starts_with(b"solid") {
            return Some(MeshFormat::Stl);
        }
        if bytes_read == 84 {
            let count = u32::from_le_bytes([header[80], header[81], header[82], header[83]]);
            let len = file.metadata().ok()?.len();
            if len == 84 + 50 * u64::from(count) {
                return Some(MeshFormat::Stl);
            }
        }

        None
    }

    fn extension_list() -> String {
        Self::ALL
            .iter()
            .map(|f| format!(".{}", f.extension()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshFormat::Ply => write!(f, "PLY"),
            MeshFormat::Stl => write!(f, "STL"),
        }
    }
}

/// Volume file formats segmesh can read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeFormat {
    /// NIfTI-1, single file (`.nii`, `.nii.gz`) or header/image pair
    Nifti,
}

impl VolumeFormat {
    const NIFTI_SUFFIXES: [&'static str; 6] =
        [".nii", ".nii.gz", ".hdr", ".hdr.gz", ".img", ".img.gz"];

    /// Resolve the format from a path's file name (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if Self::NIFTI_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
            Ok(VolumeFormat::Nifti)
        } else {
            Err(Error::UnsupportedFormat(format!(
                "Unsupported volume format: {} (expected NIfTI: {})",
                path.display(),
                Self::NIFTI_SUFFIXES.join(", ")
            )))
        }
    }
}
