//! NIfTI-1 volume support
//!
//! Samples are read through the `nifti` crate, which applies `scl_slope` and
//! `scl_inter` and handles gzip. The spatial transform is decoded here from
//! the header: `sform` wins over `qform`, which wins over bare `pixdim`.

use crate::{VolumeReadOptions, VolumeReader};
use nalgebra::{Matrix3, Matrix4, Quaternion, UnitQuaternion};
use ndarray::Array3;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use segmesh_core::{CoordinateSpace, Error, ImageGeometry, Point3d, Result, Vector3d, Volume};
use std::fmt;
use std::path::Path;

pub struct NiftiReader;

/// Which part of the header the geometry was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometrySource {
    Sform,
    Qform,
    Pixdim,
}

impl fmt::Display for GeometrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometrySource::Sform => write!(f, "sform"),
            GeometrySource::Qform => write!(f, "qform"),
            GeometrySource::Pixdim => write!(f, "pixdim"),
        }
    }
}

/// The spatial fields of a NIfTI-1 header, widened to `f64`
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderTransform {
    pub pixdim: [f64; 4],
    pub qform_code: i32,
    pub quatern: [f64; 3],
    pub qoffset: [f64; 3],
    pub sform_code: i32,
    pub srow: [[f64; 4]; 3],
}

impl Default for HeaderTransform {
    fn default() -> Self {
        Self {
            pixdim: [1.0; 4],
            qform_code: 0,
            quatern: [0.0; 3],
            qoffset: [0.0; 3],
            sform_code: 0,
            srow: [[0.0; 4]; 3],
        }
    }
}

impl HeaderTransform {
    pub fn from_header(header: &NiftiHeader) -> Self {
        let row = |r: &[f32; 4]| r.map(f64::from);
        Self {
            pixdim: [
                f64::from(header.pixdim[0]),
                f64::from(header.pixdim[1]),
                f64::from(header.pixdim[2]),
                f64::from(header.pixdim[3]),
            ],
            qform_code: i32::from(header.qform_code),
            quatern: [
                f64::from(header.quatern_b),
                f64::from(header.quatern_c),
                f64::from(header.quatern_d),
            ],
            qoffset: [
                f64::from(header.quatern_x),
                f64::from(header.quatern_y),
                f64::from(header.quatern_z),
            ],
            sform_code: i32::from(header.sform_code),
            srow: [row(&header.srow_x), row(&header.srow_y), row(&header.srow_z)],
        }
    }

    /// Decode the index-to-RAS geometry.
    ///
    /// An unusable `sform` falls back to the `qform`, and an unusable `qform`
    /// to `pixdim`.
    pub fn geometry(&self) -> Result<(ImageGeometry, GeometrySource)> {
        if self.sform_code > 0 {
            match self.sform_geometry() {
                Ok(geometry) => return Ok((geometry, GeometrySource::Sform)),
                Err(e) => log::warn!("Ignoring sform ({}), falling back", e),
            }
        }
        if self.qform_code > 0 {
            match self.qform_geometry() {
                Ok(geometry) => return Ok((geometry, GeometrySource::Qform)),
                Err(e) => log::warn!("Ignoring qform ({}), falling back", e),
            }
        }
        let geometry = ImageGeometry::new(Point3d::origin(), self.spacing(), Matrix3::identity())?;
        Ok((geometry, GeometrySource::Pixdim))
    }

    fn sform_geometry(&self) -> Result<ImageGeometry> {
        let [x, y, z] = &self.srow;
        let affine = Matrix4::new(
            x[0], x[1], x[2], x[3],
            y[0], y[1], y[2], y[3],
            z[0], z[1], z[2], z[3],
            0.0, 0.0, 0.0, 1.0,
        );
        ImageGeometry::from_affine(&affine)
    }

    fn qform_geometry(&self) -> Result<ImageGeometry> {
        let [b, c, d] = self.quatern;
        let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
        let rotation = UnitQuaternion::from_quaternion(Quaternion::new(a, b, c, d));

        let mut direction = rotation.to_rotation_matrix().into_inner();
        if self.pixdim[0] < 0.0 {
            direction.column_mut(2).neg_mut();
        }

        let [ox, oy, oz] = self.qoffset;
        ImageGeometry::new(Point3d::new(ox, oy, oz), self.spacing(), direction)
    }

    /// Voxel spacing from `pixdim[1..4]`; zero or non-finite entries become 1
    fn spacing(&self) -> Vector3d {
        let mut spacing = Vector3d::zeros();
        for axis in 0..3 {
            let value = self.pixdim[axis + 1].abs();
            spacing[axis] = if value.is_finite() && value > 0.0 {
                value
            } else {
                log::warn!(
                    "pixdim[{}] is {}, using unit spacing for that axis",
                    axis + 1,
                    self.pixdim[axis + 1]
                );
                1.0
            };
        }
        spacing
    }
}

impl VolumeReader for NiftiReader {
    fn read_volume<P: AsRef<Path>>(path: P, options: &VolumeReadOptions) -> Result<Volume> {
        let path = path.as_ref();
        let read_error = |message: String| Error::VolumeRead {
            path: path.to_path_buf(),
            message,
        };

        let object = ReaderOptions::new()
            .read_file(path)
            .map_err(|e| read_error(e.to_string()))?;

        let transform = HeaderTransform::from_header(object.header());
        let data = object
            .into_volume()
            .into_ndarray::<f32>()
            .map_err(|e| read_error(e.to_string()))?;

        let shape = data.shape().to_vec();
        let [ni, nj, nk] = spatial_dims(&shape).map_err(read_error)?;
        let values: Vec<f32> = data.iter().copied().collect();

        // Logical order is [i][j][k]; store as [k][j][i]
        let samples = Array3::from_shape_vec((ni, nj, nk), values)
            .map_err(|e| read_error(e.to_string()))?
            .permuted_axes([2, 1, 0]);

        let (geometry, source) = transform.geometry()?;
        let geometry = geometry.converted(CoordinateSpace::Ras, options.space);

        log::info!("Loaded {} with size {}x{}x{}", path.display(), ni, nj, nk);
        log::debug!(
            "Geometry from {}: origin {:?}, spacing {:?}, output space {:?}",
            source,
            geometry.origin.coords.as_slice(),
            geometry.spacing.as_slice(),
            options.space
        );

        Volume::new(samples, geometry)
    }
}

/// The three spatial extents of a NIfTI data shape.
///
/// Trailing singleton axes are dropped; anything else beyond three axes is
/// rejected.
fn spatial_dims(shape: &[usize]) -> std::result::Result<[usize; 3], String> {
    if shape.len() < 3 {
        return Err(format!(
            "Expected a 3-D volume, found {} dimension(s) {:?}",
            shape.len(),
            shape
        ));
    }
    if shape[3..].iter().any(|&n| n != 1) {
        return Err(format!(
            "Expected a 3-D volume, found non-singleton extra dimensions in {:?}",
            shape
        ));
    }
    if shape.len() > 3 {
        log::warn!("Squeezing trailing singleton dimensions of shape {:?}", shape);
    }
    Ok([shape[0], shape[1], shape[2]])
}
