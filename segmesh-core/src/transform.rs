//! Index-to-physical transforms for volumetric images

use crate::{Error, Point3d, Result, Vector3d};
use nalgebra::{Matrix3, Matrix4};
use serde::{Deserialize, Serialize};

/// Physical axis convention of an image's world space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoordinateSpace {
    /// Left-Posterior-Superior, the ITK/DICOM convention
    #[default]
    Lps,
    /// Right-Anterior-Superior, the NIfTI convention
    Ras,
}

impl CoordinateSpace {
    /// Diagonal matrix converting between this space and the other one.
    ///
    /// LPS and RAS differ only by the sign of the first two axes, so the
    /// same matrix converts in both directions.
    pub fn flip_from_ras(self) -> Matrix3<f64> {
        match self {
            CoordinateSpace::Ras => Matrix3::identity(),
            CoordinateSpace::Lps => Matrix3::from_diagonal(&Vector3d::new(-1.0, -1.0, 1.0)),
        }
    }
}

/// Geometry of a volumetric image: origin, voxel spacing and direction cosines.
///
/// A continuous index `(i, j, k)` maps to the physical point
/// `origin + direction * (spacing ⊙ index)`. Columns of `direction` are the
/// physical directions of the i, j and k axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageGeometry {
    pub origin: Point3d,
    pub spacing: Vector3d,
    pub direction: Matrix3<f64>,
}

impl ImageGeometry {
    /// Create a geometry, validating spacing and direction
    pub fn new(origin: Point3d, spacing: Vector3d, direction: Matrix3<f64>) -> Result<Self> {
        if spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(Error::InvalidData(format!(
                "Voxel spacing must be positive and finite, got {:?}",
                spacing.as_slice()
            )));
        }
        if direction.iter().any(|v| !v.is_finite()) || direction.determinant().abs() < 1e-12 {
            return Err(Error::InvalidData(
                "Direction matrix must be finite and non-singular".to_string(),
            ));
        }
        if origin.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData("Origin must be finite".to_string()));
        }

        Ok(Self {
            origin,
            spacing,
            direction,
        })
    }

    /// Unit spacing, zero origin, identity direction
    pub fn identity() -> Self {
        Self {
            origin: Point3d::origin(),
            spacing: Vector3d::new(1.0, 1.0, 1.0),
            direction: Matrix3::identity(),
        }
    }

    /// Split an affine `index -> physical` matrix into origin, spacing and direction.
    ///
    /// The spacing of each axis is the length of the corresponding column of the
    /// linear part; the direction is that column normalized.
    pub fn from_affine(affine: &Matrix4<f64>) -> Result<Self> {
        let linear: Matrix3<f64> = affine.fixed_view::<3, 3>(0, 0).into_owned();
        let origin = Point3d::new(affine[(0, 3)], affine[(1, 3)], affine[(2, 3)]);

        let spacing = Vector3d::new(
            linear.column(0).norm(),
            linear.column(1).norm(),
            linear.column(2).norm(),
        );
        if spacing.iter().any(|s| *s <= 0.0) {
            return Err(Error::InvalidData(
                "Affine has a zero-length axis".to_string(),
            ));
        }

        let mut direction = linear;
        for (c, s) in spacing.iter().enumerate() {
            direction.column_mut(c).unscale_mut(*s);
        }

        Self::new(origin, spacing, direction)
    }

    /// The affine `index -> physical` matrix
    pub fn to_affine(&self) -> Matrix4<f64> {
        let linear = self.linear();
        let mut affine = linear.to_homogeneous();
        affine[(0, 3)] = self.origin.x;
        affine[(1, 3)] = self.origin.y;
        affine[(2, 3)] = self.origin.z;
        affine
    }

    /// Linear part of the mapping, `direction * diag(spacing)`
    pub fn linear(&self) -> Matrix3<f64> {
        self.direction * Matrix3::from_diagonal(&self.spacing)
    }

    /// Map a continuous index `(i, j, k)` to a physical point
    pub fn index_to_physical(&self, index: &Point3d) -> Point3d {
        self.origin + self.direction * index.coords.component_mul(&self.spacing)
    }

    /// Re-express this geometry in another coordinate space.
    ///
    /// `from` is the space the geometry is currently expressed in.
    pub fn converted(&self, from: CoordinateSpace, to: CoordinateSpace) -> Self {
        if from == to {
            return *self;
        }
        // Both flips are diagonal sign changes; composing them gives from -> to.
        let flip = to.flip_from_ras() * from.flip_from_ras();
        Self {
            origin: Point3d::from(flip * self.origin.coords),
            spacing: self.spacing,
            direction: flip * self.direction,
        }
    }

    /// Whether the index frame has the opposite handedness of the physical frame
    pub fn is_left_handed(&self) -> bool {
        self.direction.determinant() < 0.0
    }

    /// Axis-aligned physical bounds of the index box `[0, n - 1]` on each axis.
    ///
    /// `size` is given in index order `(ni, nj, nk)`.
    pub fn physical_bounds(&self, size: [usize; 3]) -> (Point3d, Point3d) {
        let upper = size.map(|n| n.saturating_sub(1) as f64);
        let mut min = Point3d::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Point3d::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);

        for corner in 0..8 {
            let index = Point3d::new(
                if corner & 1 == 0 { 0.0 } else { upper[0] },
                if corner & 2 == 0 { 0.0 } else { upper[1] },
                if corner & 4 == 0 { 0.0 } else { upper[2] },
            );
            let p = self.index_to_physical(&index);
            min = min.inf(&p);
            max = max.sup(&p);
        }

        (min, max)
    }
}

impl Default for ImageGeometry {
    fn default() -> Self {
        Self::identity()
    }
}
