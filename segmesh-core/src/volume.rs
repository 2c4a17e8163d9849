//! Volumetric images

use crate::{Error, ImageGeometry, Result};
use ndarray::{Array3, ArrayView3};

/// A scalar volume together with its geometry.
///
/// Samples are stored in array-axis order `[k][j][i]` (slice, row, column),
/// C-contiguous, so the fastest-varying axis is the image's `i` index.
/// The geometry maps index order `(i, j, k)` to physical space.
#[derive(Debug, Clone)]
pub struct Volume {
    samples: Array3<f32>,
    geometry: ImageGeometry,
}

impl Volume {
    /// Create a volume from samples in `[k][j][i]` order
    pub fn new(samples: Array3<f32>, geometry: ImageGeometry) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::InvalidData("Volume has no samples".to_string()));
        }

        let samples = if samples.is_standard_layout() {
            samples
        } else {
            samples.as_standard_layout().into_owned()
        };

        Ok(Self { samples, geometry })
    }

    /// Build a volume by evaluating `f(k, j, i)` for every sample.
    ///
    /// `shape` is given in array-axis order `[nk, nj, ni]`.
    pub fn from_shape_fn<F>(shape: [usize; 3], geometry: ImageGeometry, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize, usize) -> f32,
    {
        let samples = Array3::from_shape_fn(shape, |(k, j, i)| f(k, j, i));
        Self::new(samples, geometry)
    }

    /// The sample array in `[k][j][i]` order
    pub fn samples(&self) -> ArrayView3<'_, f32> {
        self.samples.view()
    }

    /// The image geometry
    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    /// Shape in array-axis order `[nk, nj, ni]`
    pub fn shape(&self) -> [usize; 3] {
        let (nk, nj, ni) = self.samples.dim();
        [nk, nj, ni]
    }

    /// Size in index order `[ni, nj, nk]`
    pub fn size(&self) -> [usize; 3] {
        let [nk, nj, ni] = self.shape();
        [ni, nj, nk]
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false: construction rejects volumes without samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample at index `(i, j, k)`, if inside the volume
    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<f32> {
        self.samples.get((k, j, i)).copied()
    }

    /// Largest sample, ignoring NaNs. `None` if every sample is NaN.
    pub fn max_value(&self) -> Option<f32> {
        self.samples
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f32| m.max(v))))
    }

    /// Number of samples at or above `level`
    pub fn count_at_or_above(&self, level: f32) -> usize {
        self.samples.iter().filter(|&&v| v >= level).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_and_size_orders() {
        let volume = Volume::from_shape_fn([2, 3, 4], ImageGeometry::identity(), |_, _, _| 0.0)
            .unwrap();

        assert_eq!(volume.shape(), [2, 3, 4]);
        assert_eq!(volume.size(), [4, 3, 2]);
        assert_eq!(volume.len(), 24);
    }

    #[test]
    fn test_get_uses_index_order() {
        let volume = Volume::from_shape_fn([2, 3, 4], ImageGeometry::identity(), |k, j, i| {
            (100 * k + 10 * j + i) as f32
        })
        .unwrap();

        assert_eq!(volume.get(3, 2, 1), Some(123.0));
        assert_eq!(volume.get(4, 0, 0), None);
    }

    #[test]
    fn test_max_value_ignores_nan() {
        let volume = Volume::from_shape_fn([1, 1, 3], ImageGeometry::identity(), |_, _, i| {
            [f32::NAN, -2.0, -1.0][i]
        })
        .unwrap();

        assert_eq!(volume.max_value(), Some(-1.0));
    }

    #[test]
    fn test_max_value_all_nan() {
        let volume =
            Volume::from_shape_fn([1, 1, 2], ImageGeometry::identity(), |_, _, _| f32::NAN)
                .unwrap();
        assert_eq!(volume.max_value(), None);
    }

    #[test]
    fn test_empty_samples_rejected() {
        let samples = Array3::<f32>::zeros((0, 4, 4));
        assert!(Volume::new(samples, ImageGeometry::identity()).is_err());
    }

    #[test]
    fn test_non_standard_layout_is_normalized() {
        let samples = Array3::from_shape_fn((2, 3, 4), |(a, b, c)| (a + b + c) as f32);
        let transposed = samples.reversed_axes();
        let volume = Volume::new(transposed, ImageGeometry::identity()).unwrap();

        assert!(volume.samples().is_standard_layout());
        assert_eq!(volume.shape(), [4, 3, 2]);
    }

    #[test]
    fn test_count_at_or_above() {
        let volume = Volume::from_shape_fn([2, 2, 2], ImageGeometry::identity(), |k, _, _| {
            k as f32
        })
        .unwrap();
        assert_eq!(volume.count_at_or_above(0.5), 4);
        assert_eq!(volume.count_at_or_above(0.0), 8);
    }
}
