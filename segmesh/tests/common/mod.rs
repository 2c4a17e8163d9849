//! Shared fixtures: small NIfTI-1 segmentations written straight to disk

use segmesh_io::testing::NiftiFixture;
use std::path::Path;

/// Spatial transform rows `srow_x`, `srow_y`, `srow_z` of a fixture
pub type Sform = [[f32; 4]; 3];

pub const UNIT_SFORM: Sform = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
];

/// Write a float32 `.nii` of extents `dim` (i, j, k) sampling `f(i, j, k)`
pub fn write_nifti<F>(path: &Path, dim: [u16; 3], sform: Sform, f: F)
where
    F: Fn(usize, usize, usize) -> f32,
{
    let spacing = |axis: usize| (0..3).map(|r| sform[r][axis].powi(2)).sum::<f32>().sqrt();

    NiftiFixture::new(&dim, f)
        .with_sform(sform)
        .with_pixdim([spacing(0), spacing(1), spacing(2)])
        .write(path)
        .unwrap();
}

/// Foreground block covering indices 2..=4 on every axis of an 8x8x8 image
pub fn write_cuboid(path: &Path, sform: Sform) {
    write_nifti(path, [8, 8, 8], sform, |i, j, k| {
        let inside = |n: usize| (2..=4).contains(&n);
        if inside(i) && inside(j) && inside(k) {
            1.0
        } else {
            0.0
        }
    });
}
