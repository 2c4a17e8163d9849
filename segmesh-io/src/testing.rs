//! NIfTI-1 fixtures for tests
//!
//! Writes a single-file, little-endian, float32 `.nii` with the 348-byte
//! header, an empty extension block and voxel data in `i`-fastest order.
//! Available to other crates through the `test-utils` feature.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};
use std::path::Path;

const VOX_OFFSET: usize = 352;
const DT_FLOAT32: i16 = 16;

pub struct NiftiFixture {
    pub dim: Vec<u16>,
    pub pixdim: [f32; 4],
    pub qform_code: i16,
    pub quatern: [f32; 3],
    pub qoffset: [f32; 3],
    pub sform_code: i16,
    pub srow: [[f32; 4]; 3],
    pub data: Vec<f32>,
}

impl NiftiFixture {
    /// Fixture of extents `dim`, sampling `f(i, j, k)` for every voxel
    pub fn new<F: Fn(usize, usize, usize) -> f32>(dim: &[u16], f: F) -> Self {
        let extent = |axis: usize| dim.get(axis).copied().unwrap_or(1) as usize;
        let (ni, nj, nk) = (extent(0), extent(1), extent(2));
        let total: usize = dim.iter().map(|&n| n as usize).product();

        let data = (0..total)
            .map(|n| f(n % ni, (n / ni) % nj, (n / (ni * nj)) % nk))
            .collect();

        Self {
            dim: dim.to_vec(),
            pixdim: [1.0; 4],
            qform_code: 0,
            quatern: [0.0; 3],
            qoffset: [0.0; 3],
            sform_code: 0,
            srow: [[0.0; 4]; 3],
            data,
        }
    }

    pub fn with_sform(mut self, srow: [[f32; 4]; 3]) -> Self {
        self.sform_code = 1;
        self.srow = srow;
        self
    }

    pub fn with_qform(mut self, quatern: [f32; 3], qoffset: [f32; 3], qfac: f32) -> Self {
        self.qform_code = 1;
        self.quatern = quatern;
        self.qoffset = qoffset;
        self.pixdim[0] = qfac;
        self
    }

    pub fn with_pixdim(mut self, spacing: [f32; 3]) -> Self {
        self.pixdim[1..].copy_from_slice(&spacing);
        self
    }

    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(VOX_OFFSET + 4 * self.data.len());
        self.write_header(&mut out)?;
        for value in &self.data {
            out.write_f32::<LittleEndian>(*value)?;
        }
        Ok(out)
    }

    pub fn write(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.to_bytes()?)
    }

    fn write_header<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_i32::<LittleEndian>(348)?;
        out.write_all(&[0u8; 36])?;

        let mut dim = [1i16; 8];
        dim[0] = self.dim.len() as i16;
        for (slot, &n) in dim[1..].iter_mut().zip(&self.dim) {
            *slot = n as i16;
        }
        for d in dim {
            out.write_i16::<LittleEndian>(d)?;
        }

        out.write_all(&[0u8; 12])?; // intent_p1..3
        out.write_i16::<LittleEndian>(0)?; // intent_code
        out.write_i16::<LittleEndian>(DT_FLOAT32)?;
        out.write_i16::<LittleEndian>(32)?; // bitpix
        out.write_i16::<LittleEndian>(0)?; // slice_start

        for p in self.pixdim.iter().chain(&[1.0f32; 4]) {
            out.write_f32::<LittleEndian>(*p)?;
        }

        out.write_f32::<LittleEndian>(VOX_OFFSET as f32)?;
        out.write_f32::<LittleEndian>(1.0)?; // scl_slope
        out.write_f32::<LittleEndian>(0.0)?; // scl_inter
        out.write_i16::<LittleEndian>(0)?; // slice_end
        out.write_u8(0)?; // slice_code
        out.write_u8(2)?; // xyzt_units: mm
        out.write_all(&[0u8; 16])?; // cal_max, cal_min, slice_duration, toffset
        out.write_all(&[0u8; 8])?; // glmax, glmin
        out.write_all(&[0u8; 80])?; // descrip
        out.write_all(&[0u8; 24])?; // aux_file

        out.write_i16::<LittleEndian>(self.qform_code)?;
        out.write_i16::<LittleEndian>(self.sform_code)?;
        for q in self.quatern.iter().chain(&self.qoffset) {
            out.write_f32::<LittleEndian>(*q)?;
        }
        for row in &self.srow {
            for v in row {
                out.write_f32::<LittleEndian>(*v)?;
            }
        }

        out.write_all(&[0u8; 16])?; // intent_name
        out.write_all(b"n+1\0")?;
        out.write_all(&[0u8; 4])?; // no extensions
        Ok(())
    }
}
