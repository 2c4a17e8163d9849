//! # segmesh
//!
//! Convert a binary segmentation volume into a surface mesh.
//!
//! The pipeline loads a NIfTI image, extracts the isosurface at a threshold
//! with marching cubes, places it in physical coordinates using the image
//! geometry, and writes it as PLY or STL depending on the output extension.
//!
//! ```no_run
//! use clap::Parser;
//!
//! let cli = segmesh::Cli::parse_from(["segmesh", "ventricles.nii.gz", "out/ventricles.stl"]);
//! let summary = segmesh::run(&cli)?;
//! println!("{}", summary);
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use segmesh_core::{CoordinateSpace, Error, Volume};
use segmesh_io::{Encoding, MeshFormat, VolumeReadOptions, WriteOptions};
use segmesh_reconstruction::{build_mesh, MarchingCubesConfig};
use std::fmt;
use std::path::PathBuf;

/// Physical coordinate convention for the written vertices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Space {
    /// Left-Posterior-Superior (ITK convention)
    #[default]
    Lps,
    /// Right-Anterior-Superior (NIfTI convention)
    Ras,
}

impl From<Space> for CoordinateSpace {
    fn from(space: Space) -> Self {
        match space {
            Space::Lps => CoordinateSpace::Lps,
            Space::Ras => CoordinateSpace::Ras,
        }
    }
}

/// Convert a binary segmentation NIfTI image into a surface mesh.
#[derive(Debug, Clone, Parser)]
#[command(name = "segmesh", version, about)]
pub struct Cli {
    /// Path to the segmentation NIfTI image (e.g. ventricles.nii.gz)
    pub input: PathBuf,

    /// Path to write the mesh file (e.g. ventricles.ply or ventricles.stl)
    pub output: PathBuf,

    /// Marching cubes isosurface level for binary data
    #[arg(long, default_value_t = 0.5, allow_negative_numbers = true)]
    pub level: f32,

    /// Physical coordinate convention of the output vertices
    #[arg(long, value_enum, default_value_t = Space::Lps)]
    pub space: Space,

    /// Write ASCII PLY/STL instead of binary
    #[arg(long)]
    pub ascii: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Log level implied by `-v` and `-q`
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    fn write_options(&self) -> WriteOptions {
        let options = WriteOptions {
            encoding: if self.ascii {
                Encoding::Ascii
            } else {
                Encoding::Binary
            },
            comment: None,
        };
        options.with_comment(format!(
            "segmesh {} level {}",
            env!("CARGO_PKG_VERSION"),
            self.level
        ))
    }
}

/// Outcome of a successful conversion
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub vertices: usize,
    pub faces: usize,
    pub format: MeshFormat,
    pub output: PathBuf,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Saved mesh with {} vertices and {} faces to {}",
            self.vertices,
            self.faces,
            self.output.display()
        )
    }
}

/// Run the conversion described by `cli`.
///
/// The output format and level are checked before the input is read, and
/// nothing is written unless a mesh was built.
pub fn run(cli: &Cli) -> Result<Summary> {
    let format = MeshFormat::from_path(&cli.output)?;
    let config = MarchingCubesConfig::with_level(cli.level);
    config.validate()?;

    let read_options = VolumeReadOptions {
        space: cli.space.into(),
    };
    let volume = segmesh_io::read_volume(&cli.input, &read_options)
        .with_context(|| format!("Failed to load volume {}", cli.input.display()))?;

    check_not_empty(&volume)?;
    log::info!(
        "{} of {} samples at or above level {}",
        volume.count_at_or_above(cli.level),
        volume.len(),
        cli.level
    );

    let mesh = build_mesh(&volume, &config)
        .with_context(|| format!("Failed to build a mesh from {}", cli.input.display()))?;

    segmesh_io::write_mesh(&mesh, &cli.output, &cli.write_options())
        .with_context(|| format!("Failed to write {} mesh", format))?;

    Ok(Summary {
        vertices: mesh.vertex_count(),
        faces: mesh.face_count(),
        format,
        output: cli.output.clone(),
    })
}

/// Reject volumes without a single positive sample
pub fn check_not_empty(volume: &Volume) -> segmesh_core::Result<()> {
    match volume.max_value() {
        Some(max) if max > 0.0 => Ok(()),
        max => Err(Error::EmptyVolume {
            max: max.unwrap_or(f32::NAN),
        }),
    }
}
