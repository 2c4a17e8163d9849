//! End-to-end conversion tests: NIfTI in, PLY/STL out

mod common;

use clap::Parser;
use common::{write_cuboid, write_nifti, Sform, UNIT_SFORM};
use segmesh::{run, Cli};
use segmesh_core::Error;
use segmesh_io::{read_mesh, MeshFormat};
use std::path::Path;
use std::process::Command;

fn cli(input: &Path, output: &Path, extra: &[&str]) -> Cli {
    let mut args = vec![
        "segmesh".to_string(),
        input.display().to_string(),
        output.display().to_string(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    Cli::try_parse_from(args).unwrap()
}

fn core_error(err: &anyhow::Error) -> &Error {
    err.downcast_ref::<Error>()
        .unwrap_or_else(|| panic!("not a segmesh error: {err:#}"))
}

const OBLIQUE_SFORM: Sform = [
    [-0.5, 0.0, 0.0, 20.0],
    [0.0, 0.0, 2.0, -10.0],
    [0.0, 1.5, 0.0, 5.0],
];

#[test]
fn test_all_zero_volume_is_rejected_before_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.nii");
    let output = dir.path().join("empty.ply");
    write_nifti(&input, [4, 4, 4], UNIT_SFORM, |_, _, _| 0.0);

    let err = run(&cli(&input, &output, &[])).unwrap_err();

    assert!(matches!(core_error(&err), Error::EmptyVolume { .. }));
    assert!(err.to_string().contains("appears to be empty"));
    assert!(!output.exists());
}

#[test]
fn test_ply_and_stl_outputs_agree() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cuboid.nii");
    write_cuboid(&input, OBLIQUE_SFORM);

    let ply_path = dir.path().join("cuboid.ply");
    let stl_path = dir.path().join("cuboid.stl");
    let ply = run(&cli(&input, &ply_path, &[])).unwrap();
    let stl = run(&cli(&input, &stl_path, &[])).unwrap();

    assert_eq!(ply.format, MeshFormat::Ply);
    assert_eq!(stl.format, MeshFormat::Stl);
    assert!(ply.vertices > 0 && ply.faces > 0);
    assert_eq!((ply.vertices, ply.faces), (stl.vertices, stl.faces));

    let ply_mesh = read_mesh(&ply_path).unwrap();
    let stl_mesh = read_mesh(&stl_path).unwrap();
    assert_eq!(ply_mesh.vertex_count(), ply.vertices);
    assert_eq!(ply_mesh.face_count(), ply.faces);
    assert_eq!(stl_mesh.vertex_count(), stl.vertices);
    assert_eq!(stl_mesh.face_count(), stl.faces);
    assert!(ply_mesh.normals.is_some());
}

#[test]
fn test_ascii_outputs_agree_with_binary() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cuboid.nii");
    write_cuboid(&input, UNIT_SFORM);

    for name in ["mesh.ply", "mesh.stl"] {
        let binary = dir.path().join("binary").join(name);
        let ascii = dir.path().join("ascii").join(name);
        run(&cli(&input, &binary, &[])).unwrap();
        run(&cli(&input, &ascii, &["--ascii"])).unwrap();

        let a = read_mesh(&binary).unwrap();
        let b = read_mesh(&ascii).unwrap();
        assert_eq!(a.vertex_count(), b.vertex_count(), "{name}");
        assert_eq!(a.face_count(), b.face_count(), "{name}");

        let head = std::fs::read(&ascii).unwrap();
        assert!(head.starts_with(b"ply\nformat ascii") || head.starts_with(b"solid"));
    }
}

#[test]
fn test_vertices_lie_within_physical_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cuboid.nii");
    let output = dir.path().join("cuboid.ply");
    write_cuboid(&input, OBLIQUE_SFORM);

    run(&cli(&input, &output, &["--space", "ras"])).unwrap();
    let mesh = read_mesh(&output).unwrap();

    // Index box [0, 7]^3 through the sform
    let (x_min, x_max) = (20.0 - 0.5 * 7.0, 20.0);
    let (y_min, y_max) = (-10.0, -10.0 + 2.0 * 7.0);
    let (z_min, z_max) = (5.0, 5.0 + 1.5 * 7.0);
    let eps = 1e-4;
    for v in &mesh.vertices {
        assert!(v.x >= x_min - eps && v.x <= x_max + eps, "{v:?}");
        assert!(v.y >= y_min - eps && v.y <= y_max + eps, "{v:?}");
        assert!(v.z >= z_min - eps && v.z <= z_max + eps, "{v:?}");
    }
}

#[test]
fn test_lps_and_ras_outputs_differ_by_xy_sign() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cuboid.nii");
    write_cuboid(&input, OBLIQUE_SFORM);

    let lps_path = dir.path().join("lps.ply");
    let ras_path = dir.path().join("ras.ply");
    run(&cli(&input, &lps_path, &[])).unwrap();
    run(&cli(&input, &ras_path, &["--space", "ras"])).unwrap();

    let lps = read_mesh(&lps_path).unwrap();
    let ras = read_mesh(&ras_path).unwrap();
    assert_eq!(lps.faces, ras.faces);
    for (p, q) in lps.vertices.iter().zip(&ras.vertices) {
        assert!((p.x + q.x).abs() < 1e-4);
        assert!((p.y + q.y).abs() < 1e-4);
        assert!((p.z - q.z).abs() < 1e-4);
    }
}

#[test]
fn test_level_does_not_change_format() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cuboid.nii");
    write_cuboid(&input, UNIT_SFORM);

    for level in ["0.2", "0.5", "0.9"] {
        let output = dir.path().join(format!("level_{level}.stl"));
        let summary = run(&cli(&input, &output, &["--level", level])).unwrap();

        assert_eq!(summary.format, MeshFormat::Stl);
        assert_eq!(MeshFormat::detect_by_header(&output), Some(MeshFormat::Stl));
        assert_eq!(read_mesh(&output).unwrap().face_count(), summary.faces);
    }
}

#[test]
fn test_level_on_foreground_value_keeps_counts_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cuboid.nii");
    write_cuboid(&input, OBLIQUE_SFORM);

    for name in ["mesh.ply", "mesh.stl"] {
        let output = dir.path().join(name);
        let summary = run(&cli(&input, &output, &["--level", "1.0"])).unwrap();

        // Surface through the outermost foreground samples of the 3x3x3 block
        assert_eq!((summary.vertices, summary.faces), (26, 48), "{name}");

        let mesh = read_mesh(&output).unwrap();
        assert_eq!(mesh.vertex_count(), summary.vertices, "{name}");
        assert_eq!(mesh.face_count(), summary.faces, "{name}");
        for face in &mesh.faces {
            let [a, b, c] = face.map(|i| mesh.vertices[i]);
            assert!((b - a).cross(&(c - a)).norm() > 1e-6, "{name}: zero-area face");
        }
    }
}

#[test]
fn test_missing_input_creates_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("missing.nii.gz");
    let output = dir.path().join("out").join("mesh.ply");

    let err = run(&cli(&input, &output, &[])).unwrap_err();

    assert!(matches!(core_error(&err), Error::FileNotFound { .. }));
    assert!(!output.exists());
    assert!(!output.parent().unwrap().exists());
}

#[test]
fn test_missing_parent_directories_are_created() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cuboid.nii");
    write_cuboid(&input, UNIT_SFORM);

    let output = dir.path().join("a").join("b").join("c").join("mesh.stl");
    let summary = run(&cli(&input, &output, &[])).unwrap();

    assert!(output.is_file());
    assert_eq!(summary.output, output);
}

#[test]
fn test_unsupported_extension_is_rejected_before_loading() {
    let dir = tempfile::tempdir().unwrap();
    // The input does not exist either; the output extension is checked first
    let input = dir.path().join("missing.nii");
    let output = dir.path().join("mesh.obj");

    let err = run(&cli(&input, &output, &[])).unwrap_err();

    assert!(matches!(core_error(&err), Error::UnsupportedFormat(_)));
    assert!(!output.exists());
}

#[test]
fn test_level_above_every_sample_has_no_surface() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cuboid.nii");
    let output = dir.path().join("mesh.ply");
    write_cuboid(&input, UNIT_SFORM);

    let err = run(&cli(&input, &output, &["--level", "2.0"])).unwrap_err();

    assert!(matches!(core_error(&err), Error::EmptyIsosurface { .. }));
    assert!(!output.exists());
}

#[test]
fn test_nan_level_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cuboid.nii");
    write_cuboid(&input, UNIT_SFORM);

    let err = run(&cli(&input, &dir.path().join("mesh.ply"), &["--level", "NaN"])).unwrap_err();
    assert!(matches!(core_error(&err), Error::InvalidData(_)));
}

#[test]
fn test_binary_reports_success() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cuboid.nii");
    let output = dir.path().join("out").join("mesh.ply");
    write_cuboid(&input, UNIT_SFORM);

    let result = Command::new(env!("CARGO_BIN_EXE_segmesh"))
        .arg(&input)
        .arg(&output)
        .output()
        .unwrap();

    assert!(result.status.success());
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.starts_with("Saved mesh with "), "{stdout}");
    assert!(stdout.trim_end().ends_with(&output.display().to_string()), "{stdout}");
}

#[test]
fn test_binary_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("mesh.ply");

    let result = Command::new(env!("CARGO_BIN_EXE_segmesh"))
        .arg(dir.path().join("missing.nii"))
        .arg(&output)
        .output()
        .unwrap();

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.starts_with("Error: "), "{stderr}");
    assert!(stderr.contains("File not found"), "{stderr}");
    assert!(!output.exists());
}
