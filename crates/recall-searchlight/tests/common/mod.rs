//! Shared fixtures for the integration tests: a miniature data tree with a
//! trajectory `.npy` and a gzip-compressed NIfTI-1 scan.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::{Array2, Array4};
use ndarray_npy::write_npy;
use recall_searchlight::config::SearchlightConfig;
use recall_searchlight::paths::{results_dir, InputPaths};

/// Encode a 4-D `[X, Y, Z, T]` float32 volume as single-file NIfTI-1 bytes.
pub fn nifti_bytes(volume: &Array4<f32>) -> Vec<u8> {
    let (nx, ny, nz, nt) = volume.dim();
    let mut header = [0u8; 348];

    header[0..4].copy_from_slice(&348i32.to_le_bytes());
    let dim: [i16; 8] = [4, nx as i16, ny as i16, nz as i16, nt as i16, 1, 1, 1];
    for (i, d) in dim.iter().enumerate() {
        let offset = 40 + i * 2;
        header[offset..offset + 2].copy_from_slice(&d.to_le_bytes());
    }
    // datatype FLOAT32, bitpix 32
    header[70..72].copy_from_slice(&16i16.to_le_bytes());
    header[72..74].copy_from_slice(&32i16.to_le_bytes());
    let pixdim: [f32; 8] = [1.0, 3.0, 3.0, 3.0, 1.5, 1.0, 1.0, 1.0];
    for (i, p) in pixdim.iter().enumerate() {
        let offset = 76 + i * 4;
        header[offset..offset + 4].copy_from_slice(&p.to_le_bytes());
    }
    // vox_offset, scl_slope, scl_inter
    header[108..112].copy_from_slice(&352.0f32.to_le_bytes());
    header[112..116].copy_from_slice(&1.0f32.to_le_bytes());
    header[116..120].copy_from_slice(&0.0f32.to_le_bytes());
    header[344..348].copy_from_slice(b"n+1\0");

    let mut bytes = Vec::with_capacity(352 + volume.len() * 4);
    bytes.extend_from_slice(&header);
    bytes.extend_from_slice(&[0u8; 4]);
    // x varies fastest on disk.
    for t in 0..nt {
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    bytes.extend_from_slice(&volume[[x, y, z, t]].to_le_bytes());
                }
            }
        }
    }
    bytes
}

/// Write `volume` to `path` as `.nii.gz`.
pub fn write_nifti_gz(path: &Path, volume: &Array4<f32>) {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&nifti_bytes(volume)).unwrap();
    std::fs::write(path, encoder.finish().unwrap()).unwrap();
}

/// Trajectory with non-constant, distinct rows.
pub fn trajectory(n_t: usize, n_f: usize) -> Array2<f64> {
    Array2::from_shape_fn((n_t, n_f), |(t, f)| {
        ((t * 7 + f * 3) as f64 * 0.37).sin() + 0.1 * f as f64 + 0.01 * t as f64
    })
}

/// Scan of shape `[nx, ny, nz, n_t]` with a sentinel border one voxel thick
/// and deterministic signal inside.
pub fn scan(nx: usize, ny: usize, nz: usize, n_t: usize, sentinel: f32) -> Array4<f32> {
    Array4::from_shape_fn((nx, ny, nz, n_t), |(x, y, z, t)| {
        let border = x == 0 || y == 0 || z == 0 || x == nx - 1 || y == ny - 1 || z == nz - 1;
        if border {
            sentinel
        } else {
            (((x * 13 + y * 7 + z * 5) as f32 + t as f32 * 1.3).sin() * 100.0) + (x * y + t * z) as f32
        }
    })
}

/// Populate `config.datadir` with inputs for `subid` and create the output
/// directories.
pub fn write_subject(config: &SearchlightConfig, subid: u32, traj: &Array2<f64>, scan: &Array4<f32>) {
    let inputs = InputPaths::for_subject(config, subid);
    std::fs::create_dir_all(inputs.trajectory.parent().unwrap()).unwrap();
    std::fs::create_dir_all(inputs.scan.parent().unwrap()).unwrap();
    write_npy(&inputs.trajectory, traj).unwrap();
    write_nifti_gz(&inputs.scan, scan);
    std::fs::create_dir_all(results_dir(config).join("perms")).unwrap();
}
