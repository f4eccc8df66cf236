use std::path::Path;

use nalgebra::Point3;
use ndarray::Array4;
use nifti::{writer::WriterOptions, NiftiHeader};
use tractset::{affine::Affine4, Streamline, Tractogram, TrkHeader};

/// Peak values encoding their own position: `x*1000 + y*100 + z*10 + c`.
#[allow(dead_code)]
pub fn pattern_volume(shape: (usize, usize, usize, usize)) -> Array4<f32> {
    Array4::from_shape_fn(shape, |(x, y, z, c)| (x * 1000 + y * 100 + z * 10 + c) as f32)
}

/// Header with an sform-coded affine and matching voxel sizes.
#[allow(dead_code)]
pub fn header_with_affine(affine: &Affine4) -> NiftiHeader {
    let row = |r: usize| {
        [
            affine[(r, 0)] as f32,
            affine[(r, 1)] as f32,
            affine[(r, 2)] as f32,
            affine[(r, 3)] as f32,
        ]
    };
    let zooms = tractset::affine::voxel_sizes(affine);
    NiftiHeader {
        sform_code: 1,
        qform_code: 0,
        scl_slope: 1.0,
        scl_inter: 0.0,
        srow_x: row(0),
        srow_y: row(1),
        srow_z: row(2),
        pixdim: [
            1.,
            zooms[0] as f32,
            zooms[1] as f32,
            zooms[2] as f32,
            1.,
            1.,
            1.,
            1.,
        ],
        ..NiftiHeader::default()
    }
}

/// Write a peak volume to a NIfTI file.
#[allow(dead_code)]
pub fn write_peaks<P: AsRef<Path>>(path: P, data: &Array4<f32>, affine: &Affine4) {
    let header = header_with_affine(affine);
    WriterOptions::new(path.as_ref())
        .reference_header(&header)
        .write_nifti(data)
        .unwrap();
}

/// Write streamlines (RAS+ mm) to a TrackVis file in the given space.
#[allow(dead_code)]
pub fn write_tracks<P: AsRef<Path>>(
    path: P,
    dims: [usize; 3],
    affine: &Affine4,
    streamlines: Vec<Streamline>,
) {
    let header = TrkHeader::with_space(dims, affine);
    Tractogram::new(header, streamlines)
        .write_to_file(path)
        .unwrap();
}

/// Straight streamline from `start`, moving one unit along `axis` per point.
#[allow(dead_code)]
pub fn straight_line(start: [f64; 3], axis: usize, n_points: usize) -> Streamline {
    (0..n_points)
        .map(|i| {
            let mut p = start;
            p[axis] += i as f64;
            Point3::new(p[0], p[1], p[2])
        })
        .collect::<Vec<_>>()
        .into()
}
