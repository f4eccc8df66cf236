//! The peak volume: per-voxel fiber orientation estimates on a 3-D grid.
use crate::affine::{header_affine, invert, voxel_sizes, Affine4};
use crate::error::{Result, TractError};
use log::debug;
use nalgebra::Vector3;
use ndarray::{Array4, Axis, Ix4};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use std::path::Path;

/// A 4-D peak volume `(x, y, z, channel)` and its voxel-to-world affine.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakVolume {
    data: Array4<f64>,
    affine: Affine4,
    zooms: Vector3<f64>,
}

impl PeakVolume {
    /// Wrap an array and its affine. Voxel sizes are taken from the affine.
    pub fn new(data: Array4<f64>, affine: Affine4) -> Self {
        let zooms = voxel_sizes(&affine);
        PeakVolume {
            data,
            affine,
            zooms,
        }
    }

    /// Read a peak volume from a NIfTI-1 file (`.nii` or `.nii.gz`).
    ///
    /// Values are scaled by the header's slope and intercept. A 3-D image is
    /// read as a volume with a single channel.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let obj = ReaderOptions::new().read_file(path)?;
        let header = obj.header().clone();
        let data = obj.into_volume().into_ndarray::<f64>()?;
        let data = match data.ndim() {
            3 => data.insert_axis(Axis(3)),
            4 => data,
            n => return Err(TractError::UnexpectedDimensionality(n)),
        };
        let data = data.into_dimensionality::<Ix4>()?;
        debug!("peak volume of shape {:?}", data.shape());

        let zooms = Vector3::new(
            f64::from(header.pixdim[1]),
            f64::from(header.pixdim[2]),
            f64::from(header.pixdim[3]),
        );
        Ok(PeakVolume {
            data,
            affine: header_affine(&header),
            zooms,
        })
    }

    /// The voxel data.
    pub fn data(&self) -> &Array4<f64> {
        &self.data
    }

    /// The voxel-to-world affine.
    pub fn affine(&self) -> &Affine4 {
        &self.affine
    }

    /// The world-to-voxel affine.
    pub fn inverse_affine(&self) -> Result<Affine4> {
        invert(&self.affine)
    }

    /// Voxel sizes along the three spatial axes.
    pub fn zooms(&self) -> &Vector3<f64> {
        &self.zooms
    }

    /// Spatial dimensions.
    pub fn dims(&self) -> [usize; 3] {
        let s = self.data.shape();
        [s[0], s[1], s[2]]
    }

    /// Number of values per voxel.
    pub fn channels(&self) -> usize {
        self.data.shape()[3]
    }
}
