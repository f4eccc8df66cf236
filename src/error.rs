//! Types for error handling go here.
use ndarray::ShapeError;
use ndarray_npy::{ReadNpzError, WriteNpzError};
use nifti::NiftiError;
use quick_error::quick_error;
use std::io::Error as IOError;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    #[non_exhaustive]
    pub enum TractError {
        /// An invalid TrackVis file was parsed.
        /// This is detected when reading the magic string or the header size.
        InvalidTrkFormat {
            display("Invalid TrackVis file")
        }
        /// The TrackVis file declares a version this crate cannot read.
        UnsupportedTrkVersion(version: i32) {
            display("Unsupported TrackVis version {}", version)
        }
        /// A streamline record declares a negative number of points.
        InvalidPointCount(count: i32) {
            display("Invalid streamline point count {}", count)
        }
        /// The peak image is neither 3-D nor 4-D.
        UnexpectedDimensionality(ndim: usize) {
            display("Expected a 3-D or 4-D peak volume, got {} dimensions", ndim)
        }
        /// The voxel-to-world affine cannot be inverted.
        SingularAffine {
            display("Voxel-to-world affine is not invertible")
        }
        /// The tractogram header does not describe the same space as the reference volume.
        ReferenceMismatch(field: &'static str) {
            display("Tractogram header does not match the reference volume ({})", field)
        }
        /// A named array is missing from an `.npz` archive.
        MissingArray(name: String) {
            display("Array `{}` not found in archive", name)
        }
        /// Failed to read the peak image.
        Nifti(err: NiftiError) {
            from()
            source(err)
            display("NIfTI error: {}", err)
        }
        /// Failed to write the sample archive.
        NpzWrite(err: WriteNpzError) {
            from()
            source(err)
            display("Failed to write archive: {}", err)
        }
        /// Failed to read a sample archive.
        NpzRead(err: ReadNpzError) {
            from()
            source(err)
            display("Failed to read archive: {}", err)
        }
        /// Sample buffers could not be shaped into arrays.
        Shape(err: ShapeError) {
            from()
            source(err)
            display("Array shape error: {}", err)
        }
        /// Malformed configuration file.
        Config(err: toml::de::Error) {
            from()
            source(err)
            display("Invalid configuration: {}", err)
        }
        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
            display("I/O error: {}", err)
        }
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, TractError>;
