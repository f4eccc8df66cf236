//! Supervised-learning samples from diffusion MRI tractography.
//!
//! This crate turns a peak-direction volume (NIfTI-1) and a set of
//! streamlines (TrackVis `.trk`) into fixed-size training samples for
//! next-step direction prediction. Each sample's input is the cubic
//! neighborhood of peaks around a streamline point followed by the `k`
//! previous step directions; its output is the next unit step direction.
//! Samples are written to a compressed `.npz` archive.
//!
//! # Example
//!
//! ```no_run
//! use tractset::{generate_training_data, GeneratorConfig};
//! # use tractset::Result;
//!
//! # fn run() -> Result<()> {
//! let config = GeneratorConfig::new("peaks.nii.gz", "tracks.trk", "train_data")
//!     .with_window_size(5)
//!     .with_history(1)
//!     .with_num_samples(100_000);
//! let report = generate_training_data(&config)?;
//! println!("{} samples", report.samples);
//! # Ok(())
//! # }
//! ```
//!
//! The TrackVis reader and writer are available on their own through
//! [`TrkHeader`] and [`Tractogram`]; streamlines are always handled in
//! RAS+ millimetres.
#![deny(missing_debug_implementations)]
#![warn(missing_docs, unused_extern_crates, trivial_casts, unused_results)]

pub mod affine;
pub mod archive;
pub mod config;
pub mod dataset;
pub mod direction;
pub mod error;
pub mod header;
pub mod neighborhood;
pub mod peaks;
pub mod tractogram;
mod util;

pub use archive::SampleSet;
pub use config::{Alignment, GeneratorConfig, SamplingOptions};
pub use dataset::{generate_samples, generate_training_data, GenerationReport};
pub use error::{Result, TractError};
pub use header::TrkHeader;
pub use neighborhood::extract_cubic_neighborhood;
pub use peaks::PeakVolume;
pub use tractogram::{Streamline, Tractogram};
