//! Training sample generation.
//!
//! Each sample pairs the local context of a streamline step with the step
//! itself. The input is the cubic neighborhood of peaks around the current
//! voxel, flattened in `(x, y, z, channel)` order, followed by the `k`
//! previous step directions. The output is the unit direction of the
//! current step.
//!
//! Steps whose neighborhood would cross the volume border are skipped, as
//! are zero-length steps. Neither is an error.

use crate::affine::{apply_affine, round_to_voxel};
use crate::archive::SampleSet;
use crate::config::{Alignment, GeneratorConfig, SamplingOptions};
use crate::direction::{step_directions, Direction};
use crate::error::Result;
use crate::neighborhood::{extract_cubic_neighborhood, neighborhood_len, window_width};
use crate::peaks::PeakVolume;
use crate::tractogram::{Streamline, Tractogram};
use log::{debug, info, warn};
use nalgebra::Vector3;
use ndarray::Array2;
use std::fs;

/// Counters describing a generation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GenerationReport {
    /// Samples produced.
    pub samples: usize,
    /// Streamlines looked at before the sample cap was reached.
    pub streamlines_visited: usize,
    /// Zero-length steps dropped from the visited streamlines.
    pub degenerate_steps: usize,
    /// Steps skipped because their neighborhood crossed the volume border.
    pub out_of_bounds: usize,
}

/// Append-only storage for samples, one flat buffer per array.
#[derive(Debug)]
struct SampleBuffer {
    input_dim: usize,
    capacity: usize,
    count: usize,
    inputs: Vec<f64>,
    outputs: Vec<f32>,
}

impl SampleBuffer {
    fn new(input_dim: usize, capacity: usize) -> Self {
        SampleBuffer {
            input_dim,
            capacity,
            count: 0,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.count >= self.capacity
    }

    fn push<I>(&mut self, neighborhood: I, history: &[Direction], target: &Vector3<f64>)
    where
        I: IntoIterator<Item = f64>,
    {
        self.inputs.extend(neighborhood);
        for d in history {
            self.inputs.extend(d.vector.iter());
        }
        self.outputs.extend(target.iter().map(|&v| v as f32));
        self.count += 1;
        debug_assert_eq!(self.inputs.len(), self.count * self.input_dim);
    }

    fn into_sample_set(self) -> Result<SampleSet> {
        let inputs = Array2::from_shape_vec((self.count, self.input_dim), self.inputs)?;
        let outputs = Array2::from_shape_vec((self.count, 3), self.outputs)?;
        Ok(SampleSet { inputs, outputs })
    }
}

/// Length of the input vectors produced for the given volume and options.
pub fn input_dim(channels: usize, options: &SamplingOptions) -> usize {
    neighborhood_len(options.window_size, channels) + 3 * options.history
}

/// Build samples from streamlines in the space of a peak volume.
///
/// Streamlines are visited in order until `num_samples` samples exist.
/// Points are mapped to voxel indices through the inverse of the volume's
/// affine, rounding halfway cases to even.
pub fn generate_samples(
    peaks: &PeakVolume,
    streamlines: &[Streamline],
    options: &SamplingOptions,
) -> Result<(SampleSet, GenerationReport)> {
    let n = options.window_size;
    let k = options.history;
    if n % 2 == 0 {
        warn!(
            "window size {} is even, neighborhoods will be {} voxels wide",
            n,
            window_width(n)
        );
    }

    let inverse = peaks.inverse_affine()?;
    let mut buffer = SampleBuffer::new(input_dim(peaks.channels(), options), options.num_samples);
    let mut report = GenerationReport::default();

    for streamline in streamlines {
        if buffer.is_full() {
            break;
        }
        report.streamlines_visited += 1;

        let voxels: Vec<[i64; 3]> = streamline
            .points
            .iter()
            .map(|p| round_to_voxel(&apply_affine(&inverse, p)))
            .collect();
        let directions = step_directions(&streamline.points);
        report.degenerate_steps += streamline.len().saturating_sub(1) - directions.len();

        for i in k..directions.len() {
            if buffer.is_full() {
                break;
            }
            let voxel = match options.alignment {
                Alignment::Positional => voxels[i],
                Alignment::Anchored => voxels[directions[i].start],
            };
            let neighborhood = match extract_cubic_neighborhood(voxel, peaks.data(), n) {
                Some(block) => block,
                None => {
                    report.out_of_bounds += 1;
                    continue;
                }
            };
            buffer.push(
                neighborhood.iter().copied(),
                &directions[i - k..i],
                &directions[i].vector,
            );
        }
    }

    report.samples = buffer.count;
    debug!("{:?}", report);
    Ok((buffer.into_sample_set()?, report))
}

/// Run a complete generation pass and write the archive.
///
/// Loads the peak volume and the tractogram, checks that they share the
/// same space, generates samples and writes them to
/// [`GeneratorConfig::output_path`], creating the output directory if
/// needed.
pub fn generate_training_data(config: &GeneratorConfig) -> Result<GenerationReport> {
    info!("Reading peaks from {}", config.peaks_path.display());
    let peaks = PeakVolume::from_file(&config.peaks_path)?;
    info!("Reading streamlines from {}", config.trk_path.display());
    let tractogram = Tractogram::from_file(&config.trk_path)?;
    tractogram.check_reference(peaks.dims(), peaks.zooms(), peaks.affine())?;

    let (samples, report) = generate_samples(&peaks, tractogram.streamlines(), &config.sampling)?;

    fs::create_dir_all(&config.output_dir)?;
    let path = config.output_path();
    samples.write_npz(&path)?;
    info!(
        "Wrote {} samples of dimension {} to {}",
        samples.len(),
        samples.input_dim(),
        path.display()
    );
    Ok(report)
}
