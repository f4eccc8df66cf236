//! Generator configuration.
//!
//! A configuration can be built in code with the `with_*` methods, or read
//! from a TOML document:
//!
//! ```toml
//! peaks_path = "peaks.nii.gz"
//! trk_path = "tracks.trk"
//! output_dir = "train_data"
//! n = 5
//! k = 1
//! num_samples = 100000
//! alignment = "positional"
//! ```
//!
//! Sampling parameters that are left out take their default values.
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How a step direction is paired with a voxel of its streamline.
///
/// Dropping zero-length steps shortens the direction sequence, so after
/// the first degenerate step the direction index and the point index no
/// longer refer to the same place along the streamline.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Direction `i` is sampled at the voxel of point `i`, regardless of
    /// how many degenerate steps came before it.
    Positional,
    /// Direction `i` is sampled at the voxel of the point it starts from.
    Anchored,
}

impl Default for Alignment {
    fn default() -> Self {
        Alignment::Positional
    }
}

/// Parameters of the sample extraction pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingOptions {
    /// Cubic window size `n`. Expected to be odd.
    #[serde(rename = "n", alias = "window_size")]
    pub window_size: usize,
    /// Number `k` of previous directions given as input.
    #[serde(rename = "k", alias = "history")]
    pub history: usize,
    /// Maximum number of samples to generate.
    pub num_samples: usize,
    /// Voxel pairing of step directions.
    pub alignment: Alignment,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        SamplingOptions {
            window_size: 3,
            history: 1,
            num_samples: 1000,
            alignment: Alignment::default(),
        }
    }
}

/// Full configuration of a dataset generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Path to the peak volume (NIfTI-1).
    pub peaks_path: PathBuf,
    /// Path to the tractogram (TrackVis).
    pub trk_path: PathBuf,
    /// Directory receiving the archive. Created if absent.
    pub output_dir: PathBuf,
    /// Sampling parameters.
    #[serde(flatten)]
    pub sampling: SamplingOptions,
}

impl GeneratorConfig {
    /// Create a configuration with default sampling parameters.
    pub fn new<P, Q, R>(peaks_path: P, trk_path: Q, output_dir: R) -> Self
    where
        P: Into<PathBuf>,
        Q: Into<PathBuf>,
        R: Into<PathBuf>,
    {
        GeneratorConfig {
            peaks_path: peaks_path.into(),
            trk_path: trk_path.into(),
            output_dir: output_dir.into(),
            sampling: SamplingOptions::default(),
        }
    }

    /// Set the cubic window size `n`.
    pub fn with_window_size(mut self, n: usize) -> Self {
        self.sampling.window_size = n;
        self
    }

    /// Set the direction history length `k`.
    pub fn with_history(mut self, k: usize) -> Self {
        self.sampling.history = k;
        self
    }

    /// Set the global sample cap.
    pub fn with_num_samples(mut self, num_samples: usize) -> Self {
        self.sampling.num_samples = num_samples;
        self
    }

    /// Set how directions are paired with voxels.
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.sampling.alignment = alignment;
        self
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Path of the archive written by this configuration.
    ///
    /// The file is named `data_<num_samples>_k<n>.npz`: the `k` label is
    /// followed by the window size, not the history length, so that
    /// existing datasets keep their names.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(format!(
            "data_{}_k{}.npz",
            self.sampling.num_samples, self.sampling.window_size
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TractError;

    #[test]
    fn defaults() {
        let config = GeneratorConfig::new("p.nii.gz", "t.trk", "out");
        assert_eq!(config.sampling.window_size, 3);
        assert_eq!(config.sampling.history, 1);
        assert_eq!(config.sampling.num_samples, 1000);
        assert_eq!(config.sampling.alignment, Alignment::Positional);
        assert_eq!(config.output_path(), Path::new("out/data_1000_k3.npz"));
    }

    #[test]
    fn builder() {
        let config = GeneratorConfig::new("p.nii.gz", "t.trk", "out")
            .with_window_size(5)
            .with_history(2)
            .with_num_samples(100_000)
            .with_alignment(Alignment::Anchored);
        assert_eq!(
            config.sampling,
            SamplingOptions {
                window_size: 5,
                history: 2,
                num_samples: 100_000,
                alignment: Alignment::Anchored,
            }
        );
        assert_eq!(config.output_path(), Path::new("out/data_100000_k5.npz"));
    }

    #[test]
    fn from_toml() {
        let config = GeneratorConfig::from_toml_str(
            r#"
            peaks_path = "peaks.nii.gz"
            trk_path = "tracks.trk"
            output_dir = "train_data"
            n = 5
            alignment = "anchored"
            "#,
        )
        .unwrap();
        assert_eq!(config.peaks_path, Path::new("peaks.nii.gz"));
        assert_eq!(config.sampling.window_size, 5);
        assert_eq!(config.sampling.history, 1);
        assert_eq!(config.sampling.num_samples, 1000);
        assert_eq!(config.sampling.alignment, Alignment::Anchored);
    }

    #[test]
    fn missing_paths() {
        let err = GeneratorConfig::from_toml_str("n = 5").unwrap_err();
        assert!(matches!(err, TractError::Config(_)));
    }
}
