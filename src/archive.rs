//! Reading and writing sample archives.
//!
//! An archive is a compressed `.npz` file holding two arrays: `inputs`, of
//! shape `(samples, input_dim)` and type `f64`, and `outputs`, of shape
//! `(samples, 3)` and type `f32`.
use crate::error::{Result, TractError};
use ndarray::Array2;
use ndarray_npy::{NpzReader, NpzWriter, ReadableElement};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

/// Name of the input array inside the archive.
pub const INPUTS: &str = "inputs";
/// Name of the output array inside the archive.
pub const OUTPUTS: &str = "outputs";

/// A set of samples, one per row.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    /// Input vectors.
    pub inputs: Array2<f64>,
    /// Target directions.
    pub outputs: Array2<f32>,
}

impl SampleSet {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.inputs.nrows()
    }

    /// Whether the set holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of each input vector.
    pub fn input_dim(&self) -> usize {
        self.inputs.ncols()
    }

    /// Write both arrays into a compressed `.npz` file.
    pub fn write_npz<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        let mut npz = NpzWriter::new_compressed(file);
        npz.add_array(INPUTS, &self.inputs)?;
        npz.add_array(OUTPUTS, &self.outputs)?;
        npz.finish()?.flush()?;
        Ok(())
    }

    /// Read a sample set back from an `.npz` file.
    pub fn read_npz<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut npz = NpzReader::new(BufReader::new(File::open(path)?))?;
        let inputs = read_named(&mut npz, INPUTS)?;
        let outputs = read_named(&mut npz, OUTPUTS)?;
        Ok(SampleSet { inputs, outputs })
    }
}

/// Entries in an `.npz` archive carry a `.npy` suffix; accept either form.
fn read_named<R, A>(npz: &mut NpzReader<R>, name: &str) -> Result<Array2<A>>
where
    R: Read + Seek,
    A: ReadableElement,
{
    let entry = npz
        .names()?
        .into_iter()
        .find(|n| n.trim_end_matches(".npy") == name)
        .ok_or_else(|| TractError::MissingArray(name.to_string()))?;
    Ok(npz.by_name(&entry)?)
}
