//! Module for reading and writing complete TrackVis tractograms.
//!
//! Streamlines are always exposed in RAS+ millimetres. The conversion from
//! and to the voxmm space in which TrackVis stores points happens on read
//! and on write, using the affine implied by the header.

use crate::affine::{aff2axcodes, apply_affine, invert, Affine4};
use crate::error::{Result, TractError};
use crate::header::TrkHeader;
use crate::util::is_gz_file;
use byteordered::ByteOrdered;
use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;
use nalgebra::{Point3, Vector3};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAX_PREALLOCATED_POINTS: usize = 1 << 16;

/// A single streamline, with its optional per-point and per-track data.
#[derive(Debug, Clone, PartialEq)]
pub struct Streamline {
    /// Ordered points in RAS+ millimetres.
    pub points: Vec<Point3<f64>>,
    /// Per-point scalars, `n_scalars` values per point in point order.
    pub scalars: Vec<f32>,
    /// Per-track properties, `n_properties` values.
    pub properties: Vec<f32>,
}

impl Streamline {
    /// Create a streamline with no scalars or properties.
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Streamline {
            points,
            scalars: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the streamline has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl From<Vec<Point3<f64>>> for Streamline {
    fn from(points: Vec<Point3<f64>>) -> Self {
        Streamline::new(points)
    }
}

/// Data type for a TrackVis tractogram fully contained in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Tractogram {
    header: TrkHeader,
    streamlines: Vec<Streamline>,
}

impl Tractogram {
    /// Gather a header and streamlines (in RAS+ mm) into a tractogram.
    /// The header's track count is updated to match.
    pub fn new(mut header: TrkHeader, streamlines: Vec<Streamline>) -> Self {
        header.n_count = streamlines.len() as i32;
        Tractogram {
            header,
            streamlines,
        }
    }

    /// Retrieve the full contents of a TrackVis file.
    /// If the file's name ends with ".gz", the file is assumed to need GZip decoding.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tractset::Tractogram;
    /// # use tractset::Result;
    ///
    /// # fn run() -> Result<()> {
    /// let trk = Tractogram::from_file("tracks.trk")?;
    /// for streamline in trk.streamlines() {
    ///     println!("{} points", streamline.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Tractogram> {
        let gz = is_gz_file(&path);
        let file = BufReader::new(File::open(path)?);
        if gz {
            Tractogram::from_reader(GzDecoder::new(file))
        } else {
            Tractogram::from_reader(file)
        }
    }

    /// Retrieve a tractogram from a stream of data, starting at the header.
    pub fn from_reader<R: Read>(mut source: R) -> Result<Tractogram> {
        let header = TrkHeader::from_reader(&mut source)?;
        let to_rasmm = header.voxmm_to_rasmm()?;
        let streamlines = read_streamlines(source, &header, &to_rasmm)?;
        debug!(
            "read {} streamlines ({} declared)",
            streamlines.len(),
            header.n_count
        );
        Ok(Tractogram {
            header,
            streamlines,
        })
    }

    /// Write the tractogram to a file.
    /// If the file's name ends with ".gz", the output is GZip encoded.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let gz = is_gz_file(&path);
        let writer = BufWriter::new(File::create(path)?);
        if gz {
            let mut e = GzEncoder::new(writer, Compression::default());
            self.write_to(&mut e)?;
            let _ = e.finish()?;
        } else {
            let mut writer = writer;
            self.write_to(&mut writer)?;
            writer.flush()?;
        }
        Ok(())
    }

    /// Write the header and all streamlines to the given stream.
    ///
    /// Every streamline must carry `n_scalars` values per point and
    /// `n_properties` values, as declared by the header; missing values
    /// are written as zeros.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let header = TrkHeader {
            n_count: self.streamlines.len() as i32,
            ..self.header.clone()
        };
        header.write_to(&mut writer)?;

        let to_voxmm = invert(&header.voxmm_to_rasmm()?)?;
        let n_scalars = header.n_scalars.max(0) as usize;
        let n_properties = header.n_properties.max(0) as usize;
        let mut w = ByteOrdered::runtime(writer, header.endianness);
        for streamline in &self.streamlines {
            w.write_i32(streamline.points.len() as i32)?;
            for (i, point) in streamline.points.iter().enumerate() {
                let p = apply_affine(&to_voxmm, point);
                for v in p.iter() {
                    w.write_f32(*v as f32)?;
                }
                for s in 0..n_scalars {
                    let value = streamline.scalars.get(i * n_scalars + s).copied();
                    w.write_f32(value.unwrap_or(0.))?;
                }
            }
            for p in 0..n_properties {
                w.write_f32(streamline.properties.get(p).copied().unwrap_or(0.))?;
            }
        }
        Ok(())
    }

    /// Obtain a reference to the TrackVis header.
    pub fn header(&self) -> &TrkHeader {
        &self.header
    }

    /// Obtain a reference to the streamlines.
    pub fn streamlines(&self) -> &[Streamline] {
        &self.streamlines
    }

    /// Move the streamlines out of the tractogram, discarding the header.
    pub fn into_streamlines(self) -> Vec<Streamline> {
        self.streamlines
    }

    /// Check that this tractogram was drawn in the space of a reference volume.
    ///
    /// The voxel-to-world affines must agree up to a relative tolerance of
    /// 1e-3, the dimensions must be equal, the voxel sizes must agree up to
    /// 1e-5 and the voxel orders must match.
    pub fn check_reference(
        &self,
        dims: [usize; 3],
        zooms: &Vector3<f64>,
        affine: &Affine4,
    ) -> Result<()> {
        let trk_affine = self.header.affine();
        if !allclose(trk_affine.iter(), affine.iter(), 1e-3) {
            return Err(TractError::ReferenceMismatch("affine"));
        }
        if self.header.dimensions() != dims {
            return Err(TractError::ReferenceMismatch("dimensions"));
        }
        let trk_zooms = self.header.voxel_size.iter().map(|v| f64::from(*v));
        let trk_zooms: Vec<f64> = trk_zooms.collect();
        if !allclose(trk_zooms.iter(), zooms.iter(), 1e-5) {
            return Err(TractError::ReferenceMismatch("voxel sizes"));
        }
        if self.header.voxel_order_str() != aff2axcodes(affine) {
            return Err(TractError::ReferenceMismatch("voxel order"));
        }
        Ok(())
    }
}

/// Element-wise `|a - b| <= 1e-8 + rtol * |b|`.
fn allclose<'a, I, J>(a: I, b: J, rtol: f64) -> bool
where
    I: IntoIterator<Item = &'a f64>,
    J: IntoIterator<Item = &'a f64>,
{
    a.into_iter()
        .zip(b)
        .all(|(a, b)| (a - b).abs() <= 1e-8 + rtol * b.abs())
}

fn read_streamlines<R: Read>(
    source: R,
    header: &TrkHeader,
    to_rasmm: &Affine4,
) -> Result<Vec<Streamline>> {
    let n_scalars = header.n_scalars.max(0) as usize;
    let n_properties = header.n_properties.max(0) as usize;
    let mut input = ByteOrdered::runtime(source, header.endianness);
    let mut streamlines = Vec::new();

    loop {
        if header.n_count > 0 && streamlines.len() == header.n_count as usize {
            break;
        }
        let n_points = match input.read_i32() {
            Ok(n) => n,
            // without a declared count, tracks run until the end of the file
            Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof && header.n_count <= 0 => {
                break
            }
            Err(e) => return Err(e.into()),
        };
        if n_points < 0 {
            return Err(TractError::InvalidPointCount(n_points));
        }

        let n_points = n_points as usize;
        // counts come from the file, do not trust them for allocation
        let mut points = Vec::with_capacity(n_points.min(MAX_PREALLOCATED_POINTS));
        let mut scalars = Vec::with_capacity(n_points.min(MAX_PREALLOCATED_POINTS) * n_scalars);
        for _ in 0..n_points {
            let x = input.read_f32()?;
            let y = input.read_f32()?;
            let z = input.read_f32()?;
            let voxmm = Point3::new(f64::from(x), f64::from(y), f64::from(z));
            points.push(apply_affine(to_rasmm, &voxmm));
            for _ in 0..n_scalars {
                scalars.push(input.read_f32()?);
            }
        }
        let mut properties = Vec::with_capacity(n_properties);
        for _ in 0..n_properties {
            properties.push(input.read_f32()?);
        }

        streamlines.push(Streamline {
            points,
            scalars,
            properties,
        });
    }

    Ok(streamlines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn line(n: usize) -> Streamline {
        (0..n)
            .map(|i| Point3::new(2.0 + i as f64, 5.0, 5.0))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn in_memory_round_trip() {
        let header = TrkHeader::with_space([10, 10, 10], &Affine4::identity());
        let trk = Tractogram::new(header, vec![line(5), line(2)]);
        let mut buf = Vec::new();
        trk.write_to(&mut buf).unwrap();

        let read = Tractogram::from_reader(&buf[..]).unwrap();
        assert_eq!(read.header().n_count, 2);
        assert_eq!(read.streamlines().len(), 2);
        for (a, b) in read.streamlines().iter().zip(trk.streamlines()) {
            assert_eq!(a.len(), b.len());
            for (p, q) in a.points.iter().zip(&b.points) {
                assert_abs_diff_eq!(p, q, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn unknown_count_reads_to_end() {
        let header = TrkHeader::with_space([10, 10, 10], &Affine4::identity());
        let trk = Tractogram::new(header, vec![line(3), line(4), line(5)]);
        let mut buf = Vec::new();
        trk.write_to(&mut buf).unwrap();
        // zero out n_count (little endian, bytes 988..992)
        for b in &mut buf[988..992] {
            *b = 0;
        }
        let read = Tractogram::from_reader(&buf[..]).unwrap();
        assert_eq!(read.header().n_count, 0);
        let lengths: Vec<usize> = read.streamlines().iter().map(Streamline::len).collect();
        assert_eq!(lengths, vec![3, 4, 5]);
    }

    #[test]
    fn truncated_body_is_an_error() {
        let header = TrkHeader::with_space([10, 10, 10], &Affine4::identity());
        let trk = Tractogram::new(header, vec![line(3), line(4)]);
        let mut buf = Vec::new();
        trk.write_to(&mut buf).unwrap();
        let _ = buf.split_off(buf.len() - 6);
        assert!(matches!(
            Tractogram::from_reader(&buf[..]),
            Err(TractError::Io(_))
        ));
    }

    #[test]
    fn scalars_and_properties() {
        let mut header = TrkHeader::with_space([10, 10, 10], &Affine4::identity());
        header.n_scalars = 2;
        header.n_properties = 1;
        let mut streamline = line(3);
        streamline.scalars = vec![1., 2., 3., 4., 5., 6.];
        streamline.properties = vec![7.];
        let trk = Tractogram::new(header, vec![streamline]);
        let mut buf = Vec::new();
        trk.write_to(&mut buf).unwrap();

        let read = Tractogram::from_reader(&buf[..]).unwrap();
        let s = &read.streamlines()[0];
        assert_eq!(s.scalars, vec![1., 2., 3., 4., 5., 6.]);
        assert_eq!(s.properties, vec![7.]);
    }

    #[test]
    fn reference_checks() {
        let header = TrkHeader::with_space([10, 10, 10], &Affine4::identity());
        let trk = Tractogram::new(header, vec![]);
        let zooms = Vector3::new(1.0, 1.0, 1.0);
        let identity = Affine4::identity();
        trk.check_reference([10, 10, 10], &zooms, &identity).unwrap();

        assert!(matches!(
            trk.check_reference([10, 10, 11], &zooms, &identity),
            Err(TractError::ReferenceMismatch("dimensions"))
        ));
        assert!(matches!(
            trk.check_reference([10, 10, 10], &Vector3::new(1.0, 1.0, 2.0), &identity),
            Err(TractError::ReferenceMismatch("voxel sizes"))
        ));
        let mut shifted = identity;
        shifted[(0, 3)] = 4.0;
        assert!(matches!(
            trk.check_reference([10, 10, 10], &zooms, &shifted),
            Err(TractError::ReferenceMismatch("affine"))
        ));
    }
}
