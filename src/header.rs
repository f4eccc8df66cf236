//! This module defines the `TrkHeader` struct, which is used
//! to provide important information about TrackVis tractograms.

use crate::affine::{
    aff2axcodes, axcodes2ornt, inv_ornt_aff, ornt_transform, voxel_sizes, Affine4,
};
use crate::error::{Result, TractError};
use crate::util::{c_str_field, is_gz_file, to_c_str_field};
use byteordered::{ByteOrdered, Endianness};
use flate2::bufread::GzDecoder;
use log::warn;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

/// Magic string at the start of every TrackVis file.
pub const MAGIC_CODE_TRK: &[u8; 6] = b"TRACK\0";
/// Size of a TrackVis header in bytes, also stored in its last field.
pub const TRK_HEADER_SIZE: i32 = 1000;
/// Voxel order assumed when the header leaves it blank.
pub const DEFAULT_VOXEL_ORDER: &str = "LPS";

/// The TrackVis header data type.
/// All fields are public and named after the TrackVis file format
/// description. Fixed-size text fields are kept as raw NUL-padded bytes.
///
/// # Example
///
/// ```no_run
/// use tractset::TrkHeader;
/// # use tractset::Result;
///
/// # fn run() -> Result<()> {
/// let hdr = TrkHeader::from_file("tracks.trk")?;
/// println!("{} streamlines in {}", hdr.n_count, hdr.voxel_order_str());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TrkHeader {
    /// Magic string, must be `b"TRACK\0"`
    pub id_string: [u8; 6],
    /// Dimensions of the image volume
    pub dim: [i16; 3],
    /// Voxel size of the image volume
    pub voxel_size: [f32; 3],
    /// Origin of the image volume, unused by TrackVis
    pub origin: [f32; 3],
    /// Number of scalars saved at each track point
    pub n_scalars: i16,
    /// Names of the per-point scalars
    pub scalar_name: [[u8; 20]; 10],
    /// Number of properties saved at each track
    pub n_properties: i16,
    /// Names of the per-track properties
    pub property_name: [[u8; 20]; 10],
    /// Voxel to RAS+ world matrix, row major. Zero in version 1 files.
    pub vox_to_ras: [[f32; 4]; 4],
    /// Reserved space, 444 bytes
    pub reserved: Vec<u8>,
    /// Storing order of the original image data, e.g. `b"LPS\0"`
    pub voxel_order: [u8; 4],
    /// Paddings
    pub pad2: [u8; 4],
    /// Image orientation of the original image, as in DICOM
    pub image_orientation_patient: [f32; 6],
    /// Paddings
    pub pad1: [u8; 2],
    /// Axis inversion flags, used internally by TrackVis
    pub invert_x: u8,
    /// Axis inversion flags, used internally by TrackVis
    pub invert_y: u8,
    /// Axis inversion flags, used internally by TrackVis
    pub invert_z: u8,
    /// Axis swap flags, used internally by TrackVis
    pub swap_xy: u8,
    /// Axis swap flags, used internally by TrackVis
    pub swap_yz: u8,
    /// Axis swap flags, used internally by TrackVis
    pub swap_zx: u8,
    /// Number of tracks stored, 0 if unknown
    pub n_count: i32,
    /// Format version, 1 or 2
    pub version: i32,
    /// Header size, must be 1000
    pub hdr_size: i32,

    /// Original data Endianness
    pub endianness: Endianness,
}

impl Default for TrkHeader {
    fn default() -> TrkHeader {
        TrkHeader {
            id_string: *MAGIC_CODE_TRK,
            dim: [1, 1, 1],
            voxel_size: [1.; 3],
            origin: [0.; 3],
            n_scalars: 0,
            scalar_name: [[0; 20]; 10],
            n_properties: 0,
            property_name: [[0; 20]; 10],
            vox_to_ras: [
                [1., 0., 0., 0.],
                [0., 1., 0., 0.],
                [0., 0., 1., 0.],
                [0., 0., 0., 1.],
            ],
            reserved: vec![0; 444],
            voxel_order: *b"RAS\0",
            pad2: [0; 4],
            image_orientation_patient: [0.; 6],
            pad1: [0; 2],
            invert_x: 0,
            invert_y: 0,
            invert_z: 0,
            swap_xy: 0,
            swap_yz: 0,
            swap_zx: 0,
            n_count: 0,
            version: 2,
            hdr_size: TRK_HEADER_SIZE,

            endianness: Endianness::Little,
        }
    }
}

impl TrkHeader {
    /// Build a header describing the given voxel grid.
    ///
    /// Voxel sizes and voxel order are derived from the affine, so the
    /// resulting header is compatible with a volume of that geometry.
    pub fn with_space(dim: [usize; 3], affine: &Affine4) -> TrkHeader {
        let zooms = voxel_sizes(affine);
        let mut vox_to_ras = [[0.; 4]; 4];
        for (r, row) in vox_to_ras.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = affine[(r, c)] as f32;
            }
        }
        TrkHeader {
            dim: [dim[0] as i16, dim[1] as i16, dim[2] as i16],
            voxel_size: [zooms[0] as f32, zooms[1] as f32, zooms[2] as f32],
            vox_to_ras,
            voxel_order: to_c_str_field(&aff2axcodes(affine)),
            ..TrkHeader::default()
        }
    }

    /// Retrieve a TrackVis header from a file in the file system.
    /// If the file's name ends with ".gz", the file is assumed to need GZip decoding.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<TrkHeader> {
        let gz = is_gz_file(&path);
        let file = BufReader::new(File::open(path)?);
        if gz {
            TrkHeader::from_reader(GzDecoder::new(file))
        } else {
            TrkHeader::from_reader(file)
        }
    }

    /// Read a TrackVis header, along with its byte order, from the given byte stream.
    /// It is assumed that the input is currently at the start of the header.
    pub fn from_reader<S: Read>(mut input: S) -> Result<TrkHeader> {
        let mut raw = [0u8; TRK_HEADER_SIZE as usize];
        input.read_exact(&mut raw)?;
        parse_header(&raw)
    }

    /// Write this header to the given stream, in the header's endianness.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut w = ByteOrdered::runtime(writer, self.endianness);
        w.write_all(&self.id_string)?;
        for v in &self.dim {
            w.write_i16(*v)?;
        }
        for v in self.voxel_size.iter().chain(&self.origin) {
            w.write_f32(*v)?;
        }
        w.write_i16(self.n_scalars)?;
        for name in &self.scalar_name {
            w.write_all(name)?;
        }
        w.write_i16(self.n_properties)?;
        for name in &self.property_name {
            w.write_all(name)?;
        }
        for v in self.vox_to_ras.iter().flatten() {
            w.write_f32(*v)?;
        }
        let mut reserved = self.reserved.clone();
        reserved.resize(444, 0);
        w.write_all(&reserved)?;
        w.write_all(&self.voxel_order)?;
        w.write_all(&self.pad2)?;
        for v in &self.image_orientation_patient {
            w.write_f32(*v)?;
        }
        w.write_all(&self.pad1)?;
        w.write_all(&[
            self.invert_x,
            self.invert_y,
            self.invert_z,
            self.swap_xy,
            self.swap_yz,
            self.swap_zx,
        ])?;
        w.write_i32(self.n_count)?;
        w.write_i32(self.version)?;
        w.write_i32(TRK_HEADER_SIZE)?;
        Ok(())
    }

    /// Dimensions of the image volume the tracks were drawn in.
    pub fn dimensions(&self) -> [usize; 3] {
        [
            self.dim[0].max(0) as usize,
            self.dim[1].max(0) as usize,
            self.dim[2].max(0) as usize,
        ]
    }

    /// Voxel order as text, defaulting to `"LPS"` when left blank.
    pub fn voxel_order_str(&self) -> String {
        let order = c_str_field(&self.voxel_order).trim().to_ascii_uppercase();
        if order.is_empty() {
            DEFAULT_VOXEL_ORDER.to_string()
        } else {
            order
        }
    }

    /// Names of the per-point scalars in use.
    pub fn scalar_names(&self) -> Vec<String> {
        used_names(&self.scalar_name, self.n_scalars)
    }

    /// Names of the per-track properties in use.
    pub fn property_names(&self) -> Vec<String> {
        used_names(&self.property_name, self.n_properties)
    }

    /// The voxel to RAS+ affine.
    ///
    /// Files which did not record it (version 1, or a zero last element)
    /// are assumed to use the identity.
    pub fn affine(&self) -> Affine4 {
        if self.vox_to_ras[3][3] == 0.0 {
            warn!("vox_to_ras was not recorded in the TrackVis header, assuming identity");
            return Affine4::identity();
        }
        let mut affine = Affine4::zeros();
        for (r, row) in self.vox_to_ras.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                affine[(r, c)] = f64::from(*v);
            }
        }
        affine
    }

    /// Affine mapping stored track coordinates (voxmm) to RAS+ millimetres.
    ///
    /// TrackVis stores points scaled by the voxel size with the origin at
    /// the corner of the first voxel, in the header's voxel order. The
    /// points are first brought to voxel centers, then reoriented to the
    /// order of `vox_to_ras`, then mapped to world space.
    pub fn voxmm_to_rasmm(&self) -> Result<Affine4> {
        let mut scale = Affine4::identity();
        for (i, size) in self.voxel_size.iter().enumerate() {
            if *size == 0.0 {
                return Err(TractError::InvalidTrkFormat);
            }
            scale[(i, i)] = 1.0 / f64::from(*size);
        }

        let mut offset = Affine4::identity();
        for i in 0..3 {
            offset[(i, 3)] = -0.5;
        }

        let vox_to_ras = self.affine();
        let header_ornt =
            axcodes2ornt(&self.voxel_order_str()).ok_or(TractError::InvalidTrkFormat)?;
        let affine_ornt =
            axcodes2ornt(&aff2axcodes(&vox_to_ras)).ok_or(TractError::InvalidTrkFormat)?;
        let ornt = ornt_transform(&header_ornt, &affine_ornt).ok_or(TractError::InvalidTrkFormat)?;
        let dims = self.dimensions();
        let reorient = inv_ornt_aff(&ornt, [dims[0] as f64, dims[1] as f64, dims[2] as f64]);

        Ok(vox_to_ras * reorient * offset * scale)
    }
}

fn used_names(names: &[[u8; 20]; 10], count: i16) -> Vec<String> {
    // counts above 10 encode the number of values in the name itself
    let used = count.max(0).min(10) as usize;
    names[..used].iter().map(|n| c_str_field(n)).collect()
}

fn parse_header(raw: &[u8; TRK_HEADER_SIZE as usize]) -> Result<TrkHeader> {
    if &raw[..5] != b"TRACK" {
        return Err(TractError::InvalidTrkFormat);
    }

    // the last field holds the header size, use it to find the byte order
    let mut size_field = [0u8; 4];
    size_field.copy_from_slice(&raw[996..1000]);
    let endianness = if i32::from_le_bytes(size_field) == TRK_HEADER_SIZE {
        Endianness::Little
    } else if i32::from_be_bytes(size_field) == TRK_HEADER_SIZE {
        Endianness::Big
    } else {
        return Err(TractError::InvalidTrkFormat);
    };

    let mut h = TrkHeader {
        endianness,
        ..TrkHeader::default()
    };
    let mut input = ByteOrdered::runtime(&raw[..], endianness);

    input.read_exact(&mut h.id_string)?;
    for v in &mut h.dim {
        *v = input.read_i16()?;
    }
    for v in h.voxel_size.iter_mut().chain(h.origin.iter_mut()) {
        *v = input.read_f32()?;
    }
    h.n_scalars = input.read_i16()?;
    for name in &mut h.scalar_name {
        input.read_exact(name)?;
    }
    h.n_properties = input.read_i16()?;
    for name in &mut h.property_name {
        input.read_exact(name)?;
    }
    for v in h.vox_to_ras.iter_mut().flatten() {
        *v = input.read_f32()?;
    }
    // reserved is a 444-elem vec already
    input.read_exact(h.reserved.as_mut_slice())?;
    input.read_exact(&mut h.voxel_order)?;
    input.read_exact(&mut h.pad2)?;
    for v in &mut h.image_orientation_patient {
        *v = input.read_f32()?;
    }
    input.read_exact(&mut h.pad1)?;
    h.invert_x = input.read_u8()?;
    h.invert_y = input.read_u8()?;
    h.invert_z = input.read_u8()?;
    h.swap_xy = input.read_u8()?;
    h.swap_yz = input.read_u8()?;
    h.swap_zx = input.read_u8()?;
    h.n_count = input.read_i32()?;
    h.version = input.read_i32()?;
    h.hdr_size = input.read_i32()?;

    debug_assert_eq!(h.hdr_size, TRK_HEADER_SIZE);

    if h.version != 1 && h.version != 2 {
        return Err(TractError::UnsupportedTrkVersion(h.version));
    }
    if h.version == 1 {
        // version 1 files have no voxel to world matrix
        h.vox_to_ras = [[0.; 4]; 4];
    }
    Ok(h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Point3, Vector4};

    use crate::affine::apply_affine;

    fn round_trip(header: &TrkHeader) -> TrkHeader {
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), TRK_HEADER_SIZE as usize);
        TrkHeader::from_reader(&buf[..]).unwrap()
    }

    #[test]
    fn default_round_trip() {
        let header = TrkHeader::default();
        assert_eq!(round_trip(&header), header);
    }

    #[test]
    fn big_endian_round_trip() {
        let header = TrkHeader {
            dim: [10, 20, 30],
            voxel_size: [2., 2., 2.5],
            n_count: 42,
            endianness: Endianness::Big,
            ..TrkHeader::default()
        };
        let parsed = round_trip(&header);
        assert_eq!(parsed.endianness, Endianness::Big);
        assert_eq!(parsed, header);
    }

    #[test]
    fn bad_magic() {
        let mut buf = Vec::new();
        TrkHeader::default().write_to(&mut buf).unwrap();
        buf[0] = b'X';
        assert!(matches!(
            TrkHeader::from_reader(&buf[..]),
            Err(TractError::InvalidTrkFormat)
        ));
    }

    #[test]
    fn bad_version() {
        let header = TrkHeader {
            version: 3,
            ..TrkHeader::default()
        };
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert!(matches!(
            TrkHeader::from_reader(&buf[..]),
            Err(TractError::UnsupportedTrkVersion(3))
        ));
    }

    #[test]
    fn truncated_header() {
        let mut buf = Vec::new();
        TrkHeader::default().write_to(&mut buf).unwrap();
        buf.truncate(600);
        assert!(matches!(
            TrkHeader::from_reader(&buf[..]),
            Err(TractError::Io(_))
        ));
    }

    #[test]
    fn names() {
        let mut header = TrkHeader {
            n_scalars: 1,
            ..TrkHeader::default()
        };
        header.scalar_name[0] = to_c_str_field("fa");
        assert_eq!(header.scalar_names(), vec!["fa".to_string()]);
        assert!(header.property_names().is_empty());
    }

    #[test]
    fn blank_voxel_order_is_lps() {
        let header = TrkHeader {
            voxel_order: [0; 4],
            ..TrkHeader::default()
        };
        assert_eq!(header.voxel_order_str(), "LPS");
    }

    #[test]
    fn voxmm_identity_space() {
        let header = TrkHeader::with_space([10, 10, 10], &Affine4::identity());
        assert_eq!(header.voxel_order_str(), "RAS");
        let affine = header.voxmm_to_rasmm().unwrap();
        let p = apply_affine(&affine, &Point3::new(2.5, 3.5, 4.5));
        assert_abs_diff_eq!(p, Point3::new(2.0, 3.0, 4.0), epsilon = 1e-9);
    }

    #[test]
    fn voxmm_scaled_space() {
        let vox_to_ras = Affine4::from_diagonal(&Vector4::new(2.0, 2.0, 2.0, 1.0));
        let header = TrkHeader::with_space([10, 10, 10], &vox_to_ras);
        assert_eq!(header.voxel_size, [2., 2., 2.]);
        let affine = header.voxmm_to_rasmm().unwrap();
        // corner of voxel (1, 1, 1) in voxmm is 2mm, its center 3mm
        let p = apply_affine(&affine, &Point3::new(3.0, 3.0, 3.0));
        assert_abs_diff_eq!(p, Point3::new(2.0, 2.0, 2.0), epsilon = 1e-9);
    }

    #[test]
    #[rustfmt::skip]
    fn voxmm_oblique_space() {
        let vox_to_ras = Affine4::new(
            0.48, -0.59267,  0.6468,  -20.0,
            0.6,  -0.31609, -0.73491,  15.0,
            0.64,  0.74083,  0.20388,  -3.0,
            0.0,   0.0,      0.0,       1.0,
        );
        let header = TrkHeader::with_space([10, 10, 10], &vox_to_ras);
        assert_eq!(header.voxel_order_str(), "SLP");
        let affine = header.voxmm_to_rasmm().unwrap();
        let p = apply_affine(&affine, &Point3::new(3.5, 1.5, 7.5));
        let expected = apply_affine(&vox_to_ras, &Point3::new(3.0, 1.0, 7.0));
        assert_abs_diff_eq!(p, expected, epsilon = 1e-4);
    }

    #[test]
    fn voxmm_reoriented_space() {
        // tracks stored in LAS order, volume affine is RAS
        let mut header = TrkHeader::with_space([10, 10, 10], &Affine4::identity());
        header.voxel_order = *b"LAS\0";
        let affine = header.voxmm_to_rasmm().unwrap();
        let p = apply_affine(&affine, &Point3::new(0.5, 0.5, 0.5));
        assert_abs_diff_eq!(p, Point3::new(9.0, 0.0, 0.0), epsilon = 1e-9);
    }
}
