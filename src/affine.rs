//! Voxel-to-world affines and orientation helpers.
//!
//! All affines are homogeneous 4x4 matrices in double precision, mapping
//! voxel indices `(i, j, k, 1)` to world coordinates `(x, y, z, 1)`.
//! World space is RAS+: the axes point right, anterior and superior.
use crate::error::{Result, TractError};
use log::warn;
use nalgebra::{Matrix3, Matrix4, Point3, Quaternion, Scalar, Vector3};
use nifti::NiftiHeader;

/// Rotation/zoom/shear part of an affine.
pub type Affine3 = Matrix3<f64>;
/// Full homogeneous affine.
pub type Affine4 = Matrix4<f64>;

const QUATERNION_THRESHOLD: f64 = -::std::f32::EPSILON as f64 * 3.0;

/// Axis labels for the negative and positive directions of each world axis.
const AXIS_LABELS: [(char, char); 3] = [('L', 'R'), ('P', 'A'), ('I', 'S')];

/// Where one voxel axis points in world space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AxisOrientation {
    /// World (or target) axis index, in `0..3`.
    pub axis: usize,
    /// `1.0` when pointing towards the positive end of the axis, `-1.0` otherwise.
    pub flip: f64,
}

/// Orientation of the three voxel axes.
pub type Orientation = [AxisOrientation; 3];

/// Separate a 4x4 affine into its 3x3 affine and translation components.
pub fn get_affine_and_translation<T: Scalar>(affine: &Matrix4<T>) -> (Matrix3<T>, Vector3<T>) {
    let translation = Vector3::new(
        affine[(0, 3)].clone(),
        affine[(1, 3)].clone(),
        affine[(2, 3)].clone(),
    );
    let affine = affine.fixed_view::<3, 3>(0, 0).into_owned();
    (affine, translation)
}

/// Compose a 4x4 affine from a 3x3 affine and a translation.
pub fn from_affine_and_translation(affine: &Affine3, translation: &Vector3<f64>) -> Affine4 {
    let mut out = Affine4::identity();
    out.fixed_view_mut::<3, 3>(0, 0).copy_from(affine);
    out.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
    out
}

/// Obtain the voxel-to-world affine of a NIfTI-1 header.
///
/// The sform is used when its code is set, then the qform. Otherwise the
/// affine is built from the shape and voxel spacing alone, centered on the
/// middle of the image with a flipped x axis.
pub fn header_affine(header: &NiftiHeader) -> Affine4 {
    if header.sform_code != 0 {
        sform_affine(header)
    } else if header.qform_code != 0 {
        qform_affine(header)
    } else {
        shape_zoom_affine(&header.dim[1..4], &header.pixdim[1..4])
    }
}

#[rustfmt::skip]
fn sform_affine(header: &NiftiHeader) -> Affine4 {
    let [x, y, z] = [&header.srow_x, &header.srow_y, &header.srow_z];
    Affine4::new(
        x[0].into(), x[1].into(), x[2].into(), x[3].into(),
        y[0].into(), y[1].into(), y[2].into(), y[3].into(),
        z[0].into(), z[1].into(), z[2].into(), z[3].into(),
        0.0, 0.0, 0.0, 1.0,
    )
}

fn qform_affine(header: &NiftiHeader) -> Affine4 {
    let quaternion = fill_positive(Vector3::new(
        header.quatern_b.into(),
        header.quatern_c.into(),
        header.quatern_d.into(),
    ));
    let rotation = quaternion_to_affine(quaternion);
    let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
    let zooms = Vector3::new(
        f64::from(header.pixdim[1]),
        f64::from(header.pixdim[2]),
        f64::from(header.pixdim[3]) * qfac,
    );
    let translation = Vector3::new(
        header.quatern_x.into(),
        header.quatern_y.into(),
        header.quatern_z.into(),
    );
    from_affine_and_translation(&(rotation * Affine3::from_diagonal(&zooms)), &translation)
}

/// Get affine implied by given shape and zooms.
///
/// We get the translations from the center of the image (implied by `shape`).
/// Missing trailing dimensions count as 1.
#[rustfmt::skip]
pub fn shape_zoom_affine(shape: &[u16], spacing: &[f32]) -> Affine4 {
    let dim = |i: usize| f64::from(shape.get(i).copied().unwrap_or(1).max(1));
    let zoom = |i: usize| f64::from(spacing.get(i).copied().unwrap_or(1.0));
    // Get translations from center of image
    let origin = Vector3::new((dim(0) - 1.0) / 2.0, (dim(1) - 1.0) / 2.0, (dim(2) - 1.0) / 2.0);
    let spacing = [-zoom(0), zoom(1), zoom(2)];
    Affine4::new(
        spacing[0], 0.0, 0.0, -origin[0] * spacing[0],
        0.0, spacing[1], 0.0, -origin[1] * spacing[1],
        0.0, 0.0, spacing[2], -origin[2] * spacing[2],
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Compute unit quaternion from last 3 values.
///
/// If w, x, y, z are the values in the full quaternion, assumes w is positive.
/// w = 0.0 corresponds to a 180 degree rotation.
///
/// `1.0 - (x*x + y*y + z*z)` can be slightly negative because the header
/// stores single precision values; small excursions are clamped to zero.
pub fn fill_positive(xyz: Vector3<f64>) -> Quaternion<f64> {
    let w2 = 1.0 - xyz.dot(&xyz);
    let w = if w2 < 0.0 {
        if w2 < QUATERNION_THRESHOLD {
            warn!("quaternion (b, c, d) is not normalized: 1 - |bcd|^2 = {}", w2);
        }
        0.0
    } else {
        w2.sqrt()
    };
    Quaternion::new(w, xyz.x, xyz.y, xyz.z)
}

/// Calculate rotation matrix corresponding to quaternion.
///
/// Rotation matrix applies to column vectors, and is applied to the left of coordinate vectors.
/// The algorithm here allows non-unit quaternions.
///
/// Algorithm from https://en.wikipedia.org/wiki/Rotation_matrix#Quaternion
pub fn quaternion_to_affine(q: Quaternion<f64>) -> Affine3 {
    let nq = q.w * q.w + q.i * q.i + q.j * q.j + q.k * q.k;
    if nq < ::std::f64::EPSILON {
        return Affine3::identity();
    }
    let s = 2.0 / nq;
    let x = q.i * s;
    let y = q.j * s;
    let z = q.k * s;
    let wx = q.w * x;
    let wy = q.w * y;
    let wz = q.w * z;
    let xx = q.i * x;
    let xy = q.i * y;
    let xz = q.i * z;
    let yy = q.j * y;
    let yz = q.j * z;
    let zz = q.k * z;
    Affine3::new(
        1.0 - (yy + zz), xy - wz, xz + wy,
        xy + wz, 1.0 - (xx + zz), yz - wx,
        xz - wy, yz + wx, 1.0 - (xx + yy),
    )
}

/// Invert an affine, failing if it is singular.
pub fn invert(affine: &Affine4) -> Result<Affine4> {
    affine.try_inverse().ok_or(TractError::SingularAffine)
}

/// Apply an affine to a single 3-D point.
pub fn apply_affine(affine: &Affine4, point: &Point3<f64>) -> Point3<f64> {
    let (rzs, translation) = get_affine_and_translation(affine);
    Point3::from(rzs * point.coords + translation)
}

/// Round continuous voxel coordinates to the nearest voxel index.
///
/// Ties are resolved to the even neighbour, so `2.5` maps to `2` and `3.5`
/// to `4`.
pub fn round_to_voxel(point: &Point3<f64>) -> [i64; 3] {
    [
        point.x.round_ties_even() as i64,
        point.y.round_ties_even() as i64,
        point.z.round_ties_even() as i64,
    ]
}

/// Voxel sizes implied by an affine (norms of its first three columns).
pub fn voxel_sizes(affine: &Affine4) -> Vector3<f64> {
    let (rzs, _) = get_affine_and_translation(affine);
    Vector3::new(
        rzs.column(0).norm(),
        rzs.column(1).norm(),
        rzs.column(2).norm(),
    )
}

/// Orientation of the voxel axes of an affine.
///
/// The zoom-normalized rotation part is first replaced by its closest
/// orthogonal matrix (through an SVD, ignoring near-zero singular values).
/// Voxel axes are then visited in order, each one taking the world axis of
/// its largest remaining component, which is then unavailable to the
/// following axes. Axes with a zero column keep their own direction.
pub fn io_orientation(affine: &Affine4) -> Orientation {
    let (mut rzs, _) = get_affine_and_translation(affine);
    let zooms = voxel_sizes(affine);
    for (mut column, zoom) in rzs.column_iter_mut().zip(zooms.iter()) {
        if *zoom > 0.0 {
            column /= *zoom;
        }
    }
    let mut rotation = closest_orthogonal(rzs);

    let mut ornt = [
        AxisOrientation { axis: 0, flip: 1.0 },
        AxisOrientation { axis: 1, flip: 1.0 },
        AxisOrientation { axis: 2, flip: 1.0 },
    ];
    for (in_axis, slot) in ornt.iter_mut().enumerate() {
        let column = rotation.column(in_axis);
        if column.iter().all(|v| v.abs() <= 1e-8) {
            continue;
        }
        let out_axis = column.iamax();
        let value = column[out_axis];
        *slot = AxisOrientation {
            axis: out_axis,
            flip: if value < 0.0 { -1.0 } else { 1.0 },
        };
        rotation.row_mut(out_axis).fill(0.0);
    }
    ornt
}

/// `U·Vᵀ` from the SVD of `m`, keeping only significant singular values.
fn closest_orthogonal(m: Affine3) -> Affine3 {
    let svd = m.svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return m,
    };
    let s = svd.singular_values;
    let tol = s.max() * 3.0 * f64::EPSILON;
    let mut r = Affine3::zeros();
    for i in (0..3).filter(|&i| s[i] > tol) {
        r += u.column(i) * v_t.row(i);
    }
    r
}

/// Axis codes (such as `"RAS"` or `"LPS"`) of an affine.
pub fn aff2axcodes(affine: &Affine4) -> String {
    ornt2axcodes(&io_orientation(affine))
}

/// Axis codes of an orientation.
pub fn ornt2axcodes(ornt: &Orientation) -> String {
    ornt.iter()
        .map(|o| {
            let (neg, pos) = AXIS_LABELS[o.axis];
            if o.flip < 0.0 {
                neg
            } else {
                pos
            }
        })
        .collect()
}

/// Parse axis codes into an orientation. Case insensitive.
///
/// Returns `None` unless the codes name each world axis exactly once.
pub fn axcodes2ornt(codes: &str) -> Option<Orientation> {
    let codes: Vec<char> = codes.trim().chars().map(|c| c.to_ascii_uppercase()).collect();
    if codes.len() != 3 {
        return None;
    }
    let mut ornt = [AxisOrientation { axis: 0, flip: 1.0 }; 3];
    let mut seen = [false; 3];
    for (slot, code) in ornt.iter_mut().zip(codes) {
        let (axis, flip) = AXIS_LABELS.iter().enumerate().find_map(|(axis, &(neg, pos))| {
            if code == neg {
                Some((axis, -1.0))
            } else if code == pos {
                Some((axis, 1.0))
            } else {
                None
            }
        })?;
        if seen[axis] {
            return None;
        }
        seen[axis] = true;
        *slot = AxisOrientation { axis, flip };
    }
    Some(ornt)
}

/// Orientation transform taking an array in `start` orientation to `end`.
pub fn ornt_transform(start: &Orientation, end: &Orientation) -> Option<Orientation> {
    let mut result = [AxisOrientation { axis: 0, flip: 1.0 }; 3];
    for (end_in, end_o) in end.iter().enumerate() {
        let (start_in, start_o) = start.iter().enumerate().find(|(_, s)| s.axis == end_o.axis)?;
        result[start_in] = AxisOrientation {
            axis: end_in,
            flip: if start_o.flip == end_o.flip { 1.0 } else { -1.0 },
        };
    }
    Some(result)
}

/// Affine that undoes the reorientation `ornt` applied to an array of `shape`.
///
/// The transpose is undone first, then the flips about the array center.
pub fn inv_ornt_aff(ornt: &Orientation, shape: [f64; 3]) -> Affine4 {
    let mut undo_reorder = Affine4::zeros();
    for (row, o) in ornt.iter().enumerate() {
        undo_reorder[(row, o.axis)] = 1.0;
    }
    undo_reorder[(3, 3)] = 1.0;

    let mut undo_flip = Affine4::identity();
    for (i, o) in ornt.iter().enumerate() {
        let center = -(shape[i] - 1.0) / 2.0;
        undo_flip[(i, i)] = o.flip;
        undo_flip[(i, 3)] = o.flip * center - center;
    }
    undo_flip * undo_reorder
}
