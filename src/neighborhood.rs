//! Cubic neighborhoods around a voxel.
use ndarray::{s, ArrayBase, ArrayView4, Data, Ix4};

/// Width of the window actually extracted for a requested size `n`.
///
/// Odd sizes are kept as is; an even `n` spans `n / 2` voxels on each side
/// of the center, so the window is `n + 1` wide.
pub fn window_width(n: usize) -> usize {
    2 * (n / 2) + 1
}

/// Number of values in a flattened neighborhood of size `n`.
pub fn neighborhood_len(n: usize, channels: usize) -> usize {
    window_width(n).pow(3) * channels
}

/// Extract the cubic neighborhood of size `n` centered on a voxel.
///
/// Returns a view of shape `(w, w, w, channels)` with `w = window_width(n)`,
/// or `None` if the window would reach outside the volume along any of
/// the three spatial axes. Windows are never clamped.
pub fn extract_cubic_neighborhood<S>(
    center: [i64; 3],
    volume: &ArrayBase<S, Ix4>,
    n: usize,
) -> Option<ArrayView4<'_, S::Elem>>
where
    S: Data,
{
    let offset = (n / 2) as i64;
    let shape = volume.shape();
    let mut bounds = [(0usize, 0usize); 3];
    for (axis, bound) in bounds.iter_mut().enumerate() {
        // far away centers overflow, which is just another way of being outside
        let start = center[axis].checked_sub(offset)?;
        let end = center[axis].checked_add(offset + 1)?;
        if start < 0 || end > shape[axis] as i64 {
            return None;
        }
        *bound = (start as usize, end as usize);
    }
    let [x, y, z] = bounds;
    Some(volume.slice(s![x.0..x.1, y.0..y.1, z.0..z.1, ..]))
}
