//! Unit step directions along a streamline.
use nalgebra::{Point3, Vector3};

/// Normalized direction from one streamline point to the next.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Direction {
    /// Unit vector.
    pub vector: Vector3<f64>,
    /// Index of the point this step starts from.
    pub start: usize,
}

/// Directions between consecutive points.
///
/// Steps between identical points have no direction and are dropped, so
/// the result may hold fewer than `points.len() - 1` entries. The `start`
/// field keeps track of where each surviving step came from.
pub fn step_directions(points: &[Point3<f64>]) -> Vec<Direction> {
    points
        .windows(2)
        .enumerate()
        .filter_map(|(start, pair)| {
            let delta = pair[1] - pair[0];
            let norm = delta.norm();
            if norm == 0.0 {
                None
            } else {
                Some(Direction {
                    vector: delta / norm,
                    start,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn unit_length() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 4.0, 0.0),
            Point3::new(3.0, 4.0, 0.1),
        ];
        let dirs = step_directions(&points);
        assert_eq!(dirs.len(), 2);
        for d in &dirs {
            assert_relative_eq!(d.vector.norm(), 1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(dirs[0].vector, Vector3::new(0.6, 0.8, 0.0), epsilon = 1e-12);
        assert_relative_eq!(dirs[1].vector, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn degenerate_steps_are_dropped() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let dirs = step_directions(&points);
        let starts: Vec<usize> = dirs.iter().map(|d| d.start).collect();
        assert_eq!(starts, vec![0, 2]);
    }

    #[test]
    fn short_streamlines() {
        assert!(step_directions(&[]).is_empty());
        assert!(step_directions(&[Point3::new(1.0, 2.0, 3.0)]).is_empty());
    }
}
