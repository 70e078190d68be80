//! Collision-avoiding placement inside the working area

use nalgebra::Vector3;
use rand::Rng;

/// Occupied sphere of an already placed shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub position: [f64; 3],
    /// `min_distance * max(scale)`
    pub clearance: f64,
}

/// `true` when `candidate` keeps its distance from every footprint.
///
/// Rejects when the centroid distance is below the sum of both clearances; exactly the
/// sum is accepted.
pub fn check_min_distance(candidate: &[f64; 3], clearance: f64, placed: &[Footprint]) -> bool {
    let candidate = Vector3::from(*candidate);
    placed.iter().all(|other| {
        let distance = (Vector3::from(other.position) - candidate).norm();
        distance >= other.clearance + clearance
    })
}

/// Draws up to `max_attempts` positions in `[lo, hi]` per axis until one passes
/// [`check_min_distance`].
///
/// `snap_height` replaces the drawn z (distance from the shape origin down to its
/// surface, so the shape rests on the ground plane).
pub fn try_shape_placement<R: Rng>(
    rng: &mut R,
    bounds: (f64, f64),
    clearance: f64,
    snap_height: Option<f64>,
    placed: &[Footprint],
    max_attempts: u32,
) -> Option<[f64; 3]> {
    let (lo, hi) = bounds;
    for _ in 0..max_attempts {
        let mut candidate = [rng.gen_range(lo..=hi), rng.gen_range(lo..=hi), rng.gen_range(lo..=hi)];
        if let Some(z) = snap_height {
            candidate[2] = z;
        }
        if check_min_distance(&candidate, clearance, placed) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_boundary_is_accepted() {
        let placed = [Footprint { position: [0.0, 0.0, 0.0], clearance: 1.0 }];
        // exactly 1 + 1 apart
        assert!(check_min_distance(&[2.0, 0.0, 0.0], 1.0, &placed));
        assert!(!check_min_distance(&[1.999, 0.0, 0.0], 1.0, &placed));
        assert!(check_min_distance(&[0.0, 0.0, 0.0], 1.0, &[]));
    }

    #[test]
    fn test_placement_respects_bounds_and_snap() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..50 {
            let pos = try_shape_placement(&mut rng, (-0.9, 0.9), 0.1, Some(0.25), &[], 50).unwrap();
            assert!(pos[0] >= -0.9 && pos[0] <= 0.9);
            assert!(pos[1] >= -0.9 && pos[1] <= 0.9);
            assert_eq!(pos[2], 0.25);
        }
    }

    #[test]
    fn test_exhausted_attempts() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let placed = [Footprint { position: [0.0; 3], clearance: 10.0 }];
        assert!(try_shape_placement(&mut rng, (-1.0, 1.0), 1.0, None, &placed, 50).is_none());
    }

    proptest! {
        #[test]
        fn prop_min_distance_symmetric(
            a in proptest::array::uniform3(-5.0f64..5.0),
            b in proptest::array::uniform3(-5.0f64..5.0),
            ca in 0.0f64..2.0,
            cb in 0.0f64..2.0,
        ) {
            let fa = Footprint { position: a, clearance: ca };
            let fb = Footprint { position: b, clearance: cb };
            prop_assert_eq!(
                check_min_distance(&a, ca, &[fb]),
                check_min_distance(&b, cb, &[fa])
            );
        }
    }
}
