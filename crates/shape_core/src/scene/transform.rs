//! Random scale, rotation and flip

use std::f64::consts::PI;

use nalgebra::{Rotation3, Vector3};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::RuleError;
use crate::mesh::{down, Mesh};
use crate::rules::{FlipRule, FlipSetting, RandomRotation, ScaleConsistency, ScalingRule};

/// Upper bound on generated points, guards against a tiny step.
const MAX_STEPPED_VALUES: usize = 1_000_000;

/// `min, min + step, ...` continuing while the last value is below `max`.
///
/// The last value may exceed `max` (`0, 0.4, 0.8, 1.2` for `0..1` step `0.4`).
pub fn stepped_values(min: f64, max: f64, step: f64) -> Result<Vec<f64>, RuleError> {
    if step.is_nan() || step <= 0.0 {
        return Err(RuleError::invalid("step", step));
    }
    let mut values = vec![min];
    let mut i = 0usize;
    while values[i] < max {
        i += 1;
        if i >= MAX_STEPPED_VALUES {
            return Err(RuleError::invalid("step", format!("{step} is too small for {min}..{max}")));
        }
        values.push(min + i as f64 * step);
    }
    Ok(values)
}

/// Stepped values in `[min, max)`, `[min]` when that range is empty.
fn exclusive_stepped_values(min: f64, max: f64, step: f64) -> Result<Vec<f64>, RuleError> {
    let mut values = stepped_values(min, max, step)?;
    if values.len() > 1 {
        values.retain(|v| *v < max);
    }
    Ok(values)
}

fn draw<R: Rng>(rng: &mut R, values: &[f64]) -> f64 {
    values.choose(rng).copied().unwrap_or_default()
}

/// Scale vector; `[1, 1, 1]` without a scaling rule.
pub fn random_scale<R: Rng>(rng: &mut R, scaling: Option<&ScalingRule>) -> Result<[f64; 3], RuleError> {
    let Some(rule) = scaling else {
        return Ok([1.0; 3]);
    };
    let values = stepped_values(rule.min, rule.max, rule.step)?;
    let mut factor = || draw(rng, &values);

    Ok(match rule.consistent {
        ScaleConsistency::All => {
            let f = factor();
            [f, f, f]
        }
        ScaleConsistency::None => [factor(), factor(), factor()],
        ScaleConsistency::Xy => {
            let (a, b) = (factor(), factor());
            [a, a, b]
        }
        ScaleConsistency::Xz => {
            let (a, b) = (factor(), factor());
            [a, b, a]
        }
        ScaleConsistency::Yz => {
            let (a, b) = (factor(), factor());
            [a, b, b]
        }
    })
}

/// Random rotation in XYZ euler degrees, before the fixed rotation is added.
///
/// `mesh` is only read in auto-snap mode.
pub fn random_rotation<R: Rng>(
    rng: &mut R,
    rule: &RandomRotation,
    mesh: &Mesh,
    auto_snap_attempts: u32,
) -> Result<[f64; 3], RuleError> {
    if rule.auto_snap_face {
        return auto_snap_rotation(rng, rule, mesh, auto_snap_attempts);
    }

    let mut rotation = [0.0; 3];
    for (axis, angle) in rotation.iter_mut().enumerate() {
        *angle = axis_angle(rng, rule, axis)?;
    }
    Ok(rotation)
}

/// Stepped draw on one axis; 0 when the axis has no snap step.
fn axis_angle<R: Rng>(rng: &mut R, rule: &RandomRotation, axis: usize) -> Result<f64, RuleError> {
    let snap = rule.snap[axis];
    if snap <= 0.0 {
        return Ok(0.0);
    }
    let values = exclusive_stepped_values(rule.min_bounds[axis], rule.max_bounds[axis], snap)?;
    Ok(draw(rng, &values))
}

/// Rests the mesh on a random face: the face normal is rotated onto -Z.
///
/// Faces are redrawn until every angle has an equivalent (modulo 360) within the
/// bounds; that equivalent is stored. After `attempts` draws the last one is kept,
/// wrapped into `[0, 360)`. A non-zero z snap adds a z draw on top.
fn auto_snap_rotation<R: Rng>(
    rng: &mut R,
    rule: &RandomRotation,
    mesh: &Mesh,
    attempts: u32,
) -> Result<[f64; 3], RuleError> {
    let mut rotation = [0.0; 3];
    let face_count = mesh.faces().len();
    let attempts = attempts.max(1);

    if face_count > 0 {
        for attempt in 1..=attempts {
            let face = rng.gen_range(0..face_count);
            let Some(normal) = mesh.face_normal(face) else { continue };
            let candidate = face_down_rotation(&normal);
            if let Some(fitted) = rule.fit_bounds(&candidate) {
                rotation = fitted;
                break;
            }
            rotation = candidate.map(wrap_degrees);
            if attempt == attempts {
                tracing::warn!(
                    "Auto-snap rotation outside bounds after {} attempts, keeping {:?}",
                    attempt,
                    rotation
                );
            }
        }
    }

    if rule.snap[2] != 0.0 {
        rotation[2] = wrap_degrees(rotation[2] + axis_angle(rng, rule, 2)?);
    }
    Ok(rotation)
}

/// Euler degrees in `(-180, 180]` of the rotation taking `normal` onto -Z.
fn face_down_rotation(normal: &Vector3<f64>) -> [f64; 3] {
    let rotation = Rotation3::rotation_between(normal, &down().into_inner())
        .unwrap_or_else(|| Rotation3::from_axis_angle(&Vector3::x_axis(), PI));
    let (x, y, z) = rotation.euler_angles();
    [x, y, z].map(f64::to_degrees)
}

/// `[0, 360)` without negative zero.
fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // tiny negative inputs round up to 360
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped + 0.0
    }
}

/// `[xy, xz, yz]` mirror flags; `"random"` is a fair coin per plane.
pub fn random_flip<R: Rng>(rng: &mut R, flip: Option<&FlipRule>) -> [bool; 3] {
    let Some(rule) = flip else {
        return [false; 3];
    };
    rule.planes().map(|setting| match setting {
        FlipSetting::Fixed(value) => value,
        FlipSetting::Random => rng.gen_bool(0.5),
    })
}
