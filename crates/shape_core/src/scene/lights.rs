//! Point light placement

use rand::Rng;

use super::types::PointLight;
use crate::config::LightsConfig;

/// Jittered lights around the origin, biased above the working area.
///
/// Every coordinate uses its own integer-degree draw:
/// `x = d * sin(a) * j`, `y = d * cos(b) * j`, `z = d * (1 - sin(c) * j)` with
/// `a, b` in `0..=360` and `c` in `0..=180`.
pub fn place_lights<R: Rng>(rng: &mut R, config: &LightsConfig) -> Vec<PointLight> {
    let count = rng.gen_range(config.min_num_lights..=config.max_num_lights);
    let d = config.lights_distance;
    let jitter = config.lights_jitter;
    let mut draw = |max: i32| (rng.gen_range(0..=max) as f64).to_radians();

    (0..count)
        .map(|_| {
            let x = d * draw(360).sin() * jitter;
            let y = d * draw(360).cos() * jitter;
            let z = d * (1.0 - draw(180).sin() * jitter);
            PointLight { position: [x, y, z], intensity: config.lights_intensity }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_light_count_and_bounds() {
        let config = LightsConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..50 {
            let lights = place_lights(&mut rng, &config);
            assert!((1..=3).contains(&lights.len()));
            for light in &lights {
                let [x, y, z] = light.position;
                let reach = config.lights_distance * config.lights_jitter;
                assert!(x.abs() <= reach + 1e-9 && y.abs() <= reach + 1e-9);
                assert!(z >= config.lights_distance - reach - 1e-9 && z <= config.lights_distance + 1e-9);
                assert_eq!(light.intensity, 60.0);
            }
        }
    }

    #[test]
    fn test_zero_jitter_is_straight_above() {
        let config = LightsConfig { lights_jitter: 0.0, min_num_lights: 2, max_num_lights: 2, ..Default::default() };
        let lights = place_lights(&mut ChaCha8Rng::seed_from_u64(0), &config);
        assert_eq!(lights.len(), 2);
        for light in lights {
            assert_eq!(light.position[2], config.lights_distance);
            assert_eq!(light.position[0].abs(), 0.0);
        }
    }
}
