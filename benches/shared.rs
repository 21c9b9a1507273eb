#![allow(dead_code)]

use civindex::civilization::Civilization;
use civindex::geometry::Point;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const BENCH_CAPACITY: usize = 16;

/// A deterministic scattering of civilizations across the full lat/lon range,
/// seeded so every run of a benchmark sees the same distribution.
pub fn random_civilizations(count: usize) -> Vec<Civilization> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    (0..count)
        .map(|i| {
            let lat = rng.gen_range(-85.0..85.0);
            let lon = rng.gen_range(-179.0..179.0);
            Civilization::new(i as i64, format!("civ-{i}"), lat, lon, -i as i64)
        })
        .collect()
}

pub fn as_points(civs: &[Civilization]) -> Vec<Point> {
    civs.iter()
        .map(|c| Point::new(c.longitude, c.latitude, c.clone()))
        .collect()
}
