//! Tileable gradient noise in any number of dimensions.
//!
//! Each dimension has an integer period: the lattice wraps after that many
//! cells, so sampling positions in `[0, 1)` per axis yields a seamless tile.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Blend `a0` into `a1` with the quintic fade `6w^5 - 15w^4 + 10w^3`
pub fn smoothstep(a0: f64, a1: f64, w: f64) -> f64 {
    let fade = w * w * w * (w * (w * 6.0 - 15.0) + 10.0);
    a0 + fade * (a1 - a0)
}

#[derive(Debug, Clone)]
pub struct TileablePerlin {
    periods: Vec<usize>,
    /// One unit gradient per lattice point, row-major over `periods`
    gradients: Vec<Vec<f64>>,
}

impl TileablePerlin {
    /// Build a noise field with `periods[i]` lattice cells along axis `i`
    pub fn new(periods: &[usize], seed: u64) -> Self {
        let periods: Vec<usize> = periods.iter().map(|&p| p.max(1)).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let lattice_points: usize = periods.iter().product();
        let gradients = (0..lattice_points)
            .map(|_| random_unit_vector(&mut rng, periods.len()))
            .collect();
        Self { periods, gradients }
    }

    pub fn dimensions(&self) -> usize {
        self.periods.len()
    }

    fn gradient(&self, lattice: &[usize]) -> &[f64] {
        let index = lattice
            .iter()
            .zip(&self.periods)
            .fold(0, |acc, (&c, &period)| acc * period + c);
        &self.gradients[index]
    }

    /// Noise at `position`, one coordinate per dimension, each in tile units
    ///
    /// Positions wrap with period 1 along every axis. `position` must have
    /// exactly [`dimensions`](Self::dimensions) coordinates.
    pub fn value(&self, position: &[f64]) -> f64 {
        let n = self.dimensions();
        debug_assert_eq!(position.len(), n, "noise position has the wrong number of axes");
        let scaled: Vec<f64> = position
            .iter()
            .zip(&self.periods)
            .map(|(&p, &period)| (p * period as f64).rem_euclid(period as f64))
            .collect();
        let anchor: Vec<usize> = scaled
            .iter()
            .zip(&self.periods)
            .map(|(&s, &period)| (s.floor() as usize).min(period - 1))
            .collect();

        // Corner bits are read most significant first: bit for axis 0 is
        // the highest, so neighbouring pairs differ along the last axis.
        let mut corners = Vec::with_capacity(1 << n);
        let mut lattice = vec![0usize; n];
        for corner in 0..(1usize << n) {
            let mut offsets = vec![0.0; n];
            for axis in 0..n {
                let bit = (corner >> (n - 1 - axis)) & 1;
                let unwrapped = anchor[axis] + bit;
                lattice[axis] = unwrapped % self.periods[axis];
                offsets[axis] = scaled[axis] - unwrapped as f64;
            }
            let gradient = self.gradient(&lattice);
            corners.push(offsets.iter().zip(gradient).map(|(a, b)| a * b).sum::<f64>());
        }

        for axis in (0..n).rev() {
            let w = scaled[axis] - anchor[axis] as f64;
            corners = corners
                .chunks(2)
                .map(|pair| smoothstep(pair[0], pair[1], w))
                .collect();
        }
        corners.first().copied().unwrap_or(0.0)
    }
}

/// Uniform draw in the unit cube, normalised; a zero vector is redrawn
fn random_unit_vector(rng: &mut ChaCha8Rng, dimensions: usize) -> Vec<f64> {
    loop {
        let v: Vec<f64> = (0..dimensions).map(|_| rng.gen_range(-1.0..=1.0)).collect();
        let length = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if length > 1e-9 {
            return v.into_iter().map(|x| x / length).collect();
        }
    }
}
