//! Smooth 1D value noise over the frame counter.
//!
//! A lattice of random values is blended with cosine interpolation over four
//! octaves, so neighbouring inputs give neighbouring outputs and threshold
//! crossings arrive in bursts rather than independently per frame.

use std::f32::consts::PI;

use rand::{Rng, RngCore};

const LATTICE_SIZE: usize = 4096;
const LATTICE_MASK: usize = LATTICE_SIZE - 1;

#[derive(Debug, Clone)]
pub struct Noise {
    lattice: Vec<f32>,
    octaves: u32,
    falloff: f32,
}

impl Noise {
    pub fn new(rng: &mut dyn RngCore) -> Self {
        Self::with_detail(rng, 4, 0.5)
    }

    pub fn with_detail(rng: &mut dyn RngCore, octaves: u32, falloff: f32) -> Self {
        let lattice = (0..LATTICE_SIZE).map(|_| rng.random::<f32>()).collect();
        Self {
            lattice,
            octaves: octaves.max(1),
            falloff,
        }
    }

    /// Noise value at `x`, in `[0, 1)`.
    pub fn sample(&self, x: f32) -> f32 {
        let x = x.abs();
        let mut xi = (x.floor() as usize) & LATTICE_MASK;
        let mut xf = x - x.floor();

        let mut result = 0.0;
        let mut amplitude = 0.5;
        for _ in 0..self.octaves {
            let t = scaled_cosine(xf);
            let a = self.lattice[xi & LATTICE_MASK];
            let b = self.lattice[(xi + 1) & LATTICE_MASK];
            result += (a + t * (b - a)) * amplitude;

            amplitude *= self.falloff;
            xi = (xi << 1) & LATTICE_MASK;
            xf *= 2.0;
            if xf >= 1.0 {
                xi += 1;
                xf -= 1.0;
            }
        }

        result
    }
}

fn scaled_cosine(t: f32) -> f32 {
    0.5 * (1.0 - (t * PI).cos())
}
