//! Frame-seeded red/blue channel displacement for premultiplied RGBA buffers.
//!
//! Offsets come from a tiny integer PRNG keyed on the frame index, so the
//! pass behaves like a shader: a pure function of its uniforms. Writes happen
//! in place; traversal direction follows the offset signs so every read sees
//! an unmodified source pixel. Alpha is never modified.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Tiny deterministic PRNG (xorshift64*).
#[derive(Debug, Clone, Copy)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// `seed = 0` is remapped so the generator cannot lock into zeros.
    pub const fn from_seed(seed: u64) -> Self {
        let mixed = seed ^ 0x9E37_79B9_7F4A_7C15;
        let state = if mixed == 0 {
            0xA076_1D64_78BD_642F
        } else {
            mixed
        };
        Self { state }
    }

    #[inline(always)]
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform value in `[0, max_inclusive]` using rejection sampling.
    #[inline(always)]
    pub fn next_bounded(&mut self, max_inclusive: usize) -> usize {
        if max_inclusive == 0 {
            return 0;
        }

        let bound = (max_inclusive as u64) + 1;
        let zone = u64::MAX - (u64::MAX % bound);
        loop {
            let sample = self.next_u64();
            if sample < zone {
                return (sample % bound) as usize;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDisplacement {
    pub seed: u64,
    pub luma_threshold: u8,
    pub max_offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplacementError {
    DimensionsOverflow,
    BufferLengthMismatch { expected: usize, actual: usize },
}

impl Display for DisplacementError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DimensionsOverflow => write!(f, "frame dimensions overflowed usize"),
            Self::BufferLengthMismatch { expected, actual } => write!(
                f,
                "RGBA buffer length mismatch: expected {expected} bytes, got {actual} bytes"
            ),
        }
    }
}

impl Error for DisplacementError {}

/// Per-channel displacement vectors in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOffsets {
    pub red_dx: isize,
    pub red_dy: isize,
    pub blue_dx: isize,
    pub blue_dy: isize,
}

impl ChannelOffsets {
    const ZERO: Self = Self {
        red_dx: 0,
        red_dy: 0,
        blue_dx: 0,
        blue_dy: 0,
    };

    fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl ChannelDisplacement {
    /// Red and blue magnitudes are independent but share direction signs,
    /// which keeps in-place writes from reading already-displaced pixels.
    pub fn offsets(&self, width: usize, height: usize) -> ChannelOffsets {
        if self.max_offset == 0 || width == 0 || height == 0 {
            return ChannelOffsets::ZERO;
        }

        let max_x = self
            .max_offset
            .min(width.saturating_sub(1))
            .min(isize::MAX as usize);
        let max_y = self
            .max_offset
            .min(height.saturating_sub(1))
            .min(isize::MAX as usize);
        let mut rng = XorShift64::from_seed(self.seed);

        let x_forward = (rng.next_u64() & 1) == 0;
        let y_forward = (rng.next_u64() & 1) == 0;

        ChannelOffsets {
            red_dx: signed_offset(&mut rng, max_x, x_forward),
            red_dy: signed_offset(&mut rng, max_y, y_forward),
            blue_dx: signed_offset(&mut rng, max_x, x_forward),
            blue_dy: signed_offset(&mut rng, max_y, y_forward),
        }
    }

    /// Displace a flat premultiplied RGBA buffer in place.
    pub fn apply(
        &self,
        rgba: &mut [u8],
        width: usize,
        height: usize,
    ) -> Result<(), DisplacementError> {
        let expected_len = width
            .checked_mul(height)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or(DisplacementError::DimensionsOverflow)?;

        if rgba.len() != expected_len {
            return Err(DisplacementError::BufferLengthMismatch {
                expected: expected_len,
                actual: rgba.len(),
            });
        }

        let offsets = self.offsets(width, height);
        if offsets.is_zero() {
            return Ok(());
        }

        let x_forward = offsets.red_dx >= 0 && offsets.blue_dx >= 0;
        let y_forward = offsets.red_dy >= 0 && offsets.blue_dy >= 0;
        displace(
            rgba,
            width,
            height,
            self.luma_threshold,
            offsets,
            x_forward,
            y_forward,
        );

        Ok(())
    }
}

#[inline(always)]
fn signed_offset(rng: &mut XorShift64, max_inclusive: usize, forward: bool) -> isize {
    let magnitude = rng.next_bounded(max_inclusive) as isize;
    if forward {
        magnitude
    } else {
        -magnitude
    }
}

#[inline(always)]
fn bt709_luma_u8(r: u8, g: u8, b: u8) -> u8 {
    ((u16::from(r) * 54 + u16::from(g) * 183 + u16::from(b) * 19) >> 8) as u8
}

#[inline(always)]
fn offset_coord(coord: usize, delta: isize, len: usize) -> usize {
    let max_index = len - 1;
    if delta >= 0 {
        coord.saturating_add(delta as usize).min(max_index)
    } else {
        coord.saturating_sub(delta.unsigned_abs())
    }
}

fn ordered(len: usize, forward: bool) -> Box<dyn Iterator<Item = usize>> {
    if forward {
        Box::new(0..len)
    } else {
        Box::new((0..len).rev())
    }
}

fn displace(
    rgba: &mut [u8],
    width: usize,
    height: usize,
    luma_threshold: u8,
    offsets: ChannelOffsets,
    x_forward: bool,
    y_forward: bool,
) {
    for y in ordered(height, y_forward) {
        for x in ordered(width, x_forward) {
            let dst = (y * width + x) << 2;
            let luma = bt709_luma_u8(rgba[dst], rgba[dst + 1], rgba[dst + 2]);
            if luma <= luma_threshold {
                continue;
            }

            let red_src = (offset_coord(y, offsets.red_dy, height) * width
                + offset_coord(x, offsets.red_dx, width))
                << 2;
            let blue_src = (offset_coord(y, offsets.blue_dy, height) * width
                + offset_coord(x, offsets.blue_dx, width))
                << 2;

            // Premultiplied channels may not exceed the destination alpha.
            let alpha = rgba[dst + 3];
            rgba[dst] = rgba[red_src].min(alpha);
            rgba[dst + 2] = rgba[blue_src + 2].min(alpha);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_frame(width: usize, height: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(width * height * 4);
        for y in 0..height {
            for x in 0..width {
                out.push(((x * 17 + y * 11) & 255) as u8);
                out.push(((x * 7 + y * 19) & 255) as u8);
                out.push(((x * 23 + y * 3) & 255) as u8);
                out.push(255);
            }
        }
        out
    }

    #[test]
    fn apply_preserves_alpha_channel_exactly() {
        let (width, height) = (16, 9);
        let mut frame = make_test_frame(width, height);
        for (i, px) in frame.chunks_exact_mut(4).enumerate() {
            px[3] = if i % 3 == 0 { 255 } else { 200 };
            px[0] = px[0].min(px[3]);
            px[1] = px[1].min(px[3]);
            px[2] = px[2].min(px[3]);
        }
        let alpha_before: Vec<u8> = frame.chunks_exact(4).map(|px| px[3]).collect();

        let pass = ChannelDisplacement {
            seed: 0xDEAD_BEEF_CAFE_BABE,
            luma_threshold: 32,
            max_offset: 4,
        };
        pass.apply(&mut frame, width, height).unwrap();

        let alpha_after: Vec<u8> = frame.chunks_exact(4).map(|px| px[3]).collect();
        assert_eq!(alpha_before, alpha_after);
        for px in frame.chunks_exact(4) {
            assert!(px[0] <= px[3] && px[2] <= px[3], "invalid premultiplied pixel");
        }
    }

    #[test]
    fn same_seed_is_byte_identical() {
        let (width, height) = (32, 18);
        let source = make_test_frame(width, height);
        let pass = ChannelDisplacement {
            seed: 42,
            luma_threshold: 24,
            max_offset: 6,
        };

        let mut a = source.clone();
        let mut b = source;
        pass.apply(&mut a, width, height).unwrap();
        pass.apply(&mut b, width, height).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn threshold_can_disable_effect() {
        let (width, height) = (8, 4);
        let mut frame = vec![10_u8; width * height * 4];
        for px in frame.chunks_exact_mut(4) {
            px[3] = 255;
        }
        let baseline = frame.clone();

        let pass = ChannelDisplacement {
            seed: 7,
            luma_threshold: 250,
            max_offset: 8,
        };
        pass.apply(&mut frame, width, height).unwrap();
        assert_eq!(frame, baseline);
    }

    #[test]
    fn offsets_share_direction_signs() {
        for seed in 0..64 {
            let pass = ChannelDisplacement {
                seed,
                luma_threshold: 0,
                max_offset: 12,
            };
            let offsets = pass.offsets(100, 100);
            assert!(offsets.red_dx.signum() * offsets.blue_dx.signum() >= 0);
            assert!(offsets.red_dy.signum() * offsets.blue_dy.signum() >= 0);
            assert!(offsets.red_dx.abs() <= 12 && offsets.blue_dy.abs() <= 12);
        }
    }

    #[test]
    fn rejects_invalid_buffer_length() {
        let mut frame = vec![0_u8; 15];
        let pass = ChannelDisplacement {
            seed: 1,
            luma_threshold: 0,
            max_offset: 1,
        };
        let err = pass.apply(&mut frame, 2, 2).unwrap_err();
        assert!(matches!(err, DisplacementError::BufferLengthMismatch { .. }));
    }
}
