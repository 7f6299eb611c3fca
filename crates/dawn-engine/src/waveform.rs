//! Waveform generation and phase accumulation.
//!
//! Phase `t` is a fraction of one waveform cycle and always stays in
//! `[0, 1)`. Wrapping subtracts whole cycles rather than taking a modulo,
//! so the phase never goes negative.

use core::f32::consts::TAU;

use dawn_ir::{Instrument, MAX_CHANNELS};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Per-channel output gain. Eight full-scale channels sum to at most 1.0.
pub const ATTENUATION: f32 = 1.0 / MAX_CHANNELS as f32;

/// Random source for the noise instrument.
pub type NoiseSource = Pcg32;

/// Seed used when the caller doesn't pick one.
pub const DEFAULT_NOISE_SEED: u64 = 0x6461_776e;

/// Build a seeded noise source.
pub fn noise_source(seed: u64) -> NoiseSource {
    Pcg32::seed_from_u64(seed)
}

/// Raw waveform value at phase `t`, in [-1, 1], before attenuation.
///
/// Noise ignores the phase.
pub fn sample(instrument: Instrument, t: f32, noise: &mut NoiseSource) -> f32 {
    match instrument {
        Instrument::Sine => libm::sinf(TAU * t),
        Instrument::Square => {
            if libm::fmodf(t, 1.0) < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Instrument::Triangle => libm::fabsf(libm::fmodf(t * 2.0, 2.0) - 1.0) * 2.0 - 1.0,
        Instrument::Saw => libm::fmodf(t, 1.0) * 2.0 - 1.0,
        Instrument::Noise => noise.random::<f32>() * 2.0 - 1.0,
    }
}

/// Phase step per output sample for a pitch.
pub fn increment(frequency: f32, sample_rate: u32) -> f32 {
    if sample_rate == 0 || !(frequency > 0.0) {
        return 0.0;
    }
    frequency / sample_rate as f32
}

/// Advance a phase by `increment`, wrapping back into [0, 1).
pub fn advance(phase: f32, increment: f32) -> f32 {
    let mut t = phase + increment;
    if t >= 1.0 {
        t -= 1.0;
    }
    // Increments of a full cycle or more (pitch above the sample rate).
    if t >= 1.0 {
        t -= libm::floorf(t);
    }
    if t >= 0.0 {
        t
    } else {
        0.0
    }
}
