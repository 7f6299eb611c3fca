//! Real-time mixer: sums every channel slot into mono output.

use dawn_ir::MAX_CHANNELS;

use crate::channel::ChannelBank;
use crate::waveform::{self, NoiseSource, DEFAULT_NOISE_SEED};

/// Output rate used when the device doesn't dictate one.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Pull-based renderer, invoked by the audio device for each buffer.
///
/// `render` never blocks, never allocates and runs in time proportional to
/// `buffer length × MAX_CHANNELS`.
pub struct Renderer {
    sample_rate: u32,
    noise: NoiseSource,
}

impl Renderer {
    pub fn new(sample_rate: u32) -> Self {
        Self::with_seed(sample_rate, DEFAULT_NOISE_SEED)
    }

    /// Renderer with a specific noise seed, for reproducible output.
    pub fn with_seed(sample_rate: u32, seed: u64) -> Self {
        Self {
            sample_rate,
            noise: waveform::noise_source(seed),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Fill `output` with the mix of all channel slots.
    ///
    /// Each slot is read once per call, so a note change lands on a buffer
    /// boundary.
    pub fn render(&mut self, bank: &ChannelBank, output: &mut [f32]) {
        output.fill(0.0);

        for ch in 0..MAX_CHANNELS {
            let mut state = bank.snapshot(ch);
            if !state.active {
                continue;
            }
            for sample in output.iter_mut() {
                *sample += state.next_sample(self.sample_rate, &mut self.noise);
            }
            bank.commit_phase(ch, state.phase);
        }
    }
}
