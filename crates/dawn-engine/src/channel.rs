//! Channel runtime state shared between the sequencer and the renderer.
//!
//! Each slot publishes its voice (active flag, instrument, frequency) as a
//! single packed `AtomicU64`, so the renderer always sees a complete voice.
//! The phase accumulator is written only by the renderer and lives in its own
//! atomic; note changes never touch it.

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use dawn_ir::{Instrument, MAX_CHANNELS};

use crate::waveform::{self, NoiseSource, ATTENUATION};

const FREQUENCY_MASK: u64 = 0xFFFF_FFFF;
const INSTRUMENT_SHIFT: u32 = 32;
const ACTIVE_BIT: u64 = 1 << 40;

/// Runtime state of one channel slot.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChannelState {
    pub active: bool,
    /// Current pitch in Hz
    pub frequency: f32,
    pub instrument: Instrument,
    /// Position within the waveform cycle, in [0, 1)
    pub phase: f32,
}

impl ChannelState {
    /// An inactive channel at phase 0.
    pub const fn silent() -> Self {
        Self {
            active: false,
            frequency: 0.0,
            instrument: Instrument::Sine,
            phase: 0.0,
        }
    }

    /// Produce one attenuated sample and advance the phase.
    ///
    /// Inactive channels output 0 and keep their phase.
    pub fn next_sample(&mut self, sample_rate: u32, noise: &mut NoiseSource) -> f32 {
        if !self.active {
            return 0.0;
        }
        let value = waveform::sample(self.instrument, self.phase, noise);
        self.phase = waveform::advance(self.phase, waveform::increment(self.frequency, sample_rate));
        value * ATTENUATION
    }
}

fn pack_voice(active: bool, frequency: f32, instrument: Instrument) -> u64 {
    let mut word = frequency.to_bits() as u64 & FREQUENCY_MASK;
    word |= (instrument.code() as u64) << INSTRUMENT_SHIFT;
    if active {
        word |= ACTIVE_BIT;
    }
    word
}

fn unpack_voice(word: u64) -> (bool, f32, Instrument) {
    let frequency = f32::from_bits((word & FREQUENCY_MASK) as u32);
    let instrument = Instrument::from_code((word >> INSTRUMENT_SHIFT) as u8);
    (word & ACTIVE_BIT != 0, frequency, instrument)
}

#[derive(Debug)]
struct ChannelSlot {
    voice: AtomicU64,
    phase: AtomicU32,
}

impl ChannelSlot {
    fn new() -> Self {
        Self {
            voice: AtomicU64::new(pack_voice(false, 0.0, Instrument::Sine)),
            phase: AtomicU32::new(0.0f32.to_bits()),
        }
    }
}

/// The eight channel slots, shared by reference between the sequencer and
/// the renderer.
///
/// Out-of-range channel indices are ignored by every writer.
#[derive(Debug)]
pub struct ChannelBank {
    slots: [ChannelSlot; MAX_CHANNELS],
}

impl ChannelBank {
    /// Create a bank with every slot silent.
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| ChannelSlot::new()),
        }
    }

    /// Start (or retune) a note on a channel.
    pub fn note_on(&self, channel: usize, frequency: f32, instrument: Instrument) {
        if let Some(slot) = self.slots.get(channel) {
            let frequency = if frequency > 0.0 { frequency } else { 0.0 };
            slot.voice
                .store(pack_voice(true, frequency, instrument), Ordering::Release);
        }
    }

    /// Silence a channel, keeping its last frequency and instrument.
    pub fn note_off(&self, channel: usize) {
        if let Some(slot) = self.slots.get(channel) {
            slot.voice.fetch_and(!ACTIVE_BIT, Ordering::Release);
        }
    }

    /// Silence every slot.
    pub fn silence_all(&self) {
        for channel in 0..MAX_CHANNELS {
            self.note_off(channel);
        }
    }

    /// Read a consistent copy of one slot. Out of range reads as silent.
    pub fn snapshot(&self, channel: usize) -> ChannelState {
        let Some(slot) = self.slots.get(channel) else {
            return ChannelState::silent();
        };
        let (active, frequency, instrument) = unpack_voice(slot.voice.load(Ordering::Acquire));
        ChannelState {
            active,
            frequency,
            instrument,
            phase: f32::from_bits(slot.phase.load(Ordering::Relaxed)),
        }
    }

    /// Store the renderer's phase for a slot.
    pub fn commit_phase(&self, channel: usize, phase: f32) {
        if let Some(slot) = self.slots.get(channel) {
            slot.phase.store(phase.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn is_active(&self, channel: usize) -> bool {
        self.snapshot(channel).active
    }

    /// Number of slots currently sounding.
    pub fn active_count(&self) -> usize {
        (0..MAX_CHANNELS).filter(|&ch| self.is_active(ch)).count()
    }
}

impl Default for ChannelBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_bank_is_silent() {
        let bank = ChannelBank::new();
        assert_eq!(bank.active_count(), 0);
        for ch in 0..MAX_CHANNELS {
            assert_eq!(bank.snapshot(ch), ChannelState::silent());
        }
    }

    #[test]
    fn note_on_publishes_whole_voice() {
        let bank = ChannelBank::new();
        bank.note_on(3, 523.25, Instrument::Triangle);
        let state = bank.snapshot(3);
        assert!(state.active);
        assert_eq!(state.frequency, 523.25);
        assert_eq!(state.instrument, Instrument::Triangle);
    }

    #[test]
    fn note_off_keeps_pitch() {
        let bank = ChannelBank::new();
        bank.note_on(0, 110.0, Instrument::Saw);
        bank.note_off(0);
        let state = bank.snapshot(0);
        assert!(!state.active);
        assert_eq!(state.frequency, 110.0);
        assert_eq!(state.instrument, Instrument::Saw);
    }

    #[test]
    fn retrigger_keeps_phase() {
        let bank = ChannelBank::new();
        bank.note_on(1, 440.0, Instrument::Sine);
        bank.commit_phase(1, 0.375);
        bank.note_on(1, 880.0, Instrument::Square);
        assert_eq!(bank.snapshot(1).phase, 0.375);
    }

    #[test]
    fn silence_all_clears_every_slot() {
        let bank = ChannelBank::new();
        for ch in 0..MAX_CHANNELS {
            bank.note_on(ch, 100.0 + ch as f32, Instrument::Square);
        }
        assert_eq!(bank.active_count(), MAX_CHANNELS);
        bank.silence_all();
        assert_eq!(bank.active_count(), 0);
    }

    #[test]
    fn out_of_range_is_ignored() {
        let bank = ChannelBank::new();
        bank.note_on(MAX_CHANNELS, 440.0, Instrument::Sine);
        bank.note_off(99);
        bank.commit_phase(12, 0.5);
        assert_eq!(bank.active_count(), 0);
        assert_eq!(bank.snapshot(MAX_CHANNELS), ChannelState::silent());
    }

    #[test]
    fn negative_frequency_clamps_to_zero() {
        let bank = ChannelBank::new();
        bank.note_on(0, -50.0, Instrument::Sine);
        assert_eq!(bank.snapshot(0).frequency, 0.0);
    }

    #[test]
    fn inactive_state_outputs_zero_and_freezes_phase() {
        let mut noise = waveform::noise_source(1);
        let mut state = ChannelState {
            active: false,
            frequency: 440.0,
            instrument: Instrument::Saw,
            phase: 0.4,
        };
        assert_eq!(state.next_sample(44_100, &mut noise), 0.0);
        assert_eq!(state.phase, 0.4);
    }

    #[test]
    fn active_state_advances_phase() {
        let mut noise = waveform::noise_source(1);
        let mut state = ChannelState {
            active: true,
            frequency: 11_025.0,
            instrument: Instrument::Sine,
            phase: 0.0,
        };
        state.next_sample(44_100, &mut noise);
        assert!((state.phase - 0.25).abs() < 1e-6);
    }
}
