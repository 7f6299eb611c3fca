//! Tick clock: converts tempo into the sequencer's scheduling period.

use core::time::Duration;

use dawn_ir::{Song, DEFAULT_BPM, DEFAULT_TICKS_PER_BEAT};

/// Derives seconds-per-tick from tempo and ticks-per-beat.
///
/// Zero inputs fall back to [`DEFAULT_BPM`] / [`DEFAULT_TICKS_PER_BEAT`]
/// so a malformed tempo never stops playback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickClock {
    bpm: u32,
    ticks_per_beat: u32,
    seconds_per_tick: f64,
    clamped: bool,
}

impl TickClock {
    pub fn new(bpm: u32, ticks_per_beat: u32) -> Self {
        let clamped = bpm == 0 || ticks_per_beat == 0;
        let bpm = if bpm == 0 { DEFAULT_BPM } else { bpm };
        let ticks_per_beat = if ticks_per_beat == 0 {
            DEFAULT_TICKS_PER_BEAT
        } else {
            ticks_per_beat
        };
        Self {
            bpm,
            ticks_per_beat,
            seconds_per_tick: 60.0 / (bpm as f64 * ticks_per_beat as f64),
            clamped,
        }
    }

    pub fn from_song(song: &Song) -> Self {
        Self::new(song.bpm, song.ticks_per_beat)
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    /// True when either input was replaced by its default.
    pub fn was_clamped(&self) -> bool {
        self.clamped
    }

    pub fn seconds_per_tick(&self) -> f64 {
        self.seconds_per_tick
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(self.seconds_per_tick)
    }

    /// Time of tick `tick_index` relative to playback start.
    ///
    /// Computed from the index directly so long songs don't accumulate
    /// rounding drift.
    pub fn offset(&self, tick_index: u64) -> Duration {
        Duration::from_secs_f64(tick_index as f64 * self.seconds_per_tick)
    }

    /// First output sample belonging to tick `tick_index`.
    pub fn tick_start_sample(&self, tick_index: u64, sample_rate: u32) -> u64 {
        libm::round(tick_index as f64 * self.seconds_per_tick * sample_rate as f64) as u64
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(DEFAULT_BPM, DEFAULT_TICKS_PER_BEAT)
    }
}
