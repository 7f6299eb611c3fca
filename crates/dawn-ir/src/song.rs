//! Song structure and sequencing types.

use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::event::Instrument;
use crate::pattern::{Pattern, PatternId};

/// Number of hardware channel slots.
pub const MAX_CHANNELS: usize = 8;

/// Maximum title length in bytes.
pub const MAX_TITLE_LEN: usize = 128;

pub const DEFAULT_BPM: u32 = 120;
pub const DEFAULT_TICKS_PER_BEAT: u32 = 4;

/// A complete song, read-only during playback.
#[derive(Clone, Debug, PartialEq)]
pub struct Song {
    /// Song title
    pub title: ArrayString<MAX_TITLE_LEN>,
    /// Tempo in beats per minute
    pub bpm: u32,
    /// Scheduling ticks per beat
    pub ticks_per_beat: u32,
    /// Channels in use (at most [`MAX_CHANNELS`])
    pub channel_count: u8,
    /// Default instrument per channel slot
    pub channel_instruments: [Instrument; MAX_CHANNELS],
    /// Pattern pool
    pub patterns: Vec<Pattern>,
    /// Playback order, as pattern ids
    pub order: Vec<PatternId>,
}

impl Default for Song {
    fn default() -> Self {
        Self {
            title: ArrayString::new(),
            bpm: DEFAULT_BPM,
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            channel_count: 1,
            channel_instruments: [Instrument::Sine; MAX_CHANNELS],
            patterns: Vec::new(),
            order: Vec::new(),
        }
    }
}

impl Song {
    /// Create a new empty song.
    pub fn new(title: &str) -> Self {
        let mut song = Self::default();
        song.set_title(title);
        song
    }

    /// Create a song using `num_channels` channels, clamped to [`MAX_CHANNELS`].
    pub fn with_channels(title: &str, num_channels: u8) -> Self {
        let mut song = Self::new(title);
        song.set_channel_count(num_channels);
        song
    }

    /// Set the title, truncating at a character boundary if too long.
    pub fn set_title(&mut self, title: &str) {
        self.title.clear();
        for c in title.chars() {
            if self.title.try_push(c).is_err() {
                break;
            }
        }
    }

    pub fn set_channel_count(&mut self, num_channels: u8) {
        self.channel_count = num_channels.min(MAX_CHANNELS as u8);
    }

    /// Channels the sequencer drives.
    pub fn active_channels(&self) -> usize {
        (self.channel_count as usize).min(MAX_CHANNELS)
    }

    /// Add a pattern and return its id.
    pub fn add_pattern(&mut self, pattern: Pattern) -> PatternId {
        let id = pattern.id;
        self.patterns.push(pattern);
        id
    }

    /// Append a pattern id to the order list.
    pub fn add_order(&mut self, id: PatternId) {
        self.order.push(id);
    }

    /// Look up a pattern by id. The first pattern with that id wins.
    pub fn pattern(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    /// Position of a pattern in the pool, by id.
    pub fn pattern_index(&self, id: PatternId) -> Option<usize> {
        self.patterns.iter().position(|p| p.id == id)
    }

    /// Total playing time in ticks, following the order list.
    ///
    /// Order entries naming a missing pattern contribute nothing.
    pub fn duration_ticks(&self) -> u64 {
        self.order
            .iter()
            .filter_map(|id| self.pattern(*id))
            .map(|pattern| pattern.length_over(self.active_channels()))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NoteEvent;

    fn make_test_song() -> Song {
        let mut song = Song::with_channels("test", 2);

        let mut pat0 = Pattern::new(0, 2);
        pat0.push(0, NoteEvent::note(440.0, 4, Instrument::Sine));
        pat0.push(1, NoteEvent::rest(2));

        let mut pat1 = Pattern::new(1, 2);
        pat1.push(1, NoteEvent::note(220.0, 6, Instrument::Square));

        song.add_pattern(pat0);
        song.add_pattern(pat1);
        song.add_order(0);
        song.add_order(1);
        song.add_order(0);
        song
    }

    #[test]
    fn with_channels_clamps() {
        let song = Song::with_channels("wide", 20);
        assert_eq!(song.channel_count, MAX_CHANNELS as u8);
        assert_eq!(song.active_channels(), MAX_CHANNELS);
    }

    #[test]
    fn pattern_lookup_by_id() {
        let song = make_test_song();
        assert_eq!(song.pattern(1).map(|p| p.id), Some(1));
        assert!(song.pattern(7).is_none());
        assert_eq!(song.pattern_index(1), Some(1));
    }

    #[test]
    fn duplicate_ids_resolve_to_first() {
        let mut song = Song::with_channels("dup", 1);
        let mut first = Pattern::new(3, 1);
        first.push(0, NoteEvent::rest(1));
        song.add_pattern(first);
        song.add_pattern(Pattern::new(3, 1));
        assert_eq!(song.pattern(3).map(|p| p.rows(0).len()), Some(1));
    }

    #[test]
    fn duration_follows_order() {
        let song = make_test_song();
        // 4 + 6 + 4
        assert_eq!(song.duration_ticks(), 14);
    }

    #[test]
    fn duration_skips_missing_patterns() {
        let mut song = make_test_song();
        song.order = vec![9, 1, 9];
        assert_eq!(song.duration_ticks(), 6);
    }

    #[test]
    fn duration_ignores_undriven_channels() {
        let mut song = Song::with_channels("narrow", 1);
        let mut pat = Pattern::new(0, 4);
        pat.push(0, NoteEvent::rest(2));
        pat.push(3, NoteEvent::rest(10));
        song.add_pattern(pat);
        song.add_order(0);
        assert_eq!(song.duration_ticks(), 2);
    }

    #[test]
    fn long_title_truncates() {
        let long: alloc::string::String = core::iter::repeat('a').take(300).collect();
        let song = Song::new(&long);
        assert_eq!(song.title.len(), MAX_TITLE_LEN);
    }

    #[test]
    fn empty_song() {
        let song = Song::new("empty");
        assert_eq!(song.duration_ticks(), 0);
        assert_eq!(song.bpm, DEFAULT_BPM);
        assert_eq!(song.ticks_per_beat, DEFAULT_TICKS_PER_BEAT);
    }
}
