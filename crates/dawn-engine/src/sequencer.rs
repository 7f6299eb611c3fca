//! Tick-driven playback state machine.
//!
//! Each call to [`Sequencer::tick`] advances every channel's cursor by one
//! tick, writing note-on/note-off into a [`ChannelBank`], and moves through
//! the order list as patterns run out.

use dawn_ir::{Pattern, PatternId, Song, MAX_CHANNELS};

use crate::channel::ChannelBank;

/// Transport state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SequencerState {
    #[default]
    Stopped,
    Playing,
}

/// Per-channel read position within the current pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Next event to fetch from the channel's row-sequence
    pub row: usize,
    /// Ticks left on the sounding note or rest, after this tick's decrement
    pub remaining: u32,
}

/// Where playback is, for display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackPosition {
    pub order_index: usize,
    /// Pattern named by the current order entry, if any
    pub pattern_id: Option<PatternId>,
    /// Ticks processed since `start`
    pub tick: u64,
}

/// The playback automaton. Owns a read-only song.
#[derive(Clone, Debug)]
pub struct Sequencer {
    song: Song,
    state: SequencerState,
    order_index: usize,
    cursors: [Cursor; MAX_CHANNELS],
    ticks: u64,
}

impl Sequencer {
    pub fn new(song: Song) -> Self {
        Self {
            song,
            state: SequencerState::Stopped,
            order_index: 0,
            cursors: [Cursor::default(); MAX_CHANNELS],
            ticks: 0,
        }
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Begin playback from the first order entry.
    pub fn start(&mut self) {
        self.state = SequencerState::Playing;
        self.order_index = 0;
        self.cursors = [Cursor::default(); MAX_CHANNELS];
        self.ticks = 0;
    }

    /// Stop playback and silence all channel slots.
    pub fn stop(&mut self, bank: &ChannelBank) {
        self.state = SequencerState::Stopped;
        bank.silence_all();
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == SequencerState::Playing
    }

    pub fn order_index(&self) -> usize {
        self.order_index
    }

    /// Cursor for a channel; default for out-of-range channels.
    pub fn cursor(&self, channel: usize) -> Cursor {
        self.cursors.get(channel).copied().unwrap_or_default()
    }

    pub fn position(&self) -> PlaybackPosition {
        PlaybackPosition {
            order_index: self.order_index,
            pattern_id: self.song.order.get(self.order_index).copied(),
            tick: self.ticks,
        }
    }

    /// Advance playback by one tick. Does nothing while stopped.
    ///
    /// When every channel of the current pattern is exhausted, the next
    /// pattern in the order starts within the same tick, so pattern
    /// boundaries add no silent tick.
    pub fn tick(&mut self, bank: &ChannelBank) {
        if self.state != SequencerState::Playing {
            return;
        }
        self.ticks += 1;
        let channels = self.song.active_channels();

        loop {
            let Some(index) = self.resolve_pattern() else {
                self.stop(bank);
                return;
            };

            let pattern = &self.song.patterns[index];
            if !step_channels(pattern, &mut self.cursors[..channels], bank) {
                return;
            }

            self.order_index += 1;
            self.cursors = [Cursor::default(); MAX_CHANNELS];
            if self.order_index >= self.song.order.len() {
                self.stop(bank);
                return;
            }
        }
    }

    /// Find the pattern for the current order entry, skipping entries that
    /// name no pattern. `None` once the order is exhausted.
    fn resolve_pattern(&mut self) -> Option<usize> {
        while let Some(&id) = self.song.order.get(self.order_index) {
            if let Some(index) = self.song.pattern_index(id) {
                return Some(index);
            }
            self.order_index += 1;
        }
        None
    }
}

/// Run one tick of every channel against a pattern.
///
/// Returns true when every channel had nothing left to play.
fn step_channels(pattern: &Pattern, cursors: &mut [Cursor], bank: &ChannelBank) -> bool {
    let mut exhausted = 0;

    for (ch, cursor) in cursors.iter_mut().enumerate() {
        if cursor.remaining == 0 {
            match pattern.rows(ch).get(cursor.row) {
                Some(event) => {
                    if event.is_rest() {
                        bank.note_off(ch);
                    } else {
                        bank.note_on(ch, event.frequency, event.instrument);
                    }
                    cursor.remaining = event.ticks();
                    cursor.row += 1;
                }
                None => {
                    bank.note_off(ch);
                    exhausted += 1;
                }
            }
        }
        cursor.remaining = cursor.remaining.saturating_sub(1);
    }

    exhausted == cursors.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dawn_ir::{Instrument, NoteEvent};

    fn one_channel_song(events: &[NoteEvent]) -> Song {
        let mut song = Song::with_channels("test", 1);
        let mut pat = Pattern::new(0, 1);
        for ev in events {
            pat.push(0, *ev);
        }
        song.add_pattern(pat);
        song.add_order(0);
        song
    }

    fn started(song: Song) -> (Sequencer, ChannelBank) {
        let mut seq = Sequencer::new(song);
        seq.start();
        (seq, ChannelBank::new())
    }

    #[test]
    fn starts_stopped() {
        let seq = Sequencer::new(Song::new("x"));
        assert_eq!(seq.state(), SequencerState::Stopped);
    }

    #[test]
    fn tick_while_stopped_is_noop() {
        let mut seq = Sequencer::new(one_channel_song(&[NoteEvent::note(440.0, 4, Instrument::Sine)]));
        let bank = ChannelBank::new();
        seq.tick(&bank);
        assert_eq!(bank.active_count(), 0);
        assert_eq!(seq.position().tick, 0);
    }

    #[test]
    fn single_note_sounds_for_its_duration() {
        let (mut seq, bank) = started(one_channel_song(&[NoteEvent::note(440.0, 4, Instrument::Sine)]));

        seq.tick(&bank);
        let state = bank.snapshot(0);
        assert!(state.active);
        assert_eq!(state.frequency, 440.0);
        assert_eq!(seq.cursor(0), Cursor { row: 1, remaining: 3 });

        for expected in [2, 1, 0] {
            seq.tick(&bank);
            assert!(bank.is_active(0));
            assert_eq!(seq.cursor(0).remaining, expected);
        }

        // Tick 5: past the end of the pattern
        seq.tick(&bank);
        assert!(!bank.is_active(0));
        assert!(!seq.is_playing());
    }

    #[test]
    fn zero_duration_occupies_one_tick() {
        let (mut seq, bank) = started(one_channel_song(&[
            NoteEvent::note(220.0, 0, Instrument::Saw),
            NoteEvent::note(330.0, 0, Instrument::Saw),
        ]));

        seq.tick(&bank);
        assert_eq!(bank.snapshot(0).frequency, 220.0);
        seq.tick(&bank);
        assert_eq!(bank.snapshot(0).frequency, 330.0);
        seq.tick(&bank);
        assert!(!seq.is_playing());
    }

    #[test]
    fn rest_silences_channel() {
        let (mut seq, bank) = started(one_channel_song(&[
            NoteEvent::note(440.0, 1, Instrument::Square),
            NoteEvent::rest(2),
            NoteEvent::note(660.0, 1, Instrument::Square),
        ]));

        seq.tick(&bank);
        assert!(bank.is_active(0));
        seq.tick(&bank);
        assert!(!bank.is_active(0));
        seq.tick(&bank);
        assert!(!bank.is_active(0));
        seq.tick(&bank);
        assert!(bank.is_active(0));
        assert_eq!(bank.snapshot(0).frequency, 660.0);
    }

    #[test]
    fn stop_silences_every_slot() {
        let (mut seq, bank) = started(one_channel_song(&[NoteEvent::note(440.0, 8, Instrument::Sine)]));
        seq.tick(&bank);
        for ch in 1..MAX_CHANNELS {
            bank.note_on(ch, 100.0, Instrument::Saw);
        }
        seq.stop(&bank);
        assert_eq!(bank.active_count(), 0);
        assert_eq!(seq.state(), SequencerState::Stopped);

        // Stopping again is harmless
        bank.note_on(2, 100.0, Instrument::Saw);
        seq.stop(&bank);
        assert_eq!(bank.active_count(), 0);
    }

    #[test]
    fn missing_patterns_are_skipped() {
        let mut song = Song::with_channels("skip", 1);
        let mut pat = Pattern::new(1, 1);
        pat.push(0, NoteEvent::note(440.0, 2, Instrument::Sine));
        song.add_pattern(pat);
        song.order = vec![2, 1, 2];

        let (mut seq, bank) = started(song);
        let mut sounding_ticks = 0;
        let mut guard = 0;
        while seq.is_playing() {
            seq.tick(&bank);
            if bank.is_active(0) {
                sounding_ticks += 1;
                assert_eq!(seq.order_index(), 1);
            }
            guard += 1;
            assert!(guard < 100, "sequencer never stopped");
        }
        assert_eq!(sounding_ticks, 2);
        assert_eq!(bank.active_count(), 0);
    }

    #[test]
    fn empty_order_stops_on_first_tick() {
        let mut song = one_channel_song(&[NoteEvent::note(440.0, 1, Instrument::Sine)]);
        song.order.clear();
        let (mut seq, bank) = started(song);
        seq.tick(&bank);
        assert!(!seq.is_playing());
    }

    #[test]
    fn order_of_only_missing_patterns_stops() {
        let mut song = Song::with_channels("none", 2);
        song.order = vec![5, 6, 7];
        let (mut seq, bank) = started(song);
        seq.tick(&bank);
        assert!(!seq.is_playing());
        assert_eq!(seq.order_index(), 3);
    }

    #[test]
    fn pattern_ends_when_longest_channel_ends() {
        let mut song = Song::with_channels("two", 2);
        let mut pat = Pattern::new(0, 2);
        pat.push(0, NoteEvent::note(440.0, 4, Instrument::Sine));
        pat.push(1, NoteEvent::note(220.0, 1, Instrument::Square));
        song.add_pattern(pat);
        song.add_order(0);

        let (mut seq, bank) = started(song);
        seq.tick(&bank);
        assert_eq!(bank.active_count(), 2);
        seq.tick(&bank);
        assert!(bank.is_active(0));
        assert!(!bank.is_active(1));
        seq.tick(&bank);
        seq.tick(&bank);
        assert!(seq.is_playing());
        seq.tick(&bank);
        assert!(!seq.is_playing());
    }

    #[test]
    fn next_pattern_starts_without_gap() {
        let mut song = Song::with_channels("seq", 1);
        let mut a = Pattern::new(0, 1);
        a.push(0, NoteEvent::note(440.0, 2, Instrument::Sine));
        let mut b = Pattern::new(1, 1);
        b.push(0, NoteEvent::note(880.0, 2, Instrument::Saw));
        song.add_pattern(a);
        song.add_pattern(b);
        song.order = vec![0, 1];

        let (mut seq, bank) = started(song);
        let mut heard = Vec::new();
        while seq.is_playing() {
            seq.tick(&bank);
            let state = bank.snapshot(0);
            heard.push(if state.active { state.frequency } else { 0.0 });
        }
        assert_eq!(heard, vec![440.0, 440.0, 880.0, 880.0, 0.0]);
    }

    #[test]
    fn repeated_pattern_restarts_cursors() {
        let mut song = one_channel_song(&[
            NoteEvent::note(100.0, 1, Instrument::Sine),
            NoteEvent::note(200.0, 1, Instrument::Sine),
        ]);
        song.order = vec![0, 0];

        let (mut seq, bank) = started(song);
        let mut heard = Vec::new();
        for _ in 0..4 {
            seq.tick(&bank);
            heard.push(bank.snapshot(0).frequency);
        }
        assert_eq!(heard, vec![100.0, 200.0, 100.0, 200.0]);
        assert_eq!(seq.order_index(), 1);
    }

    #[test]
    fn channels_past_pattern_count_stay_silent() {
        let mut song = Song::with_channels("wide", 3);
        let mut pat = Pattern::new(0, 1);
        pat.push(0, NoteEvent::note(440.0, 2, Instrument::Sine));
        pat.push(2, NoteEvent::note(999.0, 2, Instrument::Sine));
        song.add_pattern(pat);
        song.add_order(0);

        let (mut seq, bank) = started(song);
        seq.tick(&bank);
        assert!(bank.is_active(0));
        assert!(!bank.is_active(1));
        assert!(!bank.is_active(2));
    }

    #[test]
    fn empty_pattern_advances_immediately() {
        let mut song = Song::with_channels("gap", 2);
        song.add_pattern(Pattern::new(0, 2));
        let mut pat = Pattern::new(1, 2);
        pat.push(1, NoteEvent::note(330.0, 1, Instrument::Triangle));
        song.add_pattern(pat);
        song.order = vec![0, 1];

        let (mut seq, bank) = started(song);
        seq.tick(&bank);
        assert!(bank.is_active(1));
        assert_eq!(seq.order_index(), 1);
    }

    #[test]
    fn restart_resets_cursors() {
        let (mut seq, bank) = started(one_channel_song(&[
            NoteEvent::note(100.0, 3, Instrument::Sine),
            NoteEvent::note(200.0, 3, Instrument::Sine),
        ]));
        for _ in 0..4 {
            seq.tick(&bank);
        }
        assert_eq!(bank.snapshot(0).frequency, 200.0);

        seq.start();
        assert_eq!(seq.cursor(0), Cursor::default());
        seq.tick(&bank);
        assert_eq!(bank.snapshot(0).frequency, 100.0);
    }

    #[test]
    fn position_tracks_order_and_ticks() {
        let mut song = one_channel_song(&[NoteEvent::note(100.0, 2, Instrument::Sine)]);
        song.order = vec![0, 0];
        let (mut seq, bank) = started(song);
        seq.tick(&bank);
        seq.tick(&bank);
        seq.tick(&bank);
        let pos = seq.position();
        assert_eq!(pos.tick, 3);
        assert_eq!(pos.order_index, 1);
        assert_eq!(pos.pattern_id, Some(0));
    }

    #[test]
    fn played_ticks_match_song_duration() {
        let mut song = Song::with_channels("len", 2);
        let mut a = Pattern::new(0, 2);
        a.push(0, NoteEvent::note(440.0, 3, Instrument::Sine));
        a.push(0, NoteEvent::rest(0));
        a.push(1, NoteEvent::note(220.0, 5, Instrument::Saw));
        let mut b = Pattern::new(1, 2);
        b.push(1, NoteEvent::note(110.0, 2, Instrument::Square));
        song.add_pattern(a);
        song.add_pattern(b);
        song.order = vec![0, 3, 1, 0];

        let expected = song.duration_ticks();
        let (mut seq, bank) = started(song);
        while seq.is_playing() {
            seq.tick(&bank);
        }
        // One extra tick observes the end of the order.
        assert_eq!(seq.position().tick, expected + 1);
    }
}
