//! Offline playback engine: sequencer and renderer on one sample clock.

use dawn_ir::Song;

use crate::channel::ChannelBank;
use crate::clock::TickClock;
use crate::mixer::Renderer;
use crate::sequencer::{PlaybackPosition, Sequencer};

/// Drives a [`Sequencer`] from the sample count instead of wall-clock time.
///
/// Tick `n` fires at the sample [`TickClock::tick_start_sample`] gives for
/// it, so rendering a song offline produces the same timeline as live
/// playback.
pub struct Engine {
    sequencer: Sequencer,
    renderer: Renderer,
    bank: ChannelBank,
    clock: TickClock,
    sample_rate: u32,
    /// Index of the next tick to fire
    next_tick: u64,
    /// Samples rendered since `play`
    sample_pos: u64,
    /// Sample at which the sequencer stopped
    end_sample: Option<u64>,
    started: bool,
}

impl Engine {
    pub fn new(song: Song, sample_rate: u32) -> Self {
        let clock = TickClock::from_song(&song);
        Self {
            sequencer: Sequencer::new(song),
            renderer: Renderer::new(sample_rate),
            bank: ChannelBank::new(),
            clock,
            sample_rate,
            next_tick: 0,
            sample_pos: 0,
            end_sample: None,
            started: false,
        }
    }

    /// Start playback from the top of the song.
    pub fn play(&mut self) {
        self.sequencer.start();
        self.next_tick = 0;
        self.sample_pos = 0;
        self.end_sample = None;
        self.started = true;
    }

    /// Stop playback; subsequent output is silence.
    pub fn stop(&mut self) {
        self.sequencer.stop(&self.bank);
        self.end_sample.get_or_insert(self.sample_pos);
    }

    /// Fill `output`, firing ticks as their start samples are reached.
    pub fn render(&mut self, output: &mut [f32]) {
        let mut offset = 0;

        while offset < output.len() {
            if !self.sequencer.is_playing() {
                self.renderer.render(&self.bank, &mut output[offset..]);
                self.sample_pos += (output.len() - offset) as u64;
                return;
            }

            let due = self.clock.tick_start_sample(self.next_tick, self.sample_rate);
            if due <= self.sample_pos {
                self.sequencer.tick(&self.bank);
                self.next_tick += 1;
                if !self.sequencer.is_playing() {
                    self.end_sample = Some(self.sample_pos);
                }
                continue;
            }

            let span = ((due - self.sample_pos) as usize).min(output.len() - offset);
            self.renderer.render(&self.bank, &mut output[offset..offset + span]);
            offset += span;
            self.sample_pos += span as u64;
        }
    }

    /// True once playback was started and has since stopped.
    pub fn is_finished(&self) -> bool {
        self.started && !self.sequencer.is_playing()
    }

    pub fn is_playing(&self) -> bool {
        self.sequencer.is_playing()
    }

    /// Sample index where playback ended, once it has.
    pub fn end_sample(&self) -> Option<u64> {
        self.end_sample
    }

    pub fn position(&self) -> PlaybackPosition {
        self.sequencer.position()
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    pub fn bank(&self) -> &ChannelBank {
        &self.bank
    }

    pub fn song(&self) -> &Song {
        self.sequencer.song()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use dawn_ir::{Instrument, NoteEvent, Pattern};

    fn beeps() -> Song {
        let mut song = Song::with_channels("beeps", 1);
        song.bpm = 120;
        song.ticks_per_beat = 4;
        let mut pat = Pattern::new(0, 1);
        pat.push(0, NoteEvent::note(441.0, 2, Instrument::Square));
        pat.push(0, NoteEvent::rest(2));
        song.add_pattern(pat);
        song.add_order(0);
        song
    }

    #[test]
    fn silent_before_play() {
        let mut engine = Engine::new(beeps(), 44_100);
        let mut buf = vec![1.0f32; 512];
        engine.render(&mut buf);
        assert!(buf.iter().all(|&s| s == 0.0));
        assert!(!engine.is_finished());
    }

    #[test]
    fn note_then_rest_then_end() {
        let mut engine = Engine::new(beeps(), 44_100);
        engine.play();

        // 0.125 s per tick: 2 ticks of note, 2 of rest
        let tick = 5_512;
        let mut buf = vec![0.0f32; 44_100];
        engine.render(&mut buf);

        assert!(buf[..2 * tick].iter().any(|&s| s != 0.0));
        assert!(buf[2 * tick + 2..4 * tick].iter().all(|&s| s == 0.0));
        assert!(engine.is_finished());
        assert_eq!(engine.end_sample(), Some(engine.clock().tick_start_sample(4, 44_100)));
    }

    #[test]
    fn chunk_size_does_not_change_output() {
        let mut a = Engine::new(beeps(), 22_050);
        let mut b = Engine::new(beeps(), 22_050);
        a.play();
        b.play();

        let mut whole = vec![0.0f32; 12_000];
        a.render(&mut whole);

        let mut chunked = vec![0.0f32; 12_000];
        for chunk in chunked.chunks_mut(333) {
            b.render(chunk);
        }
        assert_eq!(whole, chunked);
    }

    #[test]
    fn stop_silences_output() {
        let mut engine = Engine::new(beeps(), 44_100);
        engine.play();
        let mut buf = vec![0.0f32; 100];
        engine.render(&mut buf);
        engine.stop();
        engine.render(&mut buf);
        assert!(buf.iter().all(|&s| s == 0.0));
        assert_eq!(engine.end_sample(), Some(100));
    }
}
