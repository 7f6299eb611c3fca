//! Headless controller for the dawn tracker.
//!
//! Provides one API for loading songs, live playback and offline rendering,
//! shared by the CLI and the integration tests.

mod playback;
mod wav;

use dawn_audio::{AudioOutput, CpalOutput};
use dawn_engine::{ChannelBank, Engine, Renderer, TickClock};
use std::path::Path;
use std::sync::Arc;

use playback::SequencerThread;

// Re-export common types so callers don't need the lower crates directly.
pub use dawn_audio::AudioError;
pub use dawn_engine::{PlaybackPosition, DEFAULT_SAMPLE_RATE};
pub use dawn_formats::{FormatError, SongFormat};
pub use dawn_ir::{analyze, Song, SongFeatures};

pub use wav::{samples_to_wav, write_wav};

/// Samples rendered per engine call during offline rendering.
const RENDER_CHUNK: usize = 1024;

/// Headless tracker controller. Owns a song and manages playback.
pub struct Controller {
    song: Song,
    sample_rate: u32,
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    sequencer: SequencerThread,
    output: CpalOutput,
}

impl Controller {
    pub fn new() -> Self {
        Self::with_song(Song::new("Untitled"))
    }

    pub fn with_song(song: Song) -> Self {
        Self {
            song,
            sample_rate: DEFAULT_SAMPLE_RATE,
            playback: None,
        }
    }

    // --- Song management ---

    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Replace the song with one parsed from text, in whichever format the
    /// text appears to be. Stops playback first.
    pub fn load_text(&mut self, text: &str) -> Result<(), FormatError> {
        let song = dawn_formats::load_song(text)?;
        self.replace_song(song);
        Ok(())
    }

    /// Replace the song with one read from a file.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), FormatError> {
        let song = dawn_formats::load_song_file(path)?;
        self.replace_song(song);
        Ok(())
    }

    fn replace_song(&mut self, song: Song) {
        self.stop();
        self.song = song;
        let clock = TickClock::from_song(&self.song);
        if clock.was_clamped() {
            tracing::warn!(
                bpm = self.song.bpm,
                ticks_per_beat = self.song.ticks_per_beat,
                "song tempo out of range, playing at {} BPM / {} TPB",
                clock.bpm(),
                clock.ticks_per_beat()
            );
        }
    }

    pub fn features(&self) -> SongFeatures {
        analyze(&self.song)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Sample rate requested from the device on the next [`play`](Self::play).
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = if sample_rate == 0 {
            DEFAULT_SAMPLE_RATE
        } else {
            sample_rate
        };
    }

    // --- Real-time playback ---

    /// Open the audio device and start the sequencer thread.
    ///
    /// Device failures are returned; nothing is left running on error.
    pub fn play(&mut self) -> Result<(), AudioError> {
        self.stop();

        let bank = Arc::new(ChannelBank::new());
        let mut output = CpalOutput::open(bank.clone(), Renderer::new(self.sample_rate))?;
        output.start()?;

        let sequencer = SequencerThread::spawn(self.song.clone(), bank);

        tracing::info!(
            title = %self.song.title,
            device = %output.device_name(),
            sample_rate = output.sample_rate(),
            channels = output.channels(),
            "playback started"
        );

        self.playback = Some(PlaybackHandle { sequencer, output });
        Ok(())
    }

    /// Stop playback, join the sequencer thread and pause the device.
    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            pb.sequencer.stop();
            if let Err(err) = pb.output.stop() {
                tracing::warn!("failed to pause audio output: {}", err);
            }
        }
    }

    /// Block until the song plays to its end, then release the device.
    pub fn wait(&mut self) {
        if let Some(pb) = self.playback.as_mut() {
            pb.sequencer.join();
        }
        self.stop();
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| !p.sequencer.status().is_finished())
    }

    pub fn is_finished(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| p.sequencer.status().is_finished())
    }

    /// Where the live sequencer is, while playing.
    pub fn position(&self) -> Option<PlaybackPosition> {
        let pb = self.playback.as_ref()?;
        let status = pb.sequencer.status();
        if status.is_finished() {
            return None;
        }
        Some(status.position(&self.song))
    }

    // --- Offline rendering ---

    /// Render the song to mono samples, at most `max_samples` long.
    ///
    /// Output ends exactly where the sequencer stops, so its length is the
    /// start sample of the tick after the last event.
    pub fn render_samples(&self, sample_rate: u32, max_samples: usize) -> Vec<f32> {
        let mut engine = Engine::new(self.song.clone(), sample_rate);
        engine.play();

        let mut samples = Vec::new();
        let mut chunk = [0.0f32; RENDER_CHUNK];
        while !engine.is_finished() && samples.len() < max_samples {
            let n = RENDER_CHUNK.min(max_samples - samples.len());
            engine.render(&mut chunk[..n]);
            samples.extend_from_slice(&chunk[..n]);
        }

        if let Some(end) = engine.end_sample() {
            samples.truncate(end.min(samples.len() as u64) as usize);
        }
        samples
    }

    pub fn render_to_wav(&self, sample_rate: u32, max_seconds: u32) -> Vec<u8> {
        let max_samples = sample_rate as usize * max_seconds as usize;
        let samples = self.render_samples(sample_rate, max_samples);
        wav::samples_to_wav(&samples, sample_rate)
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}
