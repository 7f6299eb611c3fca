//! Playback engine for the dawn tracker.
//!
//! The [`Sequencer`] advances through a song one tick at a time and writes
//! note-on/note-off into a shared [`ChannelBank`]. The [`Renderer`] reads the
//! bank on the audio device's schedule and mixes all channels into mono
//! samples. [`Engine`] ties the two together for offline rendering.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod channel;
mod clock;
mod engine;
mod mixer;
pub mod sequencer;
pub mod waveform;

pub use channel::{ChannelBank, ChannelState};
pub use clock::TickClock;
pub use engine::Engine;
pub use mixer::{Renderer, DEFAULT_SAMPLE_RATE};
pub use sequencer::{Cursor, PlaybackPosition, Sequencer, SequencerState};
pub use waveform::ATTENUATION;
