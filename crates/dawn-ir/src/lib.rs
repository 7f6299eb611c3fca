//! Song model types for the dawn tracker.
//!
//! Every song loader produces a [`Song`], and the playback engine reads it
//! without modification. Patterns hold one row-sequence of [`NoteEvent`]s
//! per channel; the order list sequences patterns by id.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod analysis;
mod event;
mod pattern;
pub mod song;

pub use analysis::{analyze, SongFeatures};
pub use event::{Instrument, NoteEvent};
pub use pattern::{Pattern, PatternId, MAX_PATTERN_ROWS};
pub use song::{Song, DEFAULT_BPM, DEFAULT_TICKS_PER_BEAT, MAX_CHANNELS, MAX_TITLE_LEN};
