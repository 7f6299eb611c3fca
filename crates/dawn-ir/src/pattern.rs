//! Patterns: one row-sequence of note events per channel.

use alloc::vec::Vec;
use arrayvec::ArrayVec;

use crate::event::NoteEvent;
use crate::song::MAX_CHANNELS;

/// Pattern identifier, as referenced by the order list.
pub type PatternId = u32;

/// Maximum number of events in one channel of one pattern.
pub const MAX_PATTERN_ROWS: usize = 256;

/// A reusable musical phrase.
///
/// Channels may have different lengths. Channels at or beyond
/// `channel_count` read as empty.
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    pub id: PatternId,
    /// Number of channels this pattern defines (at most [`MAX_CHANNELS`])
    pub channel_count: u8,
    channels: ArrayVec<Vec<NoteEvent>, MAX_CHANNELS>,
}

impl Pattern {
    /// Create an empty pattern.
    pub fn new(id: PatternId, channel_count: u8) -> Self {
        let mut channels = ArrayVec::new();
        for _ in 0..MAX_CHANNELS {
            channels.push(Vec::new());
        }
        Self {
            id,
            channel_count: channel_count.min(MAX_CHANNELS as u8),
            channels,
        }
    }

    /// The row-sequence for a channel. Empty past `channel_count`.
    pub fn rows(&self, channel: usize) -> &[NoteEvent] {
        if channel >= self.channel_count as usize {
            return &[];
        }
        self.channels.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace a channel's row-sequence, truncated to [`MAX_PATTERN_ROWS`].
    ///
    /// Writes to slots past `channel_count` are kept but not played.
    pub fn set_rows(&mut self, channel: usize, mut rows: Vec<NoteEvent>) {
        rows.truncate(MAX_PATTERN_ROWS);
        if let Some(slot) = self.channels.get_mut(channel) {
            *slot = rows;
        }
    }

    /// Append one event to a channel. Returns false when the channel is full
    /// or out of range.
    pub fn push(&mut self, channel: usize, event: NoteEvent) -> bool {
        match self.channels.get_mut(channel) {
            Some(rows) if rows.len() < MAX_PATTERN_ROWS => {
                rows.push(event);
                true
            }
            _ => false,
        }
    }

    /// Ticks until every channel has played its last event.
    pub fn length_ticks(&self) -> u64 {
        self.length_over(self.channel_count as usize)
    }

    /// Like [`Pattern::length_ticks`], counting only the first `channels` channels.
    pub fn length_over(&self, channels: usize) -> u64 {
        (0..channels)
            .map(|ch| self.rows(ch).iter().map(|ev| ev.ticks() as u64).sum::<u64>())
            .max()
            .unwrap_or(0)
    }

    /// Iterate over every playable event with its channel index.
    pub fn events(&self) -> impl Iterator<Item = (usize, &NoteEvent)> {
        (0..self.channel_count as usize)
            .flat_map(move |ch| self.rows(ch).iter().map(move |ev| (ch, ev)))
    }
}
