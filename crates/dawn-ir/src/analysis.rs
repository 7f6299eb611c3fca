//! Song feature analysis: scans a Song to report what it uses.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::fmt;

use crate::event::Instrument;
use crate::pattern::PatternId;
use crate::song::Song;

/// Summary of a song's content.
pub struct SongFeatures {
    pub instruments_used: BTreeSet<Instrument>,
    pub total_notes: usize,
    pub total_rests: usize,
    pub frequency_range: Option<(f32, f32)>,
    /// Order entries that name no pattern, in order
    pub missing_patterns: Vec<PatternId>,
    pub duration_ticks: u64,
}

/// Analyze a song.
pub fn analyze(song: &Song) -> SongFeatures {
    let mut features = SongFeatures {
        instruments_used: BTreeSet::new(),
        total_notes: 0,
        total_rests: 0,
        frequency_range: None,
        missing_patterns: song
            .order
            .iter()
            .copied()
            .filter(|id| song.pattern(*id).is_none())
            .collect(),
        duration_ticks: song.duration_ticks(),
    };

    for pattern in &song.patterns {
        for (_, event) in pattern.events() {
            if event.is_rest() {
                features.total_rests += 1;
                continue;
            }
            features.total_notes += 1;
            features.instruments_used.insert(event.instrument);
            let f = event.frequency;
            features.frequency_range = Some(match features.frequency_range {
                Some((lo, hi)) => (lo.min(f), hi.max(f)),
                None => (f, f),
            });
        }
    }

    features
}

impl fmt::Display for SongFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Notes:    {} ({} rests)", self.total_notes, self.total_rests)?;
        write!(f, "Voices:  ")?;
        if self.instruments_used.is_empty() {
            write!(f, " (none)")?;
        }
        for inst in &self.instruments_used {
            write!(f, " {}", inst.name())?;
        }
        writeln!(f)?;
        if let Some((lo, hi)) = self.frequency_range {
            writeln!(f, "Range:    {:.1} Hz - {:.1} Hz", lo, hi)?;
        }
        if !self.missing_patterns.is_empty() {
            write!(f, "Missing: ")?;
            for id in &self.missing_patterns {
                write!(f, " {}", id)?;
            }
            writeln!(f)?;
        }
        writeln!(f, "Length:   {} ticks", self.duration_ticks)
    }
}
