//! Row-sheet song format.
//!
//! ```text
//! BPM 100
//! INSTR 0 SQUARE
//! INSTR 1 SAW
//! PATTERN 0
//! 00 C-4 q 0
//! 01 --- e --
//! 02 G-4 1/8 1
//! END
//! ORDER 0,0
//! ```
//!
//! A sheet drives a single channel at a fixed 96 ticks per beat, so note
//! lengths are exact down to 1/384 of a whole note.

use dawn_ir::{Instrument, NoteEvent, Pattern, PatternId, Song, MAX_PATTERN_ROWS};
use tracing::{debug, warn};

use crate::dawn_format::{MAX_ORDER, MAX_PATTERNS};
use crate::note::{length_to_ticks, note_to_frequency};
use crate::{leading_int, strip_keyword, FormatError};

/// Tick resolution of every sheet song.
pub const SHEET_TICKS_PER_BEAT: u32 = 96;

/// Instrument table built from `INSTR id WAVE` lines.
#[derive(Default)]
struct Instruments {
    entries: Vec<(i64, Instrument)>,
}

impl Instruments {
    fn define(&mut self, id: i64, instrument: Instrument) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = instrument,
            None => self.entries.push((id, instrument)),
        }
    }

    fn lookup(&self, token: &str) -> Instrument {
        if token == "--" {
            return Instrument::default();
        }
        let Some(id) = leading_int(token) else {
            return Instrument::default();
        };
        self.entries
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, instrument)| *instrument)
            .unwrap_or_else(|| {
                warn!("sheet: undefined instrument {}, using sine", id);
                Instrument::default()
            })
    }
}

/// Parse row-sheet text into a single-channel song.
pub fn load_sheet(text: &str) -> Result<Song, FormatError> {
    let mut song = Song::with_channels("", 1);
    song.ticks_per_beat = SHEET_TICKS_PER_BEAT;

    let mut instruments = Instruments::default();
    let mut current: Option<Pattern> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(rest) = strip_keyword(line, "BPM") {
            match leading_int(rest).filter(|bpm| *bpm > 0) {
                Some(bpm) => song.bpm = bpm.min(u32::MAX as i64) as u32,
                None => warn!(line = line_no, "sheet: ignoring tempo: {}", line),
            }
            continue;
        }

        if let Some(rest) = strip_keyword(line, "INSTR") {
            let mut fields = rest.split_whitespace();
            match (fields.next().and_then(leading_int), fields.next()) {
                (Some(id), Some(wave)) => instruments.define(id, Instrument::from_name(wave)),
                _ => warn!(line = line_no, "sheet: malformed instrument: {}", line),
            }
            continue;
        }

        if let Some(rest) = strip_keyword(line, "PATTERN") {
            if let Some(done) = current.take() {
                song.add_pattern(done);
            }
            current = Some(begin_pattern(line_no, rest, &song)?);
            continue;
        }

        if line.eq_ignore_ascii_case("END") {
            match current.take() {
                Some(done) => {
                    song.add_pattern(done);
                }
                None => warn!(line = line_no, "sheet: END outside a pattern"),
            }
            continue;
        }

        if let Some(rest) = strip_keyword(line, "ORDER") {
            parse_order(line_no, rest, &mut song);
            continue;
        }

        match current.as_mut() {
            Some(pattern) => {
                let event = parse_row(line_no, line, &instruments)?;
                if !pattern.push(0, event) {
                    return Err(FormatError::ChannelTooLong {
                        line: line_no,
                        limit: MAX_PATTERN_ROWS,
                    });
                }
            }
            None => warn!(line = line_no, "sheet: row outside a pattern: {}", line),
        }
    }

    if let Some(done) = current.take() {
        warn!("sheet: last pattern has no END");
        song.add_pattern(done);
    }

    debug!(
        patterns = song.patterns.len(),
        order = song.order.len(),
        "sheet: parsed song"
    );
    Ok(song)
}

fn begin_pattern(line_no: usize, rest: &str, song: &Song) -> Result<Pattern, FormatError> {
    let id = leading_int(rest)
        .and_then(|id| PatternId::try_from(id).ok())
        .ok_or_else(|| FormatError::InvalidPatternId {
            line: line_no,
            text: rest.trim().to_string(),
        })?;
    if song.patterns.len() >= MAX_PATTERNS {
        return Err(FormatError::TooManyPatterns {
            line: line_no,
            limit: MAX_PATTERNS,
        });
    }
    Ok(Pattern::new(id, 1))
}

/// `NN NOTE LENGTH [INSTR]`. The row number is informational; rows play in
/// file order.
fn parse_row(line_no: usize, line: &str, instruments: &Instruments) -> Result<NoteEvent, FormatError> {
    let mut fields = line.split_whitespace();
    let (Some(_row), Some(note), Some(length)) = (fields.next(), fields.next(), fields.next()) else {
        return Err(FormatError::MalformedRow {
            line: line_no,
            text: line.to_string(),
        });
    };
    let duration = length_to_ticks(length, SHEET_TICKS_PER_BEAT);

    if note.starts_with("---") {
        return Ok(NoteEvent::rest(duration));
    }

    let instrument = fields
        .next()
        .map(|token| instruments.lookup(token))
        .unwrap_or_default();

    match note_to_frequency(note) {
        Some(frequency) => Ok(NoteEvent::note(frequency, duration, instrument)),
        None => {
            warn!(line = line_no, "sheet: unknown note '{}', resting", note);
            Ok(NoteEvent::rest(duration))
        }
    }
}

/// `ORDER 0,1,2` (whitespace also separates).
fn parse_order(line_no: usize, rest: &str, song: &mut Song) {
    song.order.clear();
    for token in rest
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
    {
        if song.order.len() >= MAX_ORDER {
            warn!(line = line_no, "sheet: order list truncated at {} entries", MAX_ORDER);
            break;
        }
        match leading_int(token).and_then(|id| PatternId::try_from(id).ok()) {
            Some(id) => song.order.push(id),
            None => warn!(line = line_no, "sheet: skipping order entry '{}'", token),
        }
    }
}
