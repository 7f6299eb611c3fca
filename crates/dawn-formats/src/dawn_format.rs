//! `.dawn` song format parser.
//!
//! ```text
//! TITLE "Demo"
//! TEMPO 140
//! TPB 4
//! CHANNELS 2
//! CH1 INSTR SQUARE
//! ORDER 0 1 0
//!
//! PATTERN 0
//! CH1: C4 E4 G4 - ,
//!      C5 - x ;
//! CH2: C3 - - - ;
//! ```
//!
//! Keywords are case-insensitive. A channel's tokens run until the first
//! `;`, across as many lines as needed.

use dawn_ir::{Instrument, NoteEvent, Pattern, PatternId, Song, MAX_CHANNELS, MAX_PATTERN_ROWS};
use tracing::{debug, warn};

use crate::note::note_to_frequency;
use crate::{leading_int, strip_keyword, FormatError};

/// Channel count of a song that doesn't declare one.
pub const DEFAULT_CHANNELS: u8 = 5;

/// Pattern ids must be below this, and a song holds at most this many patterns.
pub const MAX_PATTERNS: usize = 64;

/// Longest order list kept.
pub const MAX_ORDER: usize = 256;

/// Pitch given to noise hits so the sequencer treats them as notes.
pub const NOISE_FREQUENCY: f32 = 440.0;

/// Non-blank, non-comment lines with 1-based line numbers.
struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.lines().enumerate(),
        }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (idx, raw) = self.inner.next()?;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return Some((idx + 1, line));
        }
    }
}

/// Parse `.dawn` text into a song.
pub fn load_dawn(text: &str) -> Result<Song, FormatError> {
    let mut song = Song::with_channels("", DEFAULT_CHANNELS);
    let mut lines = Lines::new(text);
    let mut current: Option<Pattern> = None;

    while let Some((line_no, line)) = lines.next() {
        if let Some(pattern) = current.as_mut() {
            if strip_keyword(line, "CH").is_some() {
                parse_channel(line_no, line, &mut lines, pattern, &song)?;
                continue;
            }
            // Any other line closes the pattern and is read as a global line.
            if let Some(done) = current.take() {
                song.add_pattern(done);
            }
        }

        if let Some(rest) = strip_keyword(line, "PATTERN") {
            current = Some(begin_pattern(line_no, rest, &song)?);
            continue;
        }

        if !parse_global(line, &mut song) {
            warn!(line = line_no, "dawn: malformed global line: {}", line);
        }
    }

    if let Some(done) = current.take() {
        song.add_pattern(done);
    }

    debug!(
        title = %song.title,
        patterns = song.patterns.len(),
        order = song.order.len(),
        "dawn: parsed song"
    );
    Ok(song)
}

fn begin_pattern(line_no: usize, rest: &str, song: &Song) -> Result<Pattern, FormatError> {
    let id = leading_int(rest)
        .filter(|id| (0..MAX_PATTERNS as i64).contains(id))
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
    Ok(Pattern::new(id as PatternId, song.channel_count))
}

/// Parse a `CHn: tokens...` block, pulling continuation lines until `;`.
fn parse_channel(
    line_no: usize,
    line: &str,
    lines: &mut Lines<'_>,
    pattern: &mut Pattern,
    song: &Song,
) -> Result<(), FormatError> {
    let channel = channel_number(&line[2..]).ok_or_else(|| FormatError::InvalidChannel {
        line: line_no,
        text: line.to_string(),
    })?;
    let (_, after) = line.split_once(':').ok_or_else(|| FormatError::MissingColon {
        line: line_no,
        text: line.to_string(),
    })?;

    let mut block = vec![(line_no, after.trim())];
    while !block.iter().any(|(_, text)| text.contains(';')) {
        match lines.next() {
            Some(next) => block.push(next),
            None => break,
        }
    }

    let instrument = song.channel_instruments[channel];
    let mut rows = Vec::new();

    'tokens: for (token_line, text) in block {
        for raw in text.split_whitespace() {
            let (token, terminated) = match raw.strip_suffix(';') {
                Some(token) => (token, true),
                None => (raw.strip_suffix(',').unwrap_or(raw), false),
            };
            if !token.is_empty() {
                if rows.len() >= MAX_PATTERN_ROWS {
                    return Err(FormatError::ChannelTooLong {
                        line: token_line,
                        limit: MAX_PATTERN_ROWS,
                    });
                }
                rows.push(token_to_event(token_line, token, instrument)?);
            }
            if terminated {
                break 'tokens;
            }
        }
    }

    pattern.set_rows(channel, rows);
    Ok(())
}

/// Zero-based channel from the digits after `CH`, if in range.
fn channel_number(text: &str) -> Option<usize> {
    let n = leading_int(text)?;
    (1..=MAX_CHANNELS as i64)
        .contains(&n)
        .then(|| (n - 1) as usize)
}

fn token_to_event(line: usize, token: &str, instrument: Instrument) -> Result<NoteEvent, FormatError> {
    match token {
        "-" => Ok(NoteEvent {
            instrument,
            ..NoteEvent::rest(0)
        }),
        "x" | "X" => Ok(NoteEvent::note(NOISE_FREQUENCY, 0, Instrument::Noise)),
        name => note_to_frequency(name)
            .filter(|f| *f > 0.0)
            .map(|f| NoteEvent::note(f, 0, instrument))
            .ok_or_else(|| FormatError::InvalidNote {
                line,
                token: token.to_string(),
            }),
    }
}

/// Apply a global key. Returns false when the line is malformed.
/// Unknown keys are ignored.
fn parse_global(line: &str, song: &mut Song) -> bool {
    if let Some(rest) = strip_keyword(line, "TITLE") {
        return parse_title(rest, song);
    }
    if let Some(rest) = strip_keyword(line, "TEMPO") {
        if let Some(bpm) = leading_int(rest).filter(|v| *v > 0) {
            song.bpm = bpm.min(u32::MAX as i64) as u32;
        }
        return true;
    }
    if let Some(rest) = strip_keyword(line, "TPB") {
        if let Some(tpb) = leading_int(rest).filter(|v| *v > 0) {
            song.ticks_per_beat = tpb.min(u32::MAX as i64) as u32;
        }
        return true;
    }
    if let Some(rest) = strip_keyword(line, "CHANNELS") {
        if let Some(n) = leading_int(rest).filter(|n| (1..=MAX_CHANNELS as i64).contains(n)) {
            song.set_channel_count(n as u8);
        }
        return true;
    }
    if let Some(rest) = strip_keyword(line, "ORDER") {
        return parse_order(rest, song);
    }
    if let Some(rest) = strip_keyword(line, "CH") {
        return parse_channel_instrument(rest, song);
    }
    true
}

fn parse_title(rest: &str, song: &mut Song) -> bool {
    match rest.split_once('"') {
        Some((_, quoted)) => match quoted.split_once('"') {
            Some((title, _)) => {
                song.set_title(title);
                true
            }
            None => false,
        },
        None => {
            song.set_title(rest.trim());
            true
        }
    }
}

fn parse_order(rest: &str, song: &mut Song) -> bool {
    let mut ok = true;
    song.order.clear();
    for token in rest.split_whitespace() {
        if song.order.len() >= MAX_ORDER {
            warn!("dawn: order list truncated at {} entries", MAX_ORDER);
            break;
        }
        match leading_int(token).and_then(|id| PatternId::try_from(id).ok()) {
            Some(id) => song.order.push(id),
            None => ok = false,
        }
    }
    ok
}

/// `CHn INSTR NAME`
fn parse_channel_instrument(rest: &str, song: &mut Song) -> bool {
    let Some(channel) = channel_number(rest) else {
        return false;
    };
    let upper = rest.to_ascii_uppercase();
    let Some(pos) = upper.find("INSTR") else {
        return false;
    };
    song.channel_instruments[channel] = Instrument::from_name(&rest[pos + "INSTR".len()..]);
    true
}
