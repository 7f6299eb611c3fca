//! Song file loaders for the dawn tracker.
//!
//! Each loader turns one text format into a [`dawn_ir::Song`]:
//!
//! - `.dawn` files: multi-channel patterns of note tokens ([`load_dawn`])
//! - row sheets: single-channel rows with note lengths ([`load_sheet`])
//!
//! [`load_song`] picks the loader by looking at the text.

mod dawn_format;
mod note;
mod sheet_format;

use std::path::Path;

use dawn_ir::Song;

pub use dawn_format::{load_dawn, DEFAULT_CHANNELS, MAX_ORDER, MAX_PATTERNS, NOISE_FREQUENCY};
pub use note::{length_to_ticks, note_to_frequency, MAX_OCTAVE};
pub use sheet_format::{load_sheet, SHEET_TICKS_PER_BEAT};

/// Error type for format parsing.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("line {line}: invalid pattern id '{text}'")]
    InvalidPatternId { line: usize, text: String },
    #[error("line {line}: too many patterns (limit {limit})")]
    TooManyPatterns { line: usize, limit: usize },
    #[error("line {line}: invalid channel in pattern: {text}")]
    InvalidChannel { line: usize, text: String },
    #[error("line {line}: malformed channel line (missing ':'): {text}")]
    MissingColon { line: usize, text: String },
    #[error("line {line}: invalid note token '{token}'")]
    InvalidNote { line: usize, token: String },
    #[error("line {line}: pattern channel too long (limit {limit} rows)")]
    ChannelTooLong { line: usize, limit: usize },
    #[error("line {line}: malformed row: {text}")]
    MalformedRow { line: usize, text: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supported song text formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SongFormat {
    Dawn,
    Sheet,
}

impl SongFormat {
    /// Guess the format from the first line only one format uses.
    /// `PATTERN` and `ORDER` appear in both and decide nothing. Defaults to
    /// `.dawn`.
    pub fn detect(text: &str) -> Self {
        const DAWN_KEYS: [&str; 5] = ["TITLE", "TEMPO", "TPB", "CHANNELS", "CH"];

        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with("BPM")
                || line.starts_with("INSTR")
                || line == "END"
                || line.starts_with(|c: char| c.is_ascii_digit())
            {
                return SongFormat::Sheet;
            }
            if DAWN_KEYS.iter().any(|key| strip_keyword(line, key).is_some()) {
                return SongFormat::Dawn;
            }
        }
        SongFormat::Dawn
    }

    pub fn name(self) -> &'static str {
        match self {
            SongFormat::Dawn => "dawn",
            SongFormat::Sheet => "sheet",
        }
    }
}

/// Parse song text in whichever format it appears to be.
pub fn load_song(text: &str) -> Result<Song, FormatError> {
    match SongFormat::detect(text) {
        SongFormat::Dawn => load_dawn(text),
        SongFormat::Sheet => load_sheet(text),
    }
}

/// Read and parse a song file.
pub fn load_song_file(path: impl AsRef<Path>) -> Result<Song, FormatError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    load_song(&text)
}

/// Case-insensitive keyword prefix match; returns the rest of the line.
pub(crate) fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let head = line.get(..keyword.len())?;
    head.eq_ignore_ascii_case(keyword)
        .then(|| &line[keyword.len()..])
}

/// Leading integer, `atoi` style: optional whitespace and sign, then digits.
pub(crate) fn leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (sign, digits) = match text.as_bytes().first() {
        Some(b'-') => (-1, &text[1..]),
        Some(b'+') => (1, &text[1..]),
        _ => (1, text),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|v| sign * v)
}
