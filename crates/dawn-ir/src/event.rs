//! Note events and instrument waveforms.

/// Waveform used to voice a note.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Instrument {
    #[default]
    Sine = 1,
    Square = 2,
    Triangle = 3,
    Saw = 4,
    Noise = 5,
}

impl Instrument {
    /// All instruments, in code order.
    pub const ALL: [Instrument; 5] = [
        Instrument::Sine,
        Instrument::Square,
        Instrument::Triangle,
        Instrument::Saw,
        Instrument::Noise,
    ];

    /// Parse an instrument name, case-insensitively.
    ///
    /// `TRI` is accepted for triangle. Unknown names fall back to sine.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        if name.eq_ignore_ascii_case("square") {
            Instrument::Square
        } else if name.eq_ignore_ascii_case("triangle") || name.eq_ignore_ascii_case("tri") {
            Instrument::Triangle
        } else if name.eq_ignore_ascii_case("saw") {
            Instrument::Saw
        } else if name.eq_ignore_ascii_case("noise") {
            Instrument::Noise
        } else {
            Instrument::Sine
        }
    }

    /// Stable numeric code, used when packing channel state.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Inverse of [`Instrument::code`]. Unknown codes map to sine.
    pub const fn from_code(code: u8) -> Self {
        match code {
            2 => Instrument::Square,
            3 => Instrument::Triangle,
            4 => Instrument::Saw,
            5 => Instrument::Noise,
            _ => Instrument::Sine,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Instrument::Sine => "sine",
            Instrument::Square => "square",
            Instrument::Triangle => "triangle",
            Instrument::Saw => "saw",
            Instrument::Noise => "noise",
        }
    }
}

/// One note or rest in a channel's row-sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NoteEvent {
    /// Pitch in Hz; 0 means rest
    pub frequency: f32,
    /// Length in ticks; 0 is played as a single tick
    pub duration: u32,
    /// Waveform for this note
    pub instrument: Instrument,
}

impl NoteEvent {
    /// A sounding note. Negative or NaN frequencies become a rest.
    pub fn note(frequency: f32, duration: u32, instrument: Instrument) -> Self {
        Self {
            frequency: if frequency > 0.0 { frequency } else { 0.0 },
            duration,
            instrument,
        }
    }

    /// A rest of the given length.
    pub const fn rest(duration: u32) -> Self {
        Self {
            frequency: 0.0,
            duration,
            instrument: Instrument::Sine,
        }
    }

    pub fn is_rest(&self) -> bool {
        self.frequency <= 0.0
    }

    /// Ticks this event occupies once played.
    pub fn ticks(&self) -> u32 {
        self.duration.max(1)
    }
}
