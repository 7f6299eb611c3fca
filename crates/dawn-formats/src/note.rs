//! Note names and note lengths.

/// Highest octave a note name may carry.
pub const MAX_OCTAVE: i32 = 10;

/// Frequency in Hz for a note name like `A4`, `C-4`, `D#3` or `F+2`.
///
/// The letter must be an uppercase `A`–`G`, optionally followed by `#` or
/// `+` for a sharp. The octave is the first run of digits anywhere in the
/// name and defaults to 4; octaves above [`MAX_OCTAVE`] are rejected.
/// Returns `None` for anything else.
pub fn note_to_frequency(name: &str) -> Option<f32> {
    let name = name.trim_start();
    let mut chars = name.chars();
    let semitone = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let sharp = matches!(chars.next(), Some('#' | '+'));

    let octave = match name.find(|c: char| c.is_ascii_digit()) {
        Some(start) => {
            let digits = &name[start..];
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            digits[..end]
                .parse::<i32>()
                .ok()
                .filter(|octave| *octave <= MAX_OCTAVE)?
        }
        None => 4,
    };

    let midi = (octave + 1) * 12 + semitone + sharp as i32;
    Some((440.0 * 2f64.powf((midi - 69) as f64 / 12.0)) as f32)
}

/// Ticks for a note-length token.
///
/// Letters `w h q e s` are whole through sixteenth notes, with a quarter
/// note lasting one beat. Fractions `n/d` are a share of a whole note.
/// Anything unrecognised is a quarter note.
pub fn length_to_ticks(token: &str, ticks_per_beat: u32) -> u32 {
    match token.trim() {
        "w" => ticks_per_beat * 4,
        "h" => ticks_per_beat * 2,
        "q" => ticks_per_beat,
        "e" => ticks_per_beat / 2,
        "s" => ticks_per_beat / 4,
        other => fraction_ticks(other, ticks_per_beat).unwrap_or(ticks_per_beat),
    }
}

fn fraction_ticks(token: &str, ticks_per_beat: u32) -> Option<u32> {
    let (num, den) = token.split_once('/')?;
    let num: i64 = num.trim().parse().ok()?;
    let den: i64 = den.trim().parse().ok()?;
    if den == 0 {
        return None;
    }
    let ticks = (ticks_per_beat as f64 * 4.0 * num as f64 / den as f64).round();
    (ticks > 0.0).then_some(ticks as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn concert_pitch() {
        assert!(close(note_to_frequency("A4").unwrap(), 440.0));
        assert!(close(note_to_frequency("A-4").unwrap(), 440.0));
        assert!(close(note_to_frequency("A5").unwrap(), 880.0));
        assert!(close(note_to_frequency("A3").unwrap(), 220.0));
    }

    #[test]
    fn naturals_and_sharps() {
        assert!(close(note_to_frequency("C4").unwrap(), 261.63));
        assert!(close(note_to_frequency("C-4").unwrap(), 261.63));
        assert!(close(note_to_frequency("C#4").unwrap(), 277.18));
        assert!(close(note_to_frequency("C+4").unwrap(), 277.18));
        assert!(close(note_to_frequency("D#3").unwrap(), 155.56));
        assert!(close(note_to_frequency("B2").unwrap(), 123.47));
    }

    #[test]
    fn out_of_range_octave_is_rejected() {
        assert!(note_to_frequency("C2147483647").is_none());
        assert!(note_to_frequency("A99999999999999999999").is_none());
        assert!(note_to_frequency("C11").is_none());
        assert!(note_to_frequency("C10").is_some());
        assert!(note_to_frequency("C0").is_some());
    }

    #[test]
    fn octave_defaults_to_four() {
        assert!(close(note_to_frequency("E").unwrap(), 329.63));
    }

    #[test]
    fn rejects_non_notes() {
        assert_eq!(note_to_frequency(""), None);
        assert_eq!(note_to_frequency("H4"), None);
        assert_eq!(note_to_frequency("c4"), None);
        assert_eq!(note_to_frequency("-"), None);
        assert_eq!(note_to_frequency("---"), None);
    }

    #[test]
    fn letter_lengths() {
        assert_eq!(length_to_ticks("w", 96), 384);
        assert_eq!(length_to_ticks("h", 96), 192);
        assert_eq!(length_to_ticks("q", 96), 96);
        assert_eq!(length_to_ticks("e", 96), 48);
        assert_eq!(length_to_ticks("s", 96), 24);
    }

    #[test]
    fn fraction_lengths() {
        assert_eq!(length_to_ticks("1/4", 96), 96);
        assert_eq!(length_to_ticks("1/8", 96), 48);
        assert_eq!(length_to_ticks("1/16", 96), 24);
        assert_eq!(length_to_ticks("1/1", 96), 384);
        assert_eq!(length_to_ticks("3/8", 96), 144);
    }

    #[test]
    fn bad_lengths_fall_back_to_quarter() {
        assert_eq!(length_to_ticks("---", 96), 96);
        assert_eq!(length_to_ticks("", 96), 96);
        assert_eq!(length_to_ticks("1/0", 96), 96);
        assert_eq!(length_to_ticks("0/4", 96), 96);
        assert_eq!(length_to_ticks("1/1000", 4), 4);
    }
}
