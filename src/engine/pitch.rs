// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
//! Text encodings shared with classic resampler engines: pitch bend curves and tone names.

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const TONE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Encodes pitch bend values (cents) as 12-bit two-character tokens.
///
/// Values are clamped to [-2048, 2047]. A run of identical values is written
/// once followed by `#n#`, where n is the number of extra repeats.
pub fn encode_pitch_bend(values: &[i32]) -> String {
    let mut encoded = String::with_capacity(values.len() * 2);
    let mut i = 0;
    while i < values.len() {
        let value = values[i].clamp(-2048, 2047);
        let mut run = 1;
        while i + run < values.len() && values[i + run].clamp(-2048, 2047) == value {
            run += 1;
        }

        let token = encode_value(value);
        encoded.push_str(&token);
        let repeats = run - 1;
        if repeats >= 2 {
            encoded.push('#');
            encoded.push_str(&repeats.to_string());
            encoded.push('#');
        } else {
            for _ in 0..repeats {
                encoded.push_str(&token);
            }
        }
        i += run;
    }
    encoded
}

fn encode_value(value: i32) -> String {
    let unsigned = (if value < 0 { value + 4096 } else { value }) as usize;
    let mut token = String::with_capacity(2);
    token.push(ALPHABET[(unsigned >> 6) & 0x3f] as char);
    token.push(ALPHABET[unsigned & 0x3f] as char);
    token
}

fn char_value(c: u8) -> i32 {
    match c {
        b'A'..=b'Z' => i32::from(c - b'A'),
        b'a'..=b'z' => i32::from(c - b'a') + 26,
        b'0'..=b'9' => i32::from(c - b'0') + 52,
        b'+' => 62,
        _ => 63,
    }
}

/// Decodes a pitch bend string. Both `/` and `-` read as 63 and values above
/// 2048 wrap to negative. Malformed run markers end decoding and return what
/// was read so far.
pub fn decode_pitch_bend(encoded: &str) -> Vec<i32> {
    let bytes = encoded.as_bytes();
    let mut values = Vec::with_capacity(bytes.len() / 2);
    let mut p = 0;
    while p < bytes.len() {
        if bytes[p] == b'#' {
            let Some(len) = bytes[p + 1..].iter().position(|b| *b == b'#') else {
                break;
            };
            let Ok(count) = encoded[p + 1..p + 1 + len].parse::<usize>() else {
                break;
            };
            if let Some(last) = values.last().copied() {
                values.extend(std::iter::repeat(last).take(count));
            }
            p += len + 2;
        } else {
            if p + 1 >= bytes.len() {
                break;
            }
            let mut value = (char_value(bytes[p]) << 6) + char_value(bytes[p + 1]);
            if value > 2048 {
                value -= 4096;
            }
            values.push(value);
            p += 2;
        }
    }
    values
}

/// Returns the note name for a tone number, with C4 at 60. Negative tones have no name.
pub fn tone_name(tone: i32) -> String {
    if tone < 0 {
        return String::new();
    }
    format!("{}{}", TONE_NAMES[(tone % 12) as usize], tone / 12 - 1)
}

/// Parses a note name such as `C4`, `F#3` or `Bb5` into a tone number.
pub fn parse_tone_name(name: &str) -> Option<i32> {
    let mut chars = name.chars();
    let base = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let rest = chars.as_str();
    let (accidental, octave) = match rest.chars().next()? {
        '#' => (1, &rest[1..]),
        'b' => (-1, &rest[1..]),
        _ => (0, rest),
    };
    let octave: i32 = octave.parse().ok()?;
    Some(12 * (octave + 1) + base + accidental)
}

/// Reads the integer that follows a classic flag, e.g. `g` in `g-5Mt10`.
///
/// Only the first occurrence of the flag is considered. A leading minus sign is
/// allowed. Returns None when the flag is absent or has no digits.
pub fn flag_value(flags: &str, flag: &str) -> Option<i32> {
    let start = flags.find(flag)? + flag.len();
    let bytes = flags.as_bytes();
    let mut end = start;
    while end < bytes.len() && ((bytes[end] == b'-' && end == start) || bytes[end].is_ascii_digit())
    {
        end += 1;
    }
    flags[start..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_values() {
        assert_eq!("AA", encode_pitch_bend(&[0]));
        assert_eq!("AB", encode_pitch_bend(&[1]));
        assert_eq!("//", encode_pitch_bend(&[-1]));
        assert_eq!("BA", encode_pitch_bend(&[64]));
        assert_eq!("f/", encode_pitch_bend(&[2047]));
        assert_eq!("gA", encode_pitch_bend(&[-2048]));
        assert_eq!("f/gA", encode_pitch_bend(&[5000, -5000]));
    }

    #[test]
    fn test_encode_runs() {
        assert_eq!("AAAA", encode_pitch_bend(&[0, 0]));
        assert_eq!("AA#3#", encode_pitch_bend(&[0, 0, 0, 0]));
        let values: Vec<i32> = [1; 10].into_iter().chain([0]).collect();
        assert_eq!("AB#9#AA", encode_pitch_bend(&values));
        assert_eq!("", encode_pitch_bend(&[]));
    }

    #[test]
    fn test_decode() {
        assert_eq!(vec![0, 1, -1, 64], decode_pitch_bend("AAAB//BA"));
        assert_eq!(vec![-1], decode_pitch_bend("--"));
        assert_eq!(vec![5, 5, 5, 5, 0], decode_pitch_bend("AF#3#AA"));
        // The decoder only folds values above 2048, so -2048 comes back positive.
        assert_eq!(vec![2048], decode_pitch_bend("gA"));
    }

    #[test]
    fn test_decode_malformed() {
        assert_eq!(vec![1], decode_pitch_bend("AB#3"));
        assert_eq!(vec![1], decode_pitch_bend("ABA"));
        assert_eq!(Vec::<i32>::new(), decode_pitch_bend("#2#"));
    }

    #[test]
    fn test_encode_decode_curve() {
        let curve: Vec<i32> = (-40..40).map(|i| i * 37).chain([12; 20]).collect();
        assert_eq!(curve, decode_pitch_bend(&encode_pitch_bend(&curve)));
    }

    #[test]
    fn test_tone_names() {
        assert_eq!("C4", tone_name(60));
        assert_eq!("A4", tone_name(69));
        assert_eq!("C#4", tone_name(61));
        assert_eq!("B3", tone_name(59));
        assert_eq!("C-1", tone_name(0));
        assert_eq!("", tone_name(-1));
    }

    #[test]
    fn test_parse_tone_names() {
        assert_eq!(Some(60), parse_tone_name("C4"));
        assert_eq!(Some(61), parse_tone_name("C#4"));
        assert_eq!(Some(61), parse_tone_name("Db4"));
        assert_eq!(Some(69), parse_tone_name("A4"));
        assert_eq!(Some(0), parse_tone_name("C-1"));
        assert_eq!(None, parse_tone_name("H4"));
        assert_eq!(None, parse_tone_name("C"));
        assert_eq!(None, parse_tone_name(""));
        for tone in 0..128 {
            assert_eq!(Some(tone), parse_tone_name(&tone_name(tone)));
        }
    }

    #[test]
    fn test_flag_value() {
        assert_eq!(Some(-5), flag_value("g-5Mt10", "g"));
        assert_eq!(Some(10), flag_value("g-5Mt10", "Mt"));
        assert_eq!(None, flag_value("g-5Mt10", "P"));
        assert_eq!(None, flag_value("gMt10", "g"));
        assert_eq!(Some(86), flag_value("B0P86", "P"));
    }
}
