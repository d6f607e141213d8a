//! Standard-14 font selection, WinAnsi encoding and advance widths.

use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    Helvetica,
    Times,
    Courier,
}

impl Family {
    /// Maps an arbitrary family name onto the closest standard family.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        const MONO: &[&str] = &["courier", "mono", "consolas", "typewriter"];
        const SERIF: &[&str] = &[
            "times", "georgia", "garamond", "cambria", "palatino", "book", "baskerville", "minion",
        ];

        if MONO.iter().any(|key| name.contains(key)) {
            Family::Courier
        } else if name.contains("sans") {
            Family::Helvetica
        } else if SERIF.iter().any(|key| name.contains(key)) || name.contains("serif") {
            Family::Times
        } else {
            Family::Helvetica
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontFace {
    pub family: Family,
    pub bold: bool,
    pub italic: bool,
}

impl FontFace {
    pub fn new(family_name: &str, bold: bool, italic: bool) -> Self {
        Self {
            family: Family::from_name(family_name),
            bold,
            italic,
        }
    }

    pub fn base_font(self) -> &'static str {
        match (self.family, self.bold, self.italic) {
            (Family::Helvetica, false, false) => "Helvetica",
            (Family::Helvetica, true, false) => "Helvetica-Bold",
            (Family::Helvetica, false, true) => "Helvetica-Oblique",
            (Family::Helvetica, true, true) => "Helvetica-BoldOblique",
            (Family::Times, false, false) => "Times-Roman",
            (Family::Times, true, false) => "Times-Bold",
            (Family::Times, false, true) => "Times-Italic",
            (Family::Times, true, true) => "Times-BoldItalic",
            (Family::Courier, false, false) => "Courier",
            (Family::Courier, true, false) => "Courier-Bold",
            (Family::Courier, false, true) => "Courier-Oblique",
            (Family::Courier, true, true) => "Courier-BoldOblique",
        }
    }

    /// Resource name used inside page dictionaries, unique per face.
    pub fn resource_name(self) -> String {
        let family = match self.family {
            Family::Helvetica => 0,
            Family::Times => 1,
            Family::Courier => 2,
        };
        let index = family * 4 + usize::from(self.bold) * 2 + usize::from(self.italic);
        format!("F{}", index + 1)
    }

    /// Width of `text` in points at `size`.
    pub fn measure(self, text: &str, size: f32) -> f32 {
        let units: u32 = encode_win_ansi(text)
            .iter()
            .map(|&byte| u32::from(self.advance(byte)))
            .sum();
        units as f32 * size / 1000.0
    }

    fn advance(self, byte: u8) -> u16 {
        // Italic faces reuse the upright advances.
        let table = match (self.family, self.bold) {
            (Family::Courier, _) => return 600,
            (Family::Helvetica, false) => &HELVETICA,
            (Family::Helvetica, true) => &HELVETICA_BOLD,
            (Family::Times, false) => &TIMES_ROMAN,
            (Family::Times, true) => &TIMES_BOLD,
        };
        match byte {
            32..=126 => table[usize::from(byte - 32)],
            // Latin-1 letters and punctuation: approximate with `o`.
            _ => table[usize::from(b'o' - 32)],
        }
    }
}

/// Encodes text as windows-1252; unmappable characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        if ch.is_ascii() {
            out.push(if ch.is_ascii_control() { b' ' } else { ch as u8 });
            continue;
        }
        let (bytes, _, unmappable): (Cow<'_, [u8]>, _, bool) =
            encoding_rs::WINDOWS_1252.encode(ch.encode_utf8(&mut buf));
        match bytes.as_ref() {
            [byte] if !unmappable => out.push(*byte),
            _ => out.push(b'?'),
        }
    }
    out
}

// AFM advance widths for codes 32..=126.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];
