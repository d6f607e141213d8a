//! Styled-text model and the envelope parser.
//!
//! Block content is either plain text or a versioned JSON envelope of
//! paragraphs of styled runs. Parsing never fails: anything that is not a
//! well-formed envelope becomes one plain paragraph holding the raw text.

use serde::{Deserialize, Serialize};

use crate::ModelError;

pub const ENVELOPE_FORMAT: &str = "memoir.styled-text";
pub const ENVELOPE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    /// Accepts `RRGGBB` with or without a leading `#`.
    pub fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Malformed colors resolve to black.
    pub fn normalize(value: &str) -> Self {
        Self::parse_hex(value).unwrap_or(Self::BLACK)
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            f32::from(self.0) / 255.0,
            f32::from(self.1) / 255.0,
            f32::from(self.2) / 255.0,
        )
    }
}

/// A span of text with one set of attributes. `None` font attributes fall
/// back to the manuscript defaults when laid out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyledRun {
    pub text: String,
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    /// Parsed but not drawn by the renderer.
    pub underline: bool,
    pub color: Rgb,
}

impl StyledRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Same attributes, different text.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    pub runs: Vec<StyledRun>,
}

impl Paragraph {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            runs: vec![StyledRun::plain(text)],
        }
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    pub fn is_blank(&self) -> bool {
        self.runs.iter().all(|run| run.text.trim().is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EnvelopeRecord {
    format: String,
    version: u32,
    #[serde(default)]
    paragraphs: Vec<ParagraphRecord>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ParagraphRecord {
    runs: Vec<RunRecord>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct RunRecord {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    font_size: Option<f64>,
    bold: bool,
    italic: bool,
    underline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<String>,
}

impl From<RunRecord> for StyledRun {
    fn from(record: RunRecord) -> Self {
        Self {
            text: record.text,
            font_family: record
                .font_family
                .map(|family| family.trim().to_string())
                .filter(|family| !family.is_empty()),
            font_size: record.font_size.filter(|size| size.is_finite() && *size > 0.0),
            bold: record.bold,
            italic: record.italic,
            underline: record.underline,
            color: record
                .color
                .as_deref()
                .map(Rgb::normalize)
                .unwrap_or(Rgb::BLACK),
        }
    }
}

impl From<&StyledRun> for RunRecord {
    fn from(run: &StyledRun) -> Self {
        Self {
            text: run.text.clone(),
            font_family: run.font_family.clone(),
            font_size: run.font_size,
            bold: run.bold,
            italic: run.italic,
            underline: run.underline,
            color: Some(run.color.to_hex()),
        }
    }
}

pub fn looks_like_envelope(content: &str) -> bool {
    content.trim_start().starts_with('{')
}

pub fn parse_envelope(content: &str) -> Result<Vec<Paragraph>, ModelError> {
    let record: EnvelopeRecord =
        serde_json::from_str(content).map_err(|err| ModelError::Envelope(err.to_string()))?;
    if record.format != ENVELOPE_FORMAT {
        return Err(ModelError::Envelope(format!(
            "unknown format {:?}",
            record.format
        )));
    }
    if record.version != ENVELOPE_VERSION {
        return Err(ModelError::Envelope(format!(
            "unsupported version {}",
            record.version
        )));
    }

    Ok(record
        .paragraphs
        .into_iter()
        .map(|paragraph| Paragraph {
            runs: paragraph.runs.into_iter().map(StyledRun::from).collect(),
        })
        .collect())
}

/// Parses block content into paragraphs, degrading to plain text.
pub fn parse(content: &str) -> Vec<Paragraph> {
    if looks_like_envelope(content)
        && let Ok(paragraphs) = parse_envelope(content)
    {
        return paragraphs;
    }
    vec![Paragraph::plain(content)]
}

pub fn to_envelope(paragraphs: &[Paragraph]) -> String {
    let record = EnvelopeRecord {
        format: ENVELOPE_FORMAT.to_string(),
        version: ENVELOPE_VERSION,
        paragraphs: paragraphs
            .iter()
            .map(|paragraph| ParagraphRecord {
                runs: paragraph.runs.iter().map(RunRecord::from).collect(),
            })
            .collect(),
    };
    serde_json::to_string(&record).unwrap_or_default()
}

/// Text projection used for word counting: paragraphs joined by newlines.
pub fn plain_text(content: &str) -> String {
    parse(content)
        .iter()
        .map(Paragraph::text)
        .collect::<Vec<_>>()
        .join("\n")
}
