//! Page flow: geometry, running furniture, line breaking and draw operations.
//!
//! Coordinates are PDF points with the origin at the bottom-left corner. The
//! flow keeps a cursor at the top of the free space on the current page and
//! opens a continuation page whenever an element does not fit below it.

use std::sync::Arc;

use memoir_core::{Manuscript, Rgb};

use crate::fonts::FontFace;
use crate::images::PreparedImage;
use crate::units::mm_to_pt;

pub const HEADER_LABEL: &str = "Seite ";
pub const FURNITURE_FONT_SIZE: f32 = 10.0;
/// Vertical space the header and the footer each take from the content area.
pub const FURNITURE_BAND: f32 = 20.0;

const ASCENT: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
}

impl PageGeometry {
    pub fn from_manuscript(manuscript: &Manuscript) -> Self {
        let format = manuscript.page_format;
        let margins = manuscript.margins;
        Self {
            width: mm_to_pt(format.width_mm) as f32,
            height: mm_to_pt(format.height_mm) as f32,
            margin_left: mm_to_pt(margins.left_mm) as f32,
            margin_right: mm_to_pt(margins.right_mm) as f32,
            margin_top: mm_to_pt(margins.top_mm) as f32,
            margin_bottom: mm_to_pt(margins.bottom_mm) as f32,
        }
    }

    pub fn content_left(&self) -> f32 {
        self.margin_left
    }

    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    pub fn content_top(&self) -> f32 {
        self.height - self.margin_top - FURNITURE_BAND
    }

    pub fn content_bottom(&self) -> f32 {
        self.margin_bottom + FURNITURE_BAND
    }

    pub fn content_height(&self) -> f32 {
        self.content_top() - self.content_bottom()
    }

    pub fn has_content_area(&self) -> bool {
        self.content_width() > 0.0 && self.content_height() > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Blank page inserted to satisfy a chapter's left/right placement.
    Filler,
    ChapterStart,
    Continuation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub face: FontFace,
    pub size: f32,
    pub color: Rgb,
}

impl TextStyle {
    pub fn width_of(&self, text: &str) -> f32 {
        self.face.measure(text, self.size)
    }
}

#[derive(Debug, Clone)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        style: TextStyle,
        text: String,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
        width: f32,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        image: Arc<PreparedImage>,
    },
}

#[derive(Debug, Clone)]
pub struct LaidOutPage {
    /// 1-based, contiguous across the document.
    pub number: usize,
    pub kind: PageKind,
    pub ops: Vec<DrawOp>,
}

impl LaidOutPage {
    /// Text drawn on the page, one entry per text operation.
    pub fn text(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn image_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Image { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// One run of text inside a line, all in one style.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub style: TextStyle,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub fragments: Vec<Fragment>,
    pub width: f32,
    /// Largest font size on the line; drives the line's height.
    pub size: f32,
}

impl Line {
    fn empty(size: f32) -> Self {
        Self {
            fragments: Vec::new(),
            width: 0.0,
            size,
        }
    }

    fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    fn append(&mut self, style: TextStyle, text: &str) {
        self.width += style.width_of(text);
        if self.fragments.is_empty() {
            self.size = style.size;
        } else {
            self.size = self.size.max(style.size);
        }
        match self.fragments.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.fragments.push(Fragment {
                style,
                text: text.to_string(),
            }),
        }
    }

    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }
}

enum Token<'a> {
    Word(&'a str),
    Space,
    Break,
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut word_start: Option<usize> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        let token = match ch {
            '\r' => {
                if let Some((_, '\n')) = chars.peek() {
                    chars.next();
                }
                Some(Token::Break)
            }
            '\n' => Some(Token::Break),
            c if c.is_whitespace() => Some(Token::Space),
            _ => None,
        };
        match token {
            Some(token) => {
                if let Some(start) = word_start.take() {
                    tokens.push(Token::Word(&text[start..i]));
                }
                tokens.push(token);
            }
            None => {
                word_start.get_or_insert(i);
            }
        }
    }
    if let Some(start) = word_start {
        tokens.push(Token::Word(&text[start..]));
    }
    tokens
}

/// Greedy word wrap over styled runs. Runs of spaces and tabs collapse to one
/// space, `\r\n`, `\r` and `\n` force a break, and words wider than the line
/// are split between characters.
pub fn break_lines(runs: &[(TextStyle, &str)], max_width: f32, empty_size: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line::empty(empty_size);
    let mut pending_space: Option<TextStyle> = None;

    for (style, text) in runs {
        for token in tokenize(text) {
            match token {
                Token::Space => {
                    if !line.is_empty() {
                        pending_space = Some(*style);
                    }
                }
                Token::Break => {
                    let size = if line.is_empty() { style.size } else { line.size };
                    lines.push(std::mem::replace(&mut line, Line::empty(size)));
                    pending_space = None;
                }
                Token::Word(word) => {
                    let word_width = style.width_of(word);
                    let space_width = pending_space
                        .map(|space| space.width_of(" "))
                        .unwrap_or(0.0);

                    if !line.is_empty() && line.width + space_width + word_width > max_width {
                        lines.push(std::mem::replace(&mut line, Line::empty(style.size)));
                        pending_space = None;
                    }
                    if let Some(space) = pending_space.take() {
                        line.append(space, " ");
                    }

                    if word_width <= max_width {
                        line.append(*style, word);
                        continue;
                    }

                    let mut chunk_start = 0;
                    for (i, ch) in word.char_indices() {
                        let end = i + ch.len_utf8();
                        let chunk_width = style.width_of(&word[chunk_start..end]);
                        if line.width + chunk_width > max_width && i > chunk_start {
                            line.append(*style, &word[chunk_start..i]);
                            lines.push(std::mem::replace(&mut line, Line::empty(style.size)));
                            chunk_start = i;
                        }
                    }
                    line.append(*style, &word[chunk_start..]);
                }
            }
        }
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

pub struct PageFlow {
    geometry: PageGeometry,
    furniture: FontFace,
    pages: Vec<LaidOutPage>,
    cursor: f32,
    /// Nothing but header and footer on the current page yet.
    fresh: bool,
}

impl PageFlow {
    pub fn new(geometry: PageGeometry, furniture: FontFace) -> Self {
        Self {
            geometry,
            furniture,
            pages: Vec::new(),
            cursor: geometry.content_top(),
            fresh: true,
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Number of pages emitted so far, filler pages included.
    pub fn page_index(&self) -> usize {
        self.pages.len()
    }

    pub fn remaining(&self) -> f32 {
        self.cursor - self.geometry.content_bottom()
    }

    pub fn start_page(&mut self, kind: PageKind) {
        let number = self.pages.len() + 1;
        let geometry = self.geometry;
        let style = TextStyle {
            face: self.furniture,
            size: FURNITURE_FONT_SIZE,
            color: Rgb::BLACK,
        };
        let label = format!("{HEADER_LABEL}{number}");
        let label_width = style.width_of(&label);

        let header = DrawOp::Text {
            x: geometry.content_left(),
            y: geometry.height - geometry.margin_top - FURNITURE_FONT_SIZE * ASCENT,
            style,
            text: label.clone(),
        };
        let footer = DrawOp::Text {
            x: geometry.content_left() + (geometry.content_width() - label_width).max(0.0) / 2.0,
            y: geometry.margin_bottom + (FURNITURE_BAND - FURNITURE_FONT_SIZE) / 2.0,
            style,
            text: label,
        };

        self.pages.push(LaidOutPage {
            number,
            kind,
            ops: vec![header, footer],
        });
        self.cursor = geometry.content_top();
        self.fresh = true;
    }

    /// Opens a continuation page unless `height` fits below the cursor. A
    /// fresh page always accepts, so oversized elements cannot loop.
    pub fn ensure_room(&mut self, height: f32) {
        if self.pages.is_empty() {
            self.start_page(PageKind::Continuation);
        } else if height > self.remaining() && !self.fresh {
            self.start_page(PageKind::Continuation);
        }
    }

    /// Vertical gap; clamped at the bottom of the content area, never breaks.
    pub fn space(&mut self, amount: f32) {
        self.cursor = (self.cursor - amount).max(self.geometry.content_bottom());
    }

    fn push(&mut self, op: DrawOp) {
        self.fresh = false;
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    pub fn write_lines(&mut self, lines: &[Line], line_height: f32, align: Align) {
        for line in lines {
            let height = line.size * line_height;
            self.ensure_room(height);
            let baseline = self.cursor - (height - line.size) / 2.0 - line.size * ASCENT;
            let mut x = match align {
                Align::Left => self.geometry.content_left(),
                Align::Center => {
                    self.geometry.content_left()
                        + (self.geometry.content_width() - line.width).max(0.0) / 2.0
                }
            };
            for fragment in &line.fragments {
                self.push(DrawOp::Text {
                    x,
                    y: baseline,
                    style: fragment.style,
                    text: fragment.text.clone(),
                });
                x += fragment.style.width_of(&fragment.text);
            }
            self.fresh = false;
            self.cursor -= height;
        }
    }

    pub fn rule(&mut self, width: f32) {
        self.ensure_room(width);
        let y = self.cursor - width / 2.0;
        self.push(DrawOp::Rule {
            x1: self.geometry.content_left(),
            x2: self.geometry.content_left() + self.geometry.content_width(),
            y,
            width,
        });
        self.cursor -= width;
    }

    /// Scales to the content width, then down to the content height if the
    /// result is still too tall, and centers horizontally.
    pub fn image(&mut self, image: Arc<PreparedImage>) {
        let geometry = self.geometry;
        let (width, height) = fit_image(
            image.width_px,
            image.height_px,
            geometry.content_width(),
            geometry.content_height(),
        );
        self.ensure_room(height);
        let x = geometry.content_left() + (geometry.content_width() - width) / 2.0;
        let y = self.cursor - height;
        self.push(DrawOp::Image {
            x,
            y,
            width,
            height,
            image,
        });
        self.cursor -= height;
    }

    pub fn finish(self) -> Vec<LaidOutPage> {
        self.pages
    }
}

pub fn fit_image(width_px: u32, height_px: u32, max_width: f32, max_height: f32) -> (f32, f32) {
    if width_px == 0 || height_px == 0 {
        return (0.0, 0.0);
    }
    let aspect = height_px as f32 / width_px as f32;
    let mut width = max_width;
    let mut height = width * aspect;
    if height > max_height {
        height = max_height;
        width = height / aspect;
    }
    (width, height)
}
