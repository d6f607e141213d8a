//! Core domain types for Memoir.

pub mod styled;

use serde::{Deserialize, Serialize};

pub use styled::{Paragraph, Rgb, StyledRun};

/// Literal token an editor embeds in block content to force a page boundary.
pub const PAGE_BREAK_MARKER: &str = "<!-- PAGE_BREAK -->";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("chapter cannot be pinned to both left and right pages")]
    ConflictingPlacement,
    #[error("styled-text envelope: {0}")]
    Envelope(String),
}

macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::generate()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(ChapterId);
opaque_id!(BlockId);
opaque_id!(ImageId);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub debounce_ms: u64,
    pub preview_pages: u32,
    pub compress_streams: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            preview_pages: 2,
            compress_streams: true,
        }
    }
}

impl Settings {
    pub fn normalize(&mut self) {
        self.debounce_ms = self.debounce_ms.min(10_000);
        self.preview_pages = self.preview_pages.clamp(1, 16);
    }

    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Manuscript {
    pub metadata: Metadata,
    pub page_format: PageFormat,
    pub margins: Margins,
    pub defaults: TextDefaults,
    pub chapters: Vec<Chapter>,
}

impl Manuscript {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            metadata: Metadata {
                title: title.into(),
                author: author.into(),
            },
            ..Self::default()
        }
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.chapters.iter().flat_map(|chapter| chapter.blocks.iter())
    }

    pub fn total_word_count(&self) -> usize {
        self.blocks().map(Block::word_count).sum()
    }

    pub fn total_character_count(&self) -> usize {
        self.blocks().map(Block::character_count).sum()
    }

    pub fn total_image_count(&self) -> usize {
        self.blocks().map(|block| block.images.len()).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Metadata {
    pub title: String,
    pub author: String,
}

/// Physical page size in millimeters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PageFormat {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl Default for PageFormat {
    fn default() -> Self {
        // A5
        Self {
            width_mm: 148.0,
            height_mm: 210.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Margins {
    pub left_mm: f64,
    pub right_mm: f64,
    pub top_mm: f64,
    pub bottom_mm: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            left_mm: 25.0,
            right_mm: 25.0,
            top_mm: 25.0,
            bottom_mm: 25.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextDefaults {
    pub font: String,
    pub font_size: f64,
    pub line_height: f64,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            font: "Georgia".to_string(),
            font_size: 12.0,
            line_height: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextFormatting {
    pub font: String,
    pub font_size: f64,
    pub color: String,
}

impl Default for TextFormatting {
    fn default() -> Self {
        Self {
            font: "Georgia".to_string(),
            font_size: 12.0,
            color: "#000000".to_string(),
        }
    }
}

/// Which hand of a spread a chapter must open on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PagePlacement {
    #[default]
    Either,
    Left,
    Right,
}

impl PagePlacement {
    pub fn from_flags(always_left: bool, always_right: bool) -> Result<Self, ModelError> {
        match (always_left, always_right) {
            (true, true) => Err(ModelError::ConflictingPlacement),
            (true, false) => Ok(Self::Left),
            (false, true) => Ok(Self::Right),
            (false, false) => Ok(Self::Either),
        }
    }

    pub fn always_left(self) -> bool {
        self == Self::Left
    }

    pub fn always_right(self) -> bool {
        self == Self::Right
    }
}

/// Persisted as the two historical booleans; see [`PagePlacement::from_flags`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ChapterSettingsRecord", into = "ChapterSettingsRecord")]
pub struct ChapterSettings {
    /// Stored for forward compatibility; the builder always opens chapters on a fresh page.
    pub starts_on_new_page: bool,
    pub placement: PagePlacement,
    pub empty_lines_before: u32,
}

impl Default for ChapterSettings {
    fn default() -> Self {
        Self {
            starts_on_new_page: true,
            placement: PagePlacement::Either,
            empty_lines_before: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ChapterSettingsRecord {
    starts_on_new_page: bool,
    always_left: bool,
    always_right: bool,
    empty_lines_before: u32,
}

impl Default for ChapterSettingsRecord {
    fn default() -> Self {
        ChapterSettings::default().into()
    }
}

impl TryFrom<ChapterSettingsRecord> for ChapterSettings {
    type Error = ModelError;

    fn try_from(record: ChapterSettingsRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            starts_on_new_page: record.starts_on_new_page,
            placement: PagePlacement::from_flags(record.always_left, record.always_right)?,
            empty_lines_before: record.empty_lines_before,
        })
    }
}

impl From<ChapterSettings> for ChapterSettingsRecord {
    fn from(settings: ChapterSettings) -> Self {
        Self {
            starts_on_new_page: settings.starts_on_new_page,
            always_left: settings.placement.always_left(),
            always_right: settings.placement.always_right(),
            empty_lines_before: settings.empty_lines_before,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    #[serde(default)]
    id: ChapterId,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_true")]
    pub show_title: bool,
    #[serde(default)]
    pub title_formatting: TextFormatting,
    #[serde(default)]
    pub settings: ChapterSettings,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Chapter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: ChapterId::generate(),
            title: title.into(),
            show_title: true,
            title_formatting: TextFormatting {
                font_size: 18.0,
                ..TextFormatting::default()
            },
            settings: ChapterSettings::default(),
            blocks: Vec::new(),
        }
    }

    pub fn id(&self) -> &ChapterId {
        &self.id
    }

    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn with_placement(mut self, placement: PagePlacement) -> Self {
        self.settings.placement = placement;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
    #[serde(default)]
    id: BlockId,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_true")]
    pub show_title: bool,
    #[serde(default)]
    pub title_formatting: TextFormatting,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

impl Block {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: BlockId::generate(),
            title: title.into(),
            show_title: true,
            title_formatting: TextFormatting {
                font_size: 14.0,
                ..TextFormatting::default()
            },
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub fn with_image(mut self, image: ImageRef) -> Self {
        self.images.push(image);
        self
    }

    /// Whitespace-delimited tokens of the plain-text projection of the content.
    pub fn word_count(&self) -> usize {
        word_count(&styled::plain_text(&self.content))
    }

    /// Length of the raw stored content, markup included.
    pub fn character_count(&self) -> usize {
        character_count(&self.content)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageRef {
    #[serde(default)]
    id: ImageId,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
    #[serde(default)]
    pub width_px: u32,
    #[serde(default)]
    pub height_px: u32,
    #[serde(default)]
    pub caption: String,
}

impl ImageRef {
    pub fn new(file_path: impl Into<String>) -> Self {
        let file_path = file_path.into();
        let file_name = std::path::Path::new(&file_path)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            id: ImageId::generate(),
            file_name,
            file_path,
            data: None,
            width_px: 0,
            height_px: 0,
            caption: String::new(),
        }
    }

    pub fn id(&self) -> &ImageId {
        &self.id
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }
}

fn default_true() -> bool {
    true
}

pub fn word_count(text: &str) -> usize {
    text.split([' ', '\t', '\r', '\n'])
        .filter(|token| !token.is_empty())
        .count()
}

pub fn character_count(raw: &str) -> usize {
    raw.chars().count()
}
