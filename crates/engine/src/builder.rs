//! Document Builder: turns a manuscript into laid-out pages.

use std::sync::Arc;

use log::{debug, warn};
use memoir_core::{Block, Chapter, ImageRef, Manuscript, Paragraph, Rgb, TextDefaults, TextFormatting};

use crate::fonts::FontFace;
use crate::images::prepare_image;
use crate::layout::{Align, LaidOutPage, PageFlow, PageGeometry, PageKind, TextStyle, break_lines};
use crate::planner::{page_breaks, plan_block_segments, plan_chapter_start, spacer_height};

const TITLE_LINE_HEIGHT: f32 = 1.2;
const CHAPTER_RULE_WIDTH: f32 = 1.0;
const AFTER_CHAPTER_TITLE: f32 = 10.0;
const AFTER_BLOCK_TITLE: f32 = 5.0;
const AFTER_BLOCK: f32 = 15.0;
const CAPTION_SIZE: f32 = 10.0;

/// Pages plus the document information the writer needs.
#[derive(Debug, Clone)]
pub struct LayoutDocument {
    pub geometry: PageGeometry,
    pub pages: Vec<LaidOutPage>,
    pub title: String,
    pub author: String,
}

impl LayoutDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Lays out the whole manuscript. The result depends only on the input; an
/// empty manuscript yields one blank page.
pub fn build(manuscript: &Manuscript) -> anyhow::Result<LayoutDocument> {
    let geometry = PageGeometry::from_manuscript(manuscript);
    anyhow::ensure!(
        geometry.has_content_area(),
        "page {}x{} mm leaves no content area inside the margins",
        manuscript.page_format.width_mm,
        manuscript.page_format.height_mm
    );
    let defaults = &manuscript.defaults;
    anyhow::ensure!(
        valid_size(defaults.font_size),
        "invalid default font size {}",
        defaults.font_size
    );
    anyhow::ensure!(
        valid_size(defaults.line_height),
        "invalid default line height {}",
        defaults.line_height
    );

    let mut builder = Builder {
        defaults,
        flow: PageFlow::new(geometry, FontFace::new(&defaults.font, false, false)),
    };
    for chapter in &manuscript.chapters {
        builder.chapter(chapter);
    }

    let mut flow = builder.flow;
    if flow.page_index() == 0 {
        flow.start_page(PageKind::Filler);
    }

    Ok(LayoutDocument {
        geometry,
        pages: flow.finish(),
        title: manuscript.metadata.title.clone(),
        author: manuscript.metadata.author.clone(),
    })
}

struct Builder<'a> {
    defaults: &'a TextDefaults,
    flow: PageFlow,
}

impl Builder<'_> {
    fn chapter(&mut self, chapter: &Chapter) {
        let start = plan_chapter_start(&chapter.settings, self.flow.page_index());
        if start.blank_pages_before > 0 {
            debug!(
                "chapter {:?}: {} filler page(s) after page {}",
                chapter.title,
                start.blank_pages_before,
                self.flow.page_index()
            );
        }
        for _ in 0..start.blank_pages_before {
            self.flow.start_page(PageKind::Filler);
        }

        self.flow.start_page(PageKind::ChapterStart);
        let lines = chapter.settings.empty_lines_before;
        if lines > 0 {
            self.flow.space(spacer_height(self.defaults) as f32 * lines as f32);
        }

        if chapter.show_title {
            self.title(&chapter.title, &chapter.title_formatting);
            self.flow.rule(CHAPTER_RULE_WIDTH);
            self.flow.space(AFTER_CHAPTER_TITLE);
        }

        for block in &chapter.blocks {
            self.block(block);
        }
    }

    fn block(&mut self, block: &Block) {
        if block.show_title && !block.title.is_empty() {
            self.title(&block.title, &block.title_formatting);
            self.flow.space(AFTER_BLOCK_TITLE);
        }

        let segments = plan_block_segments(&block.content);
        if segments.len() > 1 {
            debug!(
                "block {}: {} page break(s)",
                block.id(),
                page_breaks(&segments)
            );
        }
        for (index, segment) in segments.iter().enumerate() {
            if index > 0 {
                self.flow.start_page(PageKind::Continuation);
            }
            self.paragraphs(&segment.paragraphs);
        }

        for image in &block.images {
            self.image(image);
        }

        self.flow.space(AFTER_BLOCK);
    }

    fn title(&mut self, text: &str, formatting: &TextFormatting) {
        let style = TextStyle {
            face: FontFace::new(&formatting.font, true, false),
            size: size_or(formatting.font_size, self.defaults.font_size),
            color: Rgb::normalize(&formatting.color),
        };
        let width = self.flow.geometry().content_width();
        let lines = break_lines(&[(style, text)], width, style.size);
        self.flow.write_lines(&lines, TITLE_LINE_HEIGHT, Align::Left);
    }

    fn paragraphs(&mut self, paragraphs: &[Paragraph]) {
        let width = self.flow.geometry().content_width();
        let default_size = self.defaults.font_size as f32;
        let line_height = self.defaults.line_height as f32;

        for paragraph in paragraphs {
            let runs: Vec<(TextStyle, &str)> = paragraph
                .runs
                .iter()
                .map(|run| {
                    let family = run.font_family.as_deref().unwrap_or(self.defaults.font.as_str());
                    let style = TextStyle {
                        face: FontFace::new(family, run.bold, run.italic),
                        size: run.font_size.map_or(default_size, |size| size as f32),
                        color: run.color,
                    };
                    (style, run.text.as_str())
                })
                .collect();
            let lines = break_lines(&runs, width, default_size);
            self.flow.write_lines(&lines, line_height, Align::Left);
        }
    }

    fn image(&mut self, image: &ImageRef) {
        let prepared = match prepare_image(image) {
            Ok(Some(prepared)) => prepared,
            Ok(None) => {
                debug!("image {:?} not found, skipped", image.file_path);
                return;
            }
            Err(err) => {
                warn!("skipping image {:?}: {err:#}", image.file_path);
                return;
            }
        };
        self.flow.image(Arc::new(prepared));

        if !image.caption.is_empty() {
            let style = TextStyle {
                face: FontFace::new(&self.defaults.font, false, true),
                size: CAPTION_SIZE,
                color: Rgb::BLACK,
            };
            let width = self.flow.geometry().content_width();
            let lines = break_lines(&[(style, image.caption.as_str())], width, CAPTION_SIZE);
            self.flow.write_lines(&lines, TITLE_LINE_HEIGHT, Align::Center);
        }
    }
}

fn valid_size(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn size_or(value: f64, fallback: f64) -> f32 {
    if valid_size(value) { value as f32 } else { fallback as f32 }
}
