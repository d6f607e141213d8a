//! Layout and PDF engine.

pub mod builder;
pub mod fonts;
pub mod images;
pub mod inspect;
pub mod layout;
pub mod planner;
pub mod units;
pub mod writer;

use std::time::Instant;

use anyhow::Context as _;
use log::debug;
use memoir_core::Manuscript;

pub use builder::LayoutDocument;
pub use writer::WriterOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub compress_streams: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            compress_streams: true,
        }
    }
}

impl From<&memoir_core::Settings> for EngineOptions {
    fn from(settings: &memoir_core::Settings) -> Self {
        Self {
            compress_streams: settings.compress_streams,
        }
    }
}

/// A finished render: PDF bytes plus the page count read back from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Stateless facade over builder, writer and inspector; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    options: EngineOptions,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn layout(&self, manuscript: &Manuscript) -> anyhow::Result<LayoutDocument> {
        builder::build(manuscript).context("lay out manuscript")
    }

    pub fn build(&self, manuscript: &Manuscript) -> anyhow::Result<Vec<u8>> {
        let layout = self.layout(manuscript)?;
        Ok(writer::write_pdf(
            &layout,
            WriterOptions {
                compress: self.options.compress_streams,
            },
        ))
    }

    pub fn render(&self, manuscript: &Manuscript) -> anyhow::Result<RenderedOutput> {
        let started = Instant::now();
        let layout = self.layout(manuscript)?;
        let laid_out = started.elapsed();

        let bytes = writer::write_pdf(
            &layout,
            WriterOptions {
                compress: self.options.compress_streams,
            },
        );
        let page_count = inspect::page_count(&bytes);
        debug!(
            "render: {} pages, {} bytes, layout={:.1}ms, total={:.1}ms",
            page_count,
            bytes.len(),
            laid_out.as_secs_f64() * 1000.0,
            started.elapsed().as_secs_f64() * 1000.0
        );
        Ok(RenderedOutput { bytes, page_count })
    }

    pub fn page_count(&self, output: &[u8]) -> usize {
        inspect::page_count(output)
    }

    pub fn extract_range(&self, output: &[u8], start_page: i32, page_count: i32) -> Vec<u8> {
        inspect::extract_range(output, start_page, page_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoir_core::{Block, Chapter, PagePlacement};

    #[test]
    fn render_reports_page_count_of_its_output() {
        let mut manuscript = Manuscript::new("Titel", "Autor");
        manuscript.chapters.push(
            Chapter::new("Eins")
                .with_placement(PagePlacement::Right)
                .with_block(Block::new("a", "Text")),
        );
        manuscript
            .chapters
            .push(Chapter::new("Zwei").with_block(Block::new("b", "Text")));

        let engine = Engine::new();
        let output = engine.render(&manuscript).unwrap();
        assert_eq!(output.page_count, 3);
        assert_eq!(engine.page_count(&output.bytes), 3);
    }

    #[test]
    fn options_follow_settings() {
        let settings = memoir_core::Settings {
            compress_streams: false,
            ..Default::default()
        };
        let engine = Engine::with_options(EngineOptions::from(&settings));
        assert!(!engine.options().compress_streams);
        let bytes = engine.build(&Manuscript::default()).unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("(Seite 1)"));
    }

    #[test]
    fn build_errors_carry_context() {
        let mut manuscript = Manuscript::default();
        manuscript.defaults.font_size = 0.0;
        let err = Engine::new().render(&manuscript).unwrap_err();
        assert!(format!("{err:#}").contains("lay out manuscript"));
    }
}
