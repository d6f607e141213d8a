//! Test helpers and fixtures.

use std::path::{Path, PathBuf};

use memoir_core::{Block, Chapter, Manuscript, PagePlacement, Settings};
use memoir_engine::{Engine, EngineOptions};

#[cfg(test)]
mod scenarios;

pub fn make_settings(debounce_ms: u64) -> Settings {
    Settings {
        debounce_ms,
        preview_pages: 2,
        compress_streams: false,
    }
}

/// Engine that leaves content streams readable for byte-level assertions.
pub fn plain_engine() -> Engine {
    Engine::with_options(EngineOptions {
        compress_streams: false,
    })
}

/// One chapter per entry, each with a single untitled block of `content`.
pub fn make_manuscript(chapters: &[(&str, PagePlacement, &str)]) -> Manuscript {
    let mut manuscript = Manuscript::new("Erinnerungen", "Anna");
    for (title, placement, content) in chapters {
        let mut block = Block::new("", *content);
        block.show_title = false;
        manuscript
            .chapters
            .push(Chapter::new(*title).with_placement(*placement).with_block(block));
    }
    manuscript
}

/// `count` short chapters, so the rendered document has exactly `count` pages.
pub fn make_page_per_chapter(count: usize) -> Manuscript {
    let titles: Vec<String> = (1..=count).map(|i| format!("Kapitel {i}")).collect();
    let entries: Vec<(&str, PagePlacement, &str)> = titles
        .iter()
        .map(|title| (title.as_str(), PagePlacement::Either, "Kurzer Text."))
        .collect();
    make_manuscript(&entries)
}

pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    image::RgbImage::from_pixel(width, height, image::Rgb([120, 80, 40])).save(&path)?;
    Ok(path)
}

/// Decoded content stream of every page, in page order.
pub fn page_contents(pdf: &[u8]) -> anyhow::Result<Vec<String>> {
    let doc = lopdf::Document::load_mem(pdf)?;
    doc.get_pages()
        .values()
        .map(|&id| {
            let content = doc.get_page_content(id)?;
            Ok(String::from_utf8_lossy(&content).to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_settings() {
        let settings = make_settings(25);
        assert_eq!(settings.debounce_ms, 25);
        assert!(!settings.compress_streams);
    }

    #[test]
    fn page_per_chapter_fixture_has_requested_chapters() {
        let manuscript = make_page_per_chapter(7);
        assert_eq!(manuscript.chapters.len(), 7);
        assert!(!manuscript.chapters[0].blocks[0].show_title);
    }
}
