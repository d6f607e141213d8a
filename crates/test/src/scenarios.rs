//! End-to-end scenarios across core, engine, application and storage.

use std::sync::Arc;
use std::time::Duration;

use memoir_application::{PreviewNavigator, RenderOutcome, RenderScheduler, export_pdf, preview_spread};
use memoir_core::styled::{Paragraph, StyledRun, to_envelope};
use memoir_core::{Block, Chapter, ImageRef, Manuscript, PAGE_BREAK_MARKER, PagePlacement};
use memoir_engine::{Engine, inspect};
use memoir_storage::{FileProjectRepository, ProjectRepository};

use crate::*;

#[test]
fn always_right_chapter_renders_three_pages() -> anyhow::Result<()> {
    let manuscript = make_manuscript(&[
        ("Eins", PagePlacement::Right, "Erster Text."),
        ("Zwei", PagePlacement::Either, "Zweiter Text."),
    ]);
    let output = plain_engine().render(&manuscript)?;

    assert_eq!(output.page_count, 3);
    assert_eq!(inspect::structural_page_count(&output.bytes)?, 3);
    assert_eq!(inspect::heuristic_page_count(&output.bytes), 3);

    let pages = page_contents(&output.bytes)?;
    assert!(!pages[0].contains("(Eins)"));
    assert!(pages[0].contains("(Seite 1)"));
    assert!(pages[1].contains("(Eins)"));
    assert!(pages[2].contains("(Zwei)"));
    Ok(())
}

#[test]
fn page_break_markers_split_block_across_pages() -> anyhow::Result<()> {
    let content = format!("Vorher{PAGE_BREAK_MARKER}Mitte{PAGE_BREAK_MARKER}{PAGE_BREAK_MARKER}Nachher");
    let manuscript = make_manuscript(&[("Eins", PagePlacement::Either, &content)]);
    let output = plain_engine().render(&manuscript)?;

    assert_eq!(output.page_count, 3);
    let pages = page_contents(&output.bytes)?;
    assert!(pages[0].contains("(Vorher)"));
    assert!(pages[1].contains("(Mitte)"));
    assert!(pages[2].contains("(Nachher)"));
    Ok(())
}

#[test]
fn broken_images_are_skipped_with_their_captions() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let good = write_png(dir.path(), "good.png", 30, 20)?;
    let corrupt = dir.path().join("corrupt.png");
    std::fs::write(&corrupt, b"\x89PNG but not really")?;

    let block = Block::new("Bilder", "Ein Absatz.")
        .with_image(ImageRef::new("/gone/missing.png").with_caption("Verschollen"))
        .with_image(ImageRef::new(corrupt.to_string_lossy()).with_caption("Kaputt"))
        .with_image(ImageRef::new(good.to_string_lossy()).with_caption("Sichtbar"));
    let mut manuscript = Manuscript::new("Bilder", "Anna");
    manuscript.chapters.push(Chapter::new("Eins").with_block(block));

    let output = plain_engine().render(&manuscript)?;
    let text = String::from_utf8_lossy(&output.bytes);
    assert_eq!(text.matches("/Subtype /Image").count(), 1);
    assert!(text.contains("(Sichtbar)"));
    assert!(!text.contains("(Verschollen)"));
    assert!(!text.contains("(Kaputt)"));
    Ok(())
}

#[test]
fn extracting_five_to_seven_of_ten_pages_keeps_order() -> anyhow::Result<()> {
    let engine = Engine::new();
    let output = engine.render(&make_page_per_chapter(10))?;
    assert_eq!(output.page_count, 10);

    assert_eq!(engine.extract_range(&output.bytes, 1, 0), output.bytes);

    let subset = engine.extract_range(&output.bytes, 5, 3);
    assert_eq!(engine.page_count(&subset), 3);
    let pages = page_contents(&subset)?;
    for (page, number) in pages.iter().zip(5..=7) {
        assert!(page.contains(&format!("(Seite {number})")));
        assert!(page.contains(&format!("(Kapitel {number})")));
    }
    Ok(())
}

#[test]
fn styled_envelope_selects_fonts_and_bad_envelope_degrades() -> anyhow::Result<()> {
    let styled = to_envelope(&[Paragraph {
        runs: vec![
            StyledRun {
                font_family: Some("Courier New".to_string()),
                bold: true,
                ..StyledRun::plain("Fett ")
            },
            StyledRun::plain("normal"),
        ],
    }]);
    let broken = "{ kaputtes Format";
    let manuscript = make_manuscript(&[
        ("Eins", PagePlacement::Either, &styled),
        ("Zwei", PagePlacement::Either, broken),
    ]);

    let output = plain_engine().render(&manuscript)?;
    let text = String::from_utf8_lossy(&output.bytes);
    assert!(text.contains("/Courier-Bold"));
    assert!(text.contains("(Fett )"));
    assert!(text.contains("(normal)"));
    assert!(text.contains("({ kaputtes Format)"));
    Ok(())
}

#[test]
fn saved_project_renders_identically() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("memoir.json");
    let repo = FileProjectRepository::new();
    let manuscript = make_manuscript(&[
        ("Eins", PagePlacement::Left, "alpha beta"),
        ("Zwei", PagePlacement::Right, "gamma"),
    ]);

    repo.save(&manuscript, &path)?;
    let loaded = repo.load(&path)?;
    let engine = Engine::new();
    assert_eq!(engine.render(&loaded)?, engine.render(&manuscript)?);
    assert_eq!(loaded.total_word_count(), 3);
    Ok(())
}

#[test]
fn scheduler_preview_and_export_work_together() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let settings = make_settings(20);
    let engine = plain_engine();
    let scheduler = RenderScheduler::new(Arc::new(engine.clone()), settings.debounce());

    let mut manuscript = make_page_per_chapter(3);
    let superseded = scheduler.request_render(Arc::new(manuscript.clone()));
    manuscript
        .chapters
        .push(Chapter::new("Nachtrag").with_block(Block::new("", "Neu.")));
    let latest = scheduler.request_render(Arc::new(manuscript.clone()));

    assert!(superseded.wait().is_cancelled());
    let rendered = match latest.wait_timeout(Duration::from_secs(30)) {
        Some(RenderOutcome::Completed(rendered)) => rendered,
        other => anyhow::bail!("unexpected outcome: {other:?}"),
    };
    assert_eq!(rendered.page_count, 4);

    let mut navigator = PreviewNavigator::new(settings.preview_pages as usize);
    navigator.set_total_pages(rendered.page_count);
    navigator.go_to(4);
    let spread = preview_spread(&engine, &rendered, &navigator);
    assert_eq!(engine.page_count(&spread), 1);
    assert!(navigator.fragment("preview.pdf").ends_with("#page=4"));

    let path = dir.path().join("memoir.pdf");
    let mut progress = Vec::new();
    let exported = export_pdf(&engine, &manuscript, &path, |p| progress.push(p))?;
    assert_eq!(progress, vec![0, 50, 100]);
    assert_eq!(exported.bytes, rendered.bytes);
    Ok(())
}

#[test]
fn spread_link_addresses_a_page_inside_the_spread() -> anyhow::Result<()> {
    let engine = plain_engine();
    let rendered = engine.render(&make_page_per_chapter(6))?;

    let mut navigator = PreviewNavigator::default();
    navigator.set_total_pages(rendered.page_count);
    navigator.go_to(5);
    let spread = preview_spread(&engine, &rendered, &navigator);

    let link = navigator.spread_fragment("file:///tmp/spread.pdf");
    let page: usize = link
        .rsplit("#page=")
        .next()
        .unwrap_or_default()
        .parse()?;
    assert!(page >= 1 && page <= engine.page_count(&spread));

    let pages = page_contents(&spread)?;
    assert!(pages[page - 1].contains("(Seite 5)"));
    Ok(())
}

#[test]
fn statistics_follow_content_edits() {
    let mut manuscript = make_manuscript(&[("Eins", PagePlacement::Either, "Hello   world\r\n\tfoo")]);
    assert_eq!(manuscript.total_word_count(), 3);
    assert_eq!(manuscript.total_character_count(), "Hello   world\r\n\tfoo".len());

    manuscript.chapters[0].blocks[0].content.push_str(" bar");
    assert_eq!(manuscript.total_word_count(), 4);
}

#[test]
fn empty_manuscript_is_a_countable_document() -> anyhow::Result<()> {
    let output = Engine::new().render(&Manuscript::default())?;
    assert_eq!(output.page_count, 1);
    assert_eq!(inspect::page_count(&output.bytes), 1);
    Ok(())
}
