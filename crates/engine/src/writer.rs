//! Serializes laid-out pages to PDF.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::builder::LayoutDocument;
use crate::fonts::{FontFace, encode_win_ansi};
use crate::images::PreparedImage;
use crate::layout::{DrawOp, LaidOutPage};

const PRODUCER: &str = concat!("memoir ", env!("CARGO_PKG_VERSION"));
const DEFLATE_LEVEL: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Flate-compress page content streams. Images are always compressed.
    pub compress: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self { compress: true }
    }
}

struct PageResources {
    fonts: BTreeSet<FontFace>,
    images: BTreeSet<usize>,
}

pub fn write_pdf(document: &LayoutDocument, options: WriterOptions) -> Vec<u8> {
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let id = Ref::new(next_id);
        next_id += 1;
        id
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();

    // Images are keyed by allocation so a shared decode is embedded once.
    let mut image_slots: HashMap<*const PreparedImage, usize> = HashMap::new();
    let mut images: Vec<&Arc<PreparedImage>> = Vec::new();
    let mut resources = Vec::with_capacity(document.pages.len());
    for page in &document.pages {
        let mut used = PageResources {
            fonts: BTreeSet::new(),
            images: BTreeSet::new(),
        };
        for op in &page.ops {
            match op {
                DrawOp::Text { style, .. } => {
                    used.fonts.insert(style.face);
                }
                DrawOp::Image { image, .. } => {
                    let slot = *image_slots.entry(Arc::as_ptr(image)).or_insert_with(|| {
                        images.push(image);
                        images.len() - 1
                    });
                    used.images.insert(slot);
                }
                DrawOp::Rule { .. } => {}
            }
        }
        resources.push(used);
    }

    let faces: BTreeSet<FontFace> = resources.iter().flat_map(|r| r.fonts.iter().copied()).collect();
    let mut font_refs: BTreeMap<FontFace, Ref> = BTreeMap::new();
    for face in faces {
        let id = alloc();
        pdf.type1_font(id)
            .base_font(Name(face.base_font().as_bytes()))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        font_refs.insert(face, id);
    }

    let mut image_refs = Vec::with_capacity(images.len());
    for image in &images {
        let image_id = alloc();
        let mask_id = image.alpha.as_ref().map(|alpha| {
            let mask_id = alloc();
            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(alpha, DEFLATE_LEVEL);
            let mut mask = pdf.image_xobject(mask_id, &compressed);
            mask.filter(Filter::FlateDecode);
            mask.width(image.width_px as i32);
            mask.height(image.height_px as i32);
            mask.color_space().device_gray();
            mask.bits_per_component(8);
            mask_id
        });

        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&image.rgb, DEFLATE_LEVEL);
        let mut xobject = pdf.image_xobject(image_id, &compressed);
        xobject.filter(Filter::FlateDecode);
        xobject.width(image.width_px as i32);
        xobject.height(image.height_px as i32);
        xobject.color_space().device_rgb();
        xobject.bits_per_component(8);
        if let Some(mask_id) = mask_id {
            xobject.s_mask(mask_id);
        }
        image_refs.push(image_id);
    }

    let geometry = document.geometry;
    let mut page_ids = Vec::with_capacity(document.pages.len());
    for (page, used) in document.pages.iter().zip(&resources) {
        let page_id = alloc();
        let content_id = alloc();
        page_ids.push(page_id);

        let raw = page_content(page, &image_slots);
        if options.compress {
            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&raw, DEFLATE_LEVEL);
            pdf.stream(content_id, &compressed).filter(Filter::FlateDecode);
        } else {
            pdf.stream(content_id, &raw);
        }

        let mut page_writer = pdf.page(page_id);
        page_writer
            .media_box(Rect::new(0.0, 0.0, geometry.width, geometry.height))
            .parent(pages_id)
            .contents(content_id);
        let mut page_resources = page_writer.resources();
        {
            let mut fonts = page_resources.fonts();
            for face in &used.fonts {
                if let Some(id) = font_refs.get(face) {
                    fonts.pair(Name(face.resource_name().as_bytes()), *id);
                }
            }
        }
        if !used.images.is_empty() {
            let mut xobjects = page_resources.x_objects();
            for &slot in &used.images {
                xobjects.pair(Name(image_name(slot).as_bytes()), image_refs[slot]);
            }
        }
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);

    {
        let mut info = pdf.document_info(info_id);
        if !document.title.is_empty() {
            info.title(TextStr(&document.title));
        }
        if !document.author.is_empty() {
            info.author(TextStr(&document.author));
        }
        info.producer(TextStr(PRODUCER));
    }

    pdf.finish()
}

fn image_name(slot: usize) -> String {
    format!("Im{}", slot + 1)
}

fn page_content(page: &LaidOutPage, image_slots: &HashMap<*const PreparedImage, usize>) -> Vec<u8> {
    let mut content = Content::new();
    for op in &page.ops {
        match op {
            DrawOp::Text { x, y, style, text } => {
                if text.is_empty() {
                    continue;
                }
                let (r, g, b) = style.color.to_unit();
                let font = style.face.resource_name();
                content.set_fill_rgb(r, g, b);
                content
                    .begin_text()
                    .set_font(Name(font.as_bytes()), style.size)
                    .next_line(*x, *y)
                    .show(Str(&encode_win_ansi(text)))
                    .end_text();
            }
            DrawOp::Rule { x1, x2, y, width } => {
                content.save_state();
                content.set_line_width(*width);
                content.set_stroke_rgb(0.0, 0.0, 0.0);
                content.move_to(*x1, *y);
                content.line_to(*x2, *y);
                content.stroke();
                content.restore_state();
            }
            DrawOp::Image {
                x,
                y,
                width,
                height,
                image,
            } => {
                let Some(&slot) = image_slots.get(&Arc::as_ptr(image)) else {
                    continue;
                };
                content.save_state();
                content.transform([*width, 0.0, 0.0, *height, *x, *y]);
                content.x_object(Name(image_name(slot).as_bytes()));
                content.restore_state();
            }
        }
    }
    content.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use memoir_core::{Block, Chapter, Manuscript};

    fn sample() -> LayoutDocument {
        let mut manuscript = Manuscript::new("Erinnerungen", "Anna");
        manuscript
            .chapters
            .push(Chapter::new("Kindheit").with_block(Block::new("Dorf", "Es war einmal.")));
        build(&manuscript).unwrap()
    }

    #[test]
    fn writes_a_pdf_header_and_trailer() {
        let bytes = write_pdf(&sample(), WriterOptions::default());
        assert!(bytes.starts_with(b"%PDF-"));
        let tail = String::from_utf8_lossy(&bytes[bytes.len().saturating_sub(64)..]).to_string();
        assert!(tail.contains("%%EOF"));
    }

    #[test]
    fn uncompressed_content_is_readable() {
        let bytes = write_pdf(&sample(), WriterOptions { compress: false });
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("(Seite 1)"));
        assert!(text.contains("(Kindheit)"));
        assert!(text.contains("/WinAnsiEncoding"));
        assert!(text.contains("/Times-Bold"));
    }

    #[test]
    fn document_info_carries_metadata() {
        let bytes = write_pdf(&sample(), WriterOptions::default());
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("Erinnerungen"));
        assert!(text.contains("/Producer"));
    }

    #[test]
    fn shared_images_are_embedded_once() {
        let image = Arc::new(PreparedImage {
            width_px: 1,
            height_px: 1,
            rgb: vec![1, 2, 3],
            alpha: Some(vec![200]),
        });
        let mut document = sample();
        for page in &mut document.pages {
            for _ in 0..2 {
                page.ops.push(DrawOp::Image {
                    x: 10.0,
                    y: 10.0,
                    width: 5.0,
                    height: 5.0,
                    image: Arc::clone(&image),
                });
            }
        }
        let bytes = write_pdf(&document, WriterOptions { compress: false });
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(text.matches("/Subtype /Image").count(), 2);
        assert!(text.contains("/SMask"));
        assert!(!text.contains("/Im2"));
    }
}
