//! Image loading for the builder.

use std::path::Path;

use anyhow::Context as _;
use memoir_core::ImageRef;

/// Decoded pixels ready for embedding: 8-bit RGB plus an optional alpha plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImage {
    pub width_px: u32,
    pub height_px: u32,
    pub rgb: Vec<u8>,
    pub alpha: Option<Vec<u8>>,
}

/// Returns `Ok(None)` when the referenced file does not exist at render time.
/// An existing file is decoded from the stored payload when one is present,
/// otherwise from disk; decode and read failures are errors for the caller to
/// skip.
pub fn prepare_image(image: &ImageRef) -> anyhow::Result<Option<PreparedImage>> {
    let path = Path::new(&image.file_path);
    if image.file_path.is_empty() || !path.is_file() {
        return Ok(None);
    }

    let bytes = match &image.data {
        Some(data) if !data.is_empty() => data.clone(),
        _ => std::fs::read(path).with_context(|| format!("read image {}", path.display()))?,
    };
    let decoded = image::load_from_memory(&bytes)
        .with_context(|| format!("decode image {}", path.display()))?;
    let rgba = decoded.to_rgba8();
    let (width_px, height_px) = rgba.dimensions();
    anyhow::ensure!(width_px > 0 && height_px > 0, "image {} is empty", path.display());

    let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);
    let rgb = rgba
        .pixels()
        .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
        .collect();
    let alpha = has_alpha.then(|| rgba.pixels().map(|p| p.0[3]).collect());

    Ok(Some(PreparedImage {
        width_px,
        height_px,
        rgb,
        alpha,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str, pixel: [u8; 4]) -> String {
        let path = dir.join(name);
        let img = image::RgbaImage::from_pixel(4, 2, image::Rgba(pixel));
        img.save(&path).unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn missing_file_is_skipped_without_error() {
        let image = ImageRef::new("/definitely/not/here.png");
        assert_eq!(prepare_image(&image).unwrap(), None);
    }

    #[test]
    fn decodes_opaque_png_without_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "red.png", [255, 0, 0, 255]);
        let prepared = prepare_image(&ImageRef::new(path)).unwrap().unwrap();
        assert_eq!((prepared.width_px, prepared.height_px), (4, 2));
        assert_eq!(prepared.rgb.len(), 4 * 2 * 3);
        assert_eq!(&prepared.rgb[..3], &[255, 0, 0]);
        assert!(prepared.alpha.is_none());
    }

    #[test]
    fn keeps_alpha_plane_for_transparent_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "ghost.png", [0, 0, 255, 128]);
        let prepared = prepare_image(&ImageRef::new(path)).unwrap().unwrap();
        assert_eq!(prepared.alpha.as_deref(), Some(&[128u8; 8][..]));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(prepare_image(&ImageRef::new(path.to_string_lossy())).is_err());
    }

    #[test]
    fn stored_payload_wins_over_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "disk.png", [255, 255, 255, 255]);

        let mut payload = Vec::new();
        image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 255, 0, 255]))
            .write_to(&mut std::io::Cursor::new(&mut payload), image::ImageFormat::Png)
            .unwrap();
        let mut image = ImageRef::new(path);
        image.data = Some(payload);

        let prepared = prepare_image(&image).unwrap().unwrap();
        assert_eq!(prepared.rgb, vec![0, 255, 0]);
    }
}
