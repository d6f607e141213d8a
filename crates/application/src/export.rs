//! PDF export.

use std::path::Path;

use anyhow::Context as _;
use log::info;
use memoir_core::Manuscript;
use memoir_engine::RenderedOutput;

use crate::scheduler::Renderer;

/// Renders `manuscript` and writes the PDF to `path`, reporting progress as a
/// percentage: 0 before rendering, 50 once rendered, 100 once written.
pub fn export_pdf<R, P>(
    renderer: &R,
    manuscript: &Manuscript,
    path: &Path,
    mut progress: P,
) -> anyhow::Result<RenderedOutput>
where
    R: Renderer + ?Sized,
    P: FnMut(u8),
{
    progress(0);
    let output = renderer
        .render(manuscript)
        .context("render manuscript for export")?;
    progress(50);

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create export directory {}", parent.display()))?;
    }
    std::fs::write(path, &output.bytes)
        .with_context(|| format!("write pdf {}", path.display()))?;
    progress(100);

    info!("exported {} pages to {}", output.page_count, path.display());
    Ok(output)
}
