//! Page navigation for the preview surface.

use memoir_engine::{Engine, RenderedOutput};

/// Book view shows a left and a right page side by side.
pub const DEFAULT_SPREAD: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewNavigator {
    current_page: usize,
    total_pages: usize,
    spread: usize,
}

impl Default for PreviewNavigator {
    fn default() -> Self {
        Self::new(DEFAULT_SPREAD)
    }
}

impl PreviewNavigator {
    pub fn new(spread: usize) -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            spread: spread.max(1),
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn spread(&self) -> usize {
        self.spread
    }

    /// Adopts the page count of a fresh render. If the current page no longer
    /// exists the view jumps back to the first page.
    pub fn set_total_pages(&mut self, total: usize) {
        self.total_pages = total.max(1);
        if self.current_page > self.total_pages {
            self.current_page = 1;
        }
    }

    pub fn go_to(&mut self, page: i64) {
        let total = i64::try_from(self.total_pages).unwrap_or(i64::MAX);
        self.current_page = page.clamp(1, total) as usize;
    }

    pub fn next(&mut self) {
        self.go_to(self.current_page as i64 + self.spread as i64);
    }

    pub fn previous(&mut self) {
        self.go_to(self.current_page as i64 - self.spread as i64);
    }

    /// First visible page and how many pages the spread shows from there.
    pub fn visible_range(&self) -> (usize, usize) {
        let count = self.spread.min(self.total_pages - self.current_page + 1);
        (self.current_page, count)
    }

    /// `reference` with any existing fragment replaced by `#page=N`.
    pub fn fragment(&self, reference: &str) -> String {
        page_fragment(reference, self.current_page)
    }

    /// Like [`fragment`](Self::fragment), but for a document holding only the
    /// visible spread, whose pages are numbered from 1.
    pub fn spread_fragment(&self, reference: &str) -> String {
        let (first, _) = self.visible_range();
        page_fragment(reference, self.current_page - first + 1)
    }
}

fn page_fragment(reference: &str, page: usize) -> String {
    let base = reference.split('#').next().unwrap_or(reference);
    format!("{base}#page={page}")
}

/// The pages of `output` the navigator currently shows, as a standalone document.
pub fn preview_spread(engine: &Engine, output: &RenderedOutput, navigator: &PreviewNavigator) -> Vec<u8> {
    let (start, count) = navigator.visible_range();
    engine.extract_range(
        &output.bytes,
        i32::try_from(start).unwrap_or(i32::MAX),
        i32::try_from(count).unwrap_or(i32::MAX),
    )
}
