//! Application services for Memoir: background rendering, preview and export.

pub mod export;
pub mod preview;
pub mod scheduler;

pub use export::export_pdf;
pub use preview::{PreviewNavigator, preview_spread};
pub use scheduler::{
    RenderHandle, RenderObserver, RenderOutcome, RenderScheduler, RenderStatus, Renderer,
};
