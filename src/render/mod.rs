// Render module
// Rasterizes traces into images for semantic confirmation

pub mod raster;

pub use raster::{render_trace, RenderError, RenderOptions, TraceImage};
