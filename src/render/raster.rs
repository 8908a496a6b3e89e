// Trace rasterization
// Draws an accepted trace as dark strokes on a plain background for the vision judge

use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tiny_skia::{Color, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::trace::types::{Point, Trace};

/// Errors that can occur while rendering a trace
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Trace has no drawable points")]
    EmptyTrace,

    #[error("Invalid canvas size: {0}")]
    InvalidCanvasSize(f32),

    #[error("Invalid image size: {0}")]
    InvalidImageSize(u32),

    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// Output settings for trace images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Edge length of the square output image in pixels
    pub image_size: u32,

    /// Pen width in output pixels
    pub stroke_width: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            image_size: 256,
            stroke_width: 8.0,
        }
    }
}

/// Encoded trace image handed to the judge
#[derive(Debug, Clone, PartialEq)]
pub struct TraceImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl TraceImage {
    pub const MEDIA_TYPE: &'static str = "image/png";

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.png)
    }
}

/// Rasterize a trace drawn on a square canvas of `canvas_size` pixels
///
/// Each stroke is drawn separately so pen lifts stay visible. Single-point
/// strokes (dots) become filled circles. Non-finite points are dropped.
pub fn render_trace(
    trace: &Trace,
    canvas_size: f32,
    options: &RenderOptions,
) -> Result<TraceImage, RenderError> {
    if !canvas_size.is_finite() || canvas_size <= 0.0 {
        return Err(RenderError::InvalidCanvasSize(canvas_size));
    }

    let strokes: Vec<Vec<Point>> = trace
        .strokes()
        .into_iter()
        .map(|stroke| stroke.into_iter().filter(Point::is_finite).collect::<Vec<_>>())
        .filter(|stroke| !stroke.is_empty())
        .collect();

    if strokes.is_empty() {
        return Err(RenderError::EmptyTrace);
    }

    let size = options.image_size;
    let mut pixmap = Pixmap::new(size, size).ok_or(RenderError::InvalidImageSize(size))?;
    pixmap.fill(Color::WHITE);

    let scale = size as f32 / canvas_size;
    let transform = Transform::from_scale(scale, scale);
    let pen_width = options.stroke_width / scale;

    let mut paint = Paint::default();
    paint.set_color_rgba8(0, 0, 0, 255);
    paint.anti_alias = true;

    let pen = Stroke {
        width: pen_width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };

    for stroke in &strokes {
        let first = stroke[0];

        if stroke.iter().all(|p| *p == first) {
            if let Some(dot) = PathBuilder::from_circle(first.x, first.y, pen_width / 2.0) {
                pixmap.fill_path(&dot, &paint, FillRule::Winding, transform, None);
            }
            continue;
        }

        let mut builder = PathBuilder::new();
        builder.move_to(first.x, first.y);
        for p in &stroke[1..] {
            builder.line_to(p.x, p.y);
        }

        if let Some(path) = builder.finish() {
            pixmap.stroke_path(&path, &paint, &pen, transform, None);
        }
    }

    let png = pixmap
        .encode_png()
        .map_err(|e| RenderError::Encode(e.to_string()))?;

    log::debug!(
        "Rendered trace: {} strokes, {}x{} px, {} bytes",
        strokes.len(),
        size,
        size,
        png.len()
    );

    Ok(TraceImage {
        png,
        width: size,
        height: size,
    })
}
