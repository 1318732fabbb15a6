//! Browser canvas surface.
//!
//! Implements [`Surface`] for `CanvasRenderingContext2d` so a host running in
//! WebAssembly can hand its chart pane context straight to
//! [`PaneView::draw`].

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::geom::Point;
use crate::mark::Mark;
use crate::render::{Surface, SurfaceError};

fn backend(err: JsValue) -> SurfaceError {
    SurfaceError::Backend(format!("{err:?}"))
}

impl Surface for CanvasRenderingContext2d {
    fn save(&mut self) {
        CanvasRenderingContext2d::save(self);
    }

    fn restore(&mut self) {
        CanvasRenderingContext2d::restore(self);
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        CanvasRenderingContext2d::set_global_alpha(self, alpha);
    }

    fn set_stroke_style(&mut self, color: &str) {
        self.set_stroke_style_str(color);
    }

    fn set_fill_style(&mut self, color: &str) {
        self.set_fill_style_str(color);
    }

    fn set_line_width(&mut self, width: f64) {
        CanvasRenderingContext2d::set_line_width(self, width);
    }

    fn set_line_dash(&mut self, pattern: &[f64]) -> Result<(), SurfaceError> {
        let dash = js_sys::Array::new();
        for segment in pattern {
            dash.push(&(*segment).into());
        }
        CanvasRenderingContext2d::set_line_dash(self, &dash).map_err(backend)
    }

    fn begin_path(&mut self) {
        CanvasRenderingContext2d::begin_path(self);
    }

    fn move_to(&mut self, p: Point) {
        CanvasRenderingContext2d::move_to(self, p.x, p.y);
    }

    fn line_to(&mut self, p: Point) {
        CanvasRenderingContext2d::line_to(self, p.x, p.y);
    }

    fn quadratic_curve_to(&mut self, control: Point, end: Point) {
        CanvasRenderingContext2d::quadratic_curve_to(self, control.x, control.y, end.x, end.y);
    }

    fn arc(
        &mut self,
        center: Point,
        radius: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    ) -> Result<(), SurfaceError> {
        self.arc_with_anticlockwise(center.x, center.y, radius, start, end, anticlockwise).map_err(backend)
    }

    fn ellipse(&mut self, center: Point, rx: f64, ry: f64) -> Result<(), SurfaceError> {
        CanvasRenderingContext2d::ellipse(self, center.x, center.y, rx, ry, 0.0, 0.0, std::f64::consts::TAU)
            .map_err(backend)
    }

    fn close_path(&mut self) {
        CanvasRenderingContext2d::close_path(self);
    }

    fn stroke(&mut self) {
        CanvasRenderingContext2d::stroke(self);
    }

    fn fill(&mut self) {
        CanvasRenderingContext2d::fill(self);
    }

    fn fill_text(&mut self, text: &str, at: Point, font_px: f64) -> Result<(), SurfaceError> {
        self.set_font(&format!("{font_px:.0}px sans-serif"));
        CanvasRenderingContext2d::fill_text(self, text, at.x, at.y).map_err(backend)
    }
}

/// Draw every pane view of `marks` onto `ctx`, stopping at the first
/// backend failure.
///
/// # Errors
///
/// Returns the first `JsValue` error raised by the canvas.
pub fn draw_marks<'a>(
    ctx: &mut CanvasRenderingContext2d,
    marks: impl IntoIterator<Item = &'a Mark>,
) -> Result<(), JsValue> {
    for mark in marks {
        for view in mark.pane_views() {
            view.draw(ctx).map_err(|e| JsValue::from_str(&e.to_string()))?;
        }
    }
    Ok(())
}
