//! Rendering: draws one mark's resolved geometry onto a 2D pixel surface.
//!
//! The host engine calls [`crate::mark::Mark::pane_views`] and then
//! [`PaneView::draw`] with whatever surface it paints on. Drawing reads a
//! frozen view of the mark and never mutates application state.
//!
//! How a mark looks while being placed, dragged, or hovered is decided once
//! per update as a [`RenderIntent`], not re-derived from flags inside the
//! draw routine.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::f64::consts::PI;

use crate::consts::{
    HANDLE_ACTIVE_RADIUS_PX, HANDLE_INNER_RADIUS_PX, HANDLE_OUTER_RADIUS_PX, TEXT_FONT_PX, TRANSIENT_ALPHA,
};
use crate::geom::Point;
use crate::input::Handle;
use crate::shape::{Geometry, Primitive};
use crate::style::{LineStyle, MarkStyle, with_alpha};

/// Fill used for the inner dot of every handle.
const HANDLE_INNER_FILL: &str = "#fff";

/// Errors raised by a drawing surface.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("surface call failed: {0}")]
    Backend(String),
}

/// A 2D pixel-space drawing target, modelled on the canvas 2D API.
pub trait Surface {
    fn save(&mut self);
    fn restore(&mut self);
    fn set_global_alpha(&mut self, alpha: f64);
    fn set_stroke_style(&mut self, color: &str);
    fn set_fill_style(&mut self, color: &str);
    fn set_line_width(&mut self, width: f64);
    /// # Errors
    ///
    /// Returns `Err` if the backend rejects the pattern.
    fn set_line_dash(&mut self, pattern: &[f64]) -> Result<(), SurfaceError>;
    fn begin_path(&mut self);
    fn move_to(&mut self, p: Point);
    fn line_to(&mut self, p: Point);
    fn quadratic_curve_to(&mut self, control: Point, end: Point);
    /// # Errors
    ///
    /// Returns `Err` on a negative radius or backend failure.
    fn arc(&mut self, center: Point, radius: f64, start: f64, end: f64, anticlockwise: bool)
    -> Result<(), SurfaceError>;
    /// # Errors
    ///
    /// Returns `Err` on negative radii or backend failure.
    fn ellipse(&mut self, center: Point, rx: f64, ry: f64) -> Result<(), SurfaceError>;
    fn close_path(&mut self);
    fn stroke(&mut self);
    fn fill(&mut self);
    /// # Errors
    ///
    /// Returns `Err` if the backend fails to draw the text.
    fn fill_text(&mut self, text: &str, at: Point, font_px: f64) -> Result<(), SurfaceError>;
}

/// How a mark should be drawn, computed once per update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderIntent {
    #[default]
    Committed,
    /// Committed with handles visible (hovered or selected).
    CommittedHighlighted,
    /// Not yet committed: translucent, dashed outline, handles visible.
    Preview,
    /// Being dragged or adjusted: translucent, active handle enlarged.
    Dragging,
}

impl RenderIntent {
    /// Resolve the intent from a mark's edit flags.
    #[must_use]
    pub fn from_flags(preview: bool, dragging: bool, show_handles: bool) -> Self {
        if preview {
            Self::Preview
        } else if dragging {
            Self::Dragging
        } else if show_handles {
            Self::CommittedHighlighted
        } else {
            Self::Committed
        }
    }

    #[must_use]
    pub fn alpha(self) -> f64 {
        match self {
            Self::Preview | Self::Dragging => TRANSIENT_ALPHA,
            Self::Committed | Self::CommittedHighlighted => 1.0,
        }
    }

    #[must_use]
    pub fn shows_handles(self) -> bool {
        !matches!(self, Self::Committed)
    }

    /// Dash pattern to stroke with: previews are always dashed.
    #[must_use]
    pub fn dash(self, style: LineStyle) -> &'static [f64] {
        match self {
            Self::Preview => LineStyle::Dashed.dash_pattern(),
            _ => style.dash_pattern(),
        }
    }
}

/// A frozen, drawable view of one mark.
#[derive(Debug, Clone, PartialEq)]
pub struct PaneView {
    pub geometry: Geometry,
    pub style: MarkStyle,
    pub intent: RenderIntent,
    /// Handle being dragged, drawn enlarged.
    pub active: Option<Handle>,
}

impl PaneView {
    /// Draw the mark: fills, strokes, text, then handles.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any surface call fails.
    pub fn draw(&self, surface: &mut dyn Surface) -> Result<(), SurfaceError> {
        surface.save();
        let result = self.draw_inner(surface);
        surface.restore();
        result
    }

    fn draw_inner(&self, surface: &mut dyn Surface) -> Result<(), SurfaceError> {
        surface.set_global_alpha(self.intent.alpha());

        // Layer 1: translucent fills underneath the strokes.
        let fill = with_alpha(&self.style.color, self.style.fill_opacity);
        let band = with_alpha(&self.style.color, self.style.background_opacity);
        for prim in &self.geometry.primitives {
            match prim {
                Primitive::Band(points) => fill_polygon(surface, points, &band),
                Primitive::Area(points) => fill_polygon(surface, points, &fill),
                Primitive::Zone { points, tone } => {
                    fill_polygon(surface, points, &with_alpha(tone.color(), self.style.fill_opacity));
                }
                Primitive::Disc { center, rx, ry } => {
                    surface.set_fill_style(&fill);
                    surface.begin_path();
                    surface.ellipse(*center, *rx, *ry)?;
                    surface.fill();
                }
                Primitive::Wedge { center, radius, start, sweep } => {
                    surface.set_fill_style(&fill);
                    surface.begin_path();
                    surface.move_to(*center);
                    surface.arc(*center, *radius, *start, start + sweep, *sweep < 0.0)?;
                    surface.close_path();
                    surface.fill();
                }
                _ => {}
            }
        }

        // Layer 2: strokes.
        surface.set_stroke_style(&self.style.color);
        surface.set_fill_style(&self.style.color);
        surface.set_line_width(self.style.line_width);
        surface.set_line_dash(self.intent.dash(self.style.line_style))?;
        for prim in &self.geometry.primitives {
            stroke_primitive(surface, prim)?;
        }
        surface.set_line_dash(&[])?;

        // Layer 3: text.
        for prim in &self.geometry.primitives {
            match prim {
                Primitive::TextBox { at, text, size } => surface.fill_text(text, *at, *size)?,
                Primitive::Label { at, text } => surface.fill_text(text, at.offset(4.0, -4.0), TEXT_FONT_PX * 0.8)?,
                _ => {}
            }
        }

        // Layer 4: handles.
        if self.intent.shows_handles() {
            self.draw_handles(surface)?;
        }
        Ok(())
    }

    fn draw_handles(&self, surface: &mut dyn Surface) -> Result<(), SurfaceError> {
        surface.set_global_alpha(1.0);
        surface.set_line_dash(&[])?;
        for (handle, at) in &self.geometry.handles {
            let outer = if self.active == Some(*handle) { HANDLE_ACTIVE_RADIUS_PX } else { HANDLE_OUTER_RADIUS_PX };
            surface.set_fill_style(&self.style.color);
            surface.begin_path();
            surface.arc(*at, outer, 0.0, 2.0 * PI, false)?;
            surface.fill();
            surface.set_fill_style(HANDLE_INNER_FILL);
            surface.begin_path();
            surface.arc(*at, HANDLE_INNER_RADIUS_PX, 0.0, 2.0 * PI, false)?;
            surface.fill();
        }
        Ok(())
    }
}

fn fill_polygon(surface: &mut dyn Surface, points: &[Point], color: &str) {
    if trace_polygon(surface, points) {
        surface.set_fill_style(color);
        surface.fill();
    }
}

/// Begin a closed path through `points`. Returns `false` for an empty list.
fn trace_polygon(surface: &mut dyn Surface, points: &[Point]) -> bool {
    let Some((first, rest)) = points.split_first() else {
        return false;
    };
    surface.begin_path();
    surface.move_to(*first);
    for p in rest {
        surface.line_to(*p);
    }
    surface.close_path();
    true
}

fn stroke_primitive(surface: &mut dyn Surface, prim: &Primitive) -> Result<(), SurfaceError> {
    match prim {
        Primitive::Segment(a, b) => {
            surface.begin_path();
            surface.move_to(*a);
            surface.line_to(*b);
            surface.stroke();
        }
        Primitive::Polyline { points, closed } => {
            let Some((first, rest)) = points.split_first() else {
                return Ok(());
            };
            surface.begin_path();
            surface.move_to(*first);
            for p in rest {
                surface.line_to(*p);
            }
            if *closed {
                surface.close_path();
            }
            surface.stroke();
        }
        Primitive::Quad { start, control, end } => {
            surface.begin_path();
            surface.move_to(*start);
            surface.quadratic_curve_to(*control, *end);
            surface.stroke();
        }
        Primitive::Ellipse { center, rx, ry } => {
            surface.begin_path();
            surface.ellipse(*center, *rx, *ry)?;
            surface.stroke();
        }
        Primitive::Arc { center, radius, start, sweep } => {
            surface.begin_path();
            surface.arc(*center, *radius, *start, start + sweep, *sweep < 0.0)?;
            surface.stroke();
        }
        Primitive::Solid(points) => {
            if trace_polygon(surface, points) {
                surface.fill();
            }
        }
        Primitive::Area(_)
        | Primitive::Zone { .. }
        | Primitive::Disc { .. }
        | Primitive::Wedge { .. }
        | Primitive::Band(_)
        | Primitive::TextBox { .. }
        | Primitive::Label { .. } => {}
    }
    Ok(())
}
