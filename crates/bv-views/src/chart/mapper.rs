//! Plot geometry and the date <-> pixel coordinate mapping.

use chrono::{Duration, NaiveDate};
use egui::{Pos2, Rect};

use bv_core::domain::{AxisBounds, DomainBounds};
use bv_core::record::DatePair;

/// Fixed insets between the drawing surface and the plot rectangle,
/// in pixels. The margins hold the axis labels and titles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartMargins {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Default for ChartMargins {
    fn default() -> Self {
        Self {
            left: 80.0,
            top: 40.0,
            right: 20.0,
            bottom: 50.0,
        }
    }
}

/// The drawing surface and the plot rectangle inset into it.
#[derive(Debug, Clone, Copy)]
pub struct PlotFrame {
    pub outer: Rect,
    pub margins: ChartMargins,
}

impl PlotFrame {
    pub fn new(outer: Rect) -> Self {
        Self {
            outer,
            margins: ChartMargins::default(),
        }
    }

    pub fn with_margins(outer: Rect, margins: ChartMargins) -> Self {
        Self { outer, margins }
    }

    /// The rectangle records are drawn into.
    pub fn plot_rect(&self) -> Rect {
        Rect::from_min_max(
            Pos2::new(
                self.outer.left() + self.margins.left,
                self.outer.top() + self.margins.top,
            ),
            Pos2::new(
                self.outer.right() - self.margins.right,
                self.outer.bottom() - self.margins.bottom,
            ),
        )
    }

    /// A frame too small to hold a plot; rendering and hit-testing
    /// short-circuit on it.
    pub fn is_degenerate(&self) -> bool {
        let plot = self.plot_rect();
        !(plot.width() > 0.0 && plot.height() > 0.0)
            || !plot.width().is_finite()
            || !plot.height().is_finite()
    }
}

/// Linear, invertible mapping between dates and pixels inside the
/// plot rectangle.
///
/// Valid time runs along X, later dates to the right. Transaction
/// time runs along Y, later dates toward the top, so pixel Y is
/// inverted against date order.
#[derive(Debug, Clone, Copy)]
pub struct PlotMapper {
    bounds: DomainBounds,
    plot: Rect,
}

// Soaks up f32 pixel quantization so a date mapped to a pixel and
// back lands on itself instead of the previous day.
const DAY_EPSILON: f64 = 5e-3;

impl PlotMapper {
    pub fn new(bounds: DomainBounds, plot: Rect) -> Self {
        Self { bounds, plot }
    }

    pub fn bounds(&self) -> &DomainBounds {
        &self.bounds
    }

    pub fn plot(&self) -> Rect {
        self.plot
    }

    pub fn x_to_px(&self, date: NaiveDate) -> f32 {
        let axis = self.bounds.x;
        if axis.is_degenerate() {
            return self.plot.left();
        }
        let t = (date - axis.min).num_days() as f64 / axis.span_days() as f64;
        (self.plot.left() as f64 + t * self.plot.width() as f64) as f32
    }

    pub fn y_to_px(&self, date: NaiveDate) -> f32 {
        let axis = self.bounds.y;
        if axis.is_degenerate() {
            return self.plot.bottom();
        }
        let t = (date - axis.min).num_days() as f64 / axis.span_days() as f64;
        (self.plot.bottom() as f64 - t * self.plot.height() as f64) as f32
    }

    /// Invert a pixel X to a valid date. The pixel is clamped into the
    /// plot rectangle first; fractional days truncate toward the
    /// earlier day.
    pub fn px_to_x(&self, px: f32) -> NaiveDate {
        let axis = self.bounds.x;
        if axis.is_degenerate() || self.plot.width() <= 0.0 {
            return axis.min;
        }
        let px = px.clamp(self.plot.left(), self.plot.right());
        let t = (px - self.plot.left()) as f64 / self.plot.width() as f64;
        date_at(axis, t)
    }

    /// Invert a pixel Y to a transaction date, same clamping and
    /// truncation as [`px_to_x`](Self::px_to_x).
    pub fn px_to_y(&self, px: f32) -> NaiveDate {
        let axis = self.bounds.y;
        if axis.is_degenerate() || self.plot.height() <= 0.0 {
            return axis.min;
        }
        let px = px.clamp(self.plot.top(), self.plot.bottom());
        let t = (self.plot.bottom() - px) as f64 / self.plot.height() as f64;
        date_at(axis, t)
    }

    /// The date pair under a pointer position.
    pub fn pos_to_pair(&self, pos: Pos2) -> DatePair {
        DatePair::new(self.px_to_x(pos.x), self.px_to_y(pos.y))
    }
}

fn date_at(axis: AxisBounds, t: f64) -> NaiveDate {
    let days = t * axis.span_days() as f64;
    let offset = (days + DAY_EPSILON).floor() as i64;
    axis.min + Duration::days(offset)
}
