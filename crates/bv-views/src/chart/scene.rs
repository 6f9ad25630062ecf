//! Retained draw list for the bitemporal chart.
//!
//! A redraw produces a [`DisplayList`] instead of touching a painter,
//! so tests can assert on computed geometry and any surface that can
//! stroke lines, fill rectangles and place text can replay it.

use std::f32::consts::FRAC_PI_2;

use chrono::{Datelike, NaiveDate};
use egui::{Align2, Color32, Pos2, Rect, Stroke};

use bv_core::domain::DomainBounds;
use bv_core::record::Dataset;

use super::hit::HoverState;
use super::mapper::{PlotFrame, PlotMapper};
use super::palette::record_color;

const TICK_LENGTH: f32 = 5.0;
const TICK_LABEL_GAP: f32 = 8.0;
const X_TITLE_OFFSET: f32 = 30.0;
const Y_TITLE_OFFSET: f32 = 60.0;
const TITLE_TOP_PAD: f32 = 5.0;
const TITLE_SCALE: f32 = 1.5;
const TODAY_DASH: DashPattern = DashPattern { on: 5.0, off: 5.0 };
// Keeps a garbage year range from flooding the list with ticks.
const MAX_TICKS: usize = 400;

/// Dash pattern for reference lines, in pixels on/off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashPattern {
    pub on: f32,
    pub off: f32,
}

/// One primitive drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Line {
        from: Pos2,
        to: Pos2,
        stroke: Stroke,
        dash: Option<DashPattern>,
    },
    Rect {
        rect: Rect,
        fill: Color32,
    },
    Text {
        pos: Pos2,
        text: String,
        size: f32,
        color: Color32,
        anchor: Align2,
        /// Radians, counter-clockwise; rotated text is centre-anchored
        /// on `pos`.
        angle: f32,
    },
}

/// The ordered result of one full redraw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn line(&mut self, from: Pos2, to: Pos2, stroke: Stroke) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            stroke,
            dash: None,
        });
    }

    fn dashed_line(&mut self, from: Pos2, to: Pos2, stroke: Stroke, dash: DashPattern) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            stroke,
            dash: Some(dash),
        });
    }

    fn rect(&mut self, rect: Rect, fill: Color32) {
        self.commands.push(DrawCommand::Rect { rect, fill });
    }

    fn text(&mut self, pos: Pos2, text: impl Into<String>, size: f32, color: Color32, anchor: Align2) {
        self.commands.push(DrawCommand::Text {
            pos,
            text: text.into(),
            size,
            color,
            anchor,
            angle: 0.0,
        });
    }

    fn rotated_text(&mut self, pos: Pos2, text: impl Into<String>, size: f32, color: Color32, angle: f32) {
        self.commands.push(DrawCommand::Text {
            pos,
            text: text.into(),
            size,
            color,
            anchor: Align2::CENTER_CENTER,
            angle,
        });
    }
}

/// Visual parameters of the chart scene.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub title: String,
    pub x_axis_title: String,
    pub y_axis_title: String,
    pub text_size: f32,
    pub text_color: Color32,
    pub axis_color: Color32,
    pub today_color: Color32,
    pub crosshair_color: Color32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            title: "Bitemporal Chart".to_string(),
            x_axis_title: "Valid Time".to_string(),
            y_axis_title: "Transaction Time".to_string(),
            text_size: 14.0,
            text_color: Color32::from_gray(220),
            axis_color: Color32::from_gray(160),
            today_color: Color32::from_rgb(0xd6, 0x27, 0x28),
            crosshair_color: Color32::from_rgba_unmultiplied(230, 230, 230, 128),
        }
    }
}

/// Build the scene for one redraw.
///
/// Pure function of its inputs: domain bounds are recomputed from the
/// dataset unconditionally, and the command order is fixed (axes,
/// record rectangles, today markers, crosshair). A degenerate frame
/// yields an empty list.
pub fn build_scene(
    dataset: &Dataset,
    frame: &PlotFrame,
    style: &ChartStyle,
    hover: &HoverState,
    today: NaiveDate,
) -> DisplayList {
    let mut list = DisplayList::default();
    if frame.is_degenerate() {
        return list;
    }

    let bounds = DomainBounds::compute(dataset, today);
    let mapper = PlotMapper::new(bounds, frame.plot_rect());

    draw_axes(&mut list, frame, &mapper, style);
    draw_records(&mut list, dataset, &mapper);
    draw_today_lines(&mut list, &mapper, style, today);
    draw_crosshair(&mut list, &mapper, style, hover);
    list
}

fn draw_axes(list: &mut DisplayList, frame: &PlotFrame, mapper: &PlotMapper, style: &ChartStyle) {
    let plot = mapper.plot();
    let bounds = mapper.bounds();
    let stroke = Stroke::new(1.0, style.axis_color);

    if !style.title.is_empty() {
        list.text(
            Pos2::new(plot.center().x, frame.outer.top() + TITLE_TOP_PAD),
            style.title.clone(),
            style.text_size * TITLE_SCALE,
            style.text_color,
            Align2::CENTER_TOP,
        );
    }

    // Y axis, then X axis along the bottom.
    list.line(plot.left_top(), plot.left_bottom(), stroke);
    list.line(plot.left_bottom(), plot.right_bottom(), stroke);

    for year in year_ticks(bounds.x.min, bounds.x.max) {
        let Some(tick) = NaiveDate::from_ymd_opt(year, 1, 1) else {
            continue;
        };
        let x = mapper.x_to_px(tick);
        list.line(
            Pos2::new(x, plot.bottom()),
            Pos2::new(x, plot.bottom() + TICK_LENGTH),
            stroke,
        );
        list.text(
            Pos2::new(x, plot.bottom() + TICK_LABEL_GAP),
            year.to_string(),
            style.text_size,
            style.text_color,
            Align2::CENTER_TOP,
        );
    }

    for year in year_ticks(bounds.y.min, bounds.y.max) {
        let Some(tick) = NaiveDate::from_ymd_opt(year, 1, 1) else {
            continue;
        };
        let y = mapper.y_to_px(tick);
        list.line(
            Pos2::new(plot.left() - TICK_LENGTH, y),
            Pos2::new(plot.left(), y),
            stroke,
        );
        list.text(
            Pos2::new(plot.left() - TICK_LABEL_GAP, y),
            year.to_string(),
            style.text_size,
            style.text_color,
            Align2::RIGHT_CENTER,
        );
    }

    list.text(
        Pos2::new(plot.center().x, plot.bottom() + X_TITLE_OFFSET),
        style.x_axis_title.clone(),
        style.text_size,
        style.text_color,
        Align2::CENTER_TOP,
    );
    list.rotated_text(
        Pos2::new(plot.left() - Y_TITLE_OFFSET, plot.center().y),
        style.y_axis_title.clone(),
        style.text_size,
        style.text_color,
        -FRAC_PI_2,
    );
}

/// Year boundaries covering `[min, max]`, one tick per January 1st.
fn year_ticks(min: NaiveDate, max: NaiveDate) -> impl Iterator<Item = i32> {
    (min.year()..=max.year()).take(MAX_TICKS)
}

fn draw_records(list: &mut DisplayList, dataset: &Dataset, mapper: &PlotMapper) {
    let plot = mapper.plot();
    let bounds = mapper.bounds();

    for (index, record) in dataset.iter().enumerate() {
        let Some(extent) = record.extent() else {
            continue;
        };
        // Open ends render to the domain edge.
        let left = mapper.x_to_px(extent.valid.from);
        let right = mapper.x_to_px(extent.valid.to.unwrap_or(bounds.x.max));
        let bottom = mapper.y_to_px(extent.tran.from);
        let top = mapper.y_to_px(extent.tran.to.unwrap_or(bounds.y.max));

        let rect = Rect::from_min_max(Pos2::new(left, top), Pos2::new(right, bottom)).intersect(plot);
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            continue;
        }
        // Palette index is the dataset position, malformed rows included.
        list.rect(rect, record_color(index));
    }
}

fn draw_today_lines(list: &mut DisplayList, mapper: &PlotMapper, style: &ChartStyle, today: NaiveDate) {
    let plot = mapper.plot();
    let bounds = mapper.bounds();
    let stroke = Stroke::new(2.0, style.today_color);

    if bounds.y.min <= today && today <= bounds.y.max {
        let y = mapper.y_to_px(today);
        list.dashed_line(
            Pos2::new(plot.left(), y),
            Pos2::new(plot.right(), y),
            stroke,
            TODAY_DASH,
        );
    }
    if bounds.x.min <= today && today <= bounds.x.max {
        let x = mapper.x_to_px(today);
        list.dashed_line(
            Pos2::new(x, plot.top()),
            Pos2::new(x, plot.bottom()),
            stroke,
            TODAY_DASH,
        );
    }
}

fn draw_crosshair(list: &mut DisplayList, mapper: &PlotMapper, style: &ChartStyle, hover: &HoverState) {
    let Some(pointer) = hover.pointer() else {
        return;
    };
    let plot = mapper.plot();
    let stroke = Stroke::new(1.0, style.crosshair_color);
    list.line(
        Pos2::new(pointer.pos.x, plot.top()),
        Pos2::new(pointer.pos.x, plot.bottom()),
        stroke,
    );
    list.line(
        Pos2::new(plot.left(), pointer.pos.y),
        Pos2::new(plot.right(), pointer.pos.y),
        stroke,
    );
}
