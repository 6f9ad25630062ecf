//! The bitemporal chart: records drawn as rectangles in valid-time x
//! transaction-time space.

mod hit;
mod mapper;
mod paint;
mod palette;
mod scene;

pub use hit::{handle_pointer, ChartSignal, HoverState, PointerEvent, PointerState};
pub use mapper::{ChartMargins, PlotFrame, PlotMapper};
pub use paint::paint_display_list;
pub use palette::{record_color, RECORD_PALETTE};
pub use scene::{build_scene, ChartStyle, DashPattern, DisplayList, DrawCommand};

use chrono::NaiveDate;
use egui::{CursorIcon, Rect, Sense, Ui};
use tracing::debug;

use bv_core::record::{DatasetKey, Dataset};

use crate::ViewerContext;

/// Chart widget bound to one dataset key.
///
/// The widget keeps its own dataset snapshot; the host swaps it via
/// [`set_dataset`](Self::set_dataset) when a change notification
/// arrives, and every frame renders the whole scene from scratch.
pub struct BitemporalChart {
    key: DatasetKey,
    style: ChartStyle,
    margins: ChartMargins,
    data: Dataset,
    hover: HoverState,
}

impl BitemporalChart {
    pub fn new(key: impl Into<DatasetKey>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            style: ChartStyle {
                title: title.into(),
                ..ChartStyle::default()
            },
            margins: ChartMargins::default(),
            data: Dataset::default(),
            hover: HoverState::default(),
        }
    }

    pub fn dataset_key(&self) -> &str {
        &self.key
    }

    pub fn style_mut(&mut self) -> &mut ChartStyle {
        &mut self.style
    }

    pub fn hover(&self) -> &HoverState {
        &self.hover
    }

    /// Swap in a new snapshot. Hover state is left alone; the next
    /// pointer move re-derives the match against the new records.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.data = dataset;
    }

    /// Build the retained scene for a surface rectangle.
    pub fn scene(&self, outer: Rect, today: NaiveDate) -> DisplayList {
        build_scene(
            &self.data,
            &PlotFrame::with_margins(outer, self.margins),
            &self.style,
            &self.hover,
            today,
        )
    }

    /// Feed one pointer event through the hit-tester.
    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        outer: Rect,
        today: NaiveDate,
    ) -> Option<ChartSignal> {
        hit::handle_pointer(
            &mut self.hover,
            &self.data,
            &PlotFrame::with_margins(outer, self.margins),
            today,
            event,
        )
    }

    /// Tooltip body for the hovered point: the date pair, plus the
    /// matched record pretty-printed.
    pub fn hover_summary(&self) -> Option<String> {
        let pointer = self.hover.pointer()?;
        let mut summary = pointer.dates.to_string();
        if self.hover.over_record() {
            if let Some(record) = self.hover.last_match().and_then(|index| self.data.get(index)) {
                if let Ok(json) = serde_json::to_string_pretty(record) {
                    summary.push('\n');
                    summary.push_str(&json);
                }
            }
        }
        Some(summary)
    }

    /// Draw into the available space and publish any resulting
    /// notifications on the bus.
    pub fn ui(&mut self, ctx: &ViewerContext, ui: &mut Ui) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click());
        let outer = response.rect;

        let event = if response.clicked() {
            response.interact_pointer_pos().map(PointerEvent::Clicked)
        } else if let Some(pos) = response.hover_pos() {
            Some(PointerEvent::Moved(pos))
        } else if self.hover.pointer().is_some() {
            Some(PointerEvent::Left)
        } else {
            None
        };

        if let Some(event) = event {
            match self.handle_pointer(event, outer, ctx.today) {
                Some(ChartSignal::Hover(dates)) => {
                    debug!(key = %self.key, %dates, "hover edge");
                    ctx.data.publish_hover(dates);
                }
                Some(ChartSignal::Query(dates)) => {
                    debug!(key = %self.key, %dates, "point query");
                    ctx.data.publish_query(dates);
                }
                None => {}
            }
        }

        if self.hover.over_record() {
            ui.output_mut(|output| output.cursor_icon = CursorIcon::PointingHand);
        }

        paint_display_list(&painter, &self.scene(outer, ctx.today));

        if let Some(summary) = self.hover_summary() {
            response.on_hover_text_at_pointer(summary);
        }
    }
}
