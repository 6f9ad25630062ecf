//! Pointer hit-testing and hover bookkeeping.

use chrono::NaiveDate;
use egui::Pos2;

use bv_core::domain::DomainBounds;
use bv_core::record::{DatePair, Dataset};

use super::mapper::{PlotFrame, PlotMapper};

/// Pointer activity, translated out of the host toolkit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Moved(Pos2),
    Clicked(Pos2),
    Left,
}

/// What the chart wants published after handling a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartSignal {
    /// The hovered record changed; carries only the date pair.
    Hover(DatePair),
    /// A point-in-time query at the clicked pair.
    Query(DatePair),
}

/// The pointer's position inside the plot and the dates under it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerState {
    pub pos: Pos2,
    pub dates: DatePair,
}

/// Hover bookkeeping, mutated only by [`handle_pointer`].
///
/// `last_match` survives pointer exits and dataset replaces on
/// purpose: hover notifications are edge-triggered on it, and a replay
/// of the same match must stay silent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HoverState {
    pointer: Option<PointerState>,
    last_match: Option<usize>,
    over_record: bool,
}

impl HoverState {
    pub fn pointer(&self) -> Option<&PointerState> {
        self.pointer.as_ref()
    }

    /// Dataset index of the most recently hovered record.
    pub fn last_match(&self) -> Option<usize> {
        self.last_match
    }

    /// Whether the pointer currently sits on a record rectangle.
    /// Updated on every move regardless of edges; drives the cursor
    /// affordance.
    pub fn over_record(&self) -> bool {
        self.over_record
    }
}

/// Resolve one pointer event against the dataset's rectangles.
///
/// Moves inside the plot update the crosshair position and re-run the
/// containment scan; a [`ChartSignal::Hover`] comes back only when the
/// matched record (or lack of one) differs from the previous move.
/// Clicks inside the plot always produce exactly one
/// [`ChartSignal::Query`]. Everything outside the plot rectangle is
/// inert apart from clearing the crosshair.
pub fn handle_pointer(
    hover: &mut HoverState,
    dataset: &Dataset,
    frame: &PlotFrame,
    today: NaiveDate,
    event: PointerEvent,
) -> Option<ChartSignal> {
    if frame.is_degenerate() {
        return None;
    }
    let plot = frame.plot_rect();
    let bounds = DomainBounds::compute(dataset, today);
    let mapper = PlotMapper::new(bounds, plot);

    match event {
        PointerEvent::Moved(pos) => {
            if !plot.contains(pos) {
                hover.pointer = None;
                hover.over_record = false;
                return None;
            }
            let pos = plot.clamp(pos);
            let dates = mapper.pos_to_pair(pos);
            hover.pointer = Some(PointerState { pos, dates });

            let matched = match_at(dataset, &dates);
            hover.over_record = matched.is_some();
            if matched != hover.last_match {
                hover.last_match = matched;
                return Some(ChartSignal::Hover(dates));
            }
            None
        }
        PointerEvent::Clicked(pos) => {
            if !plot.contains(pos) {
                return None;
            }
            let dates = mapper.pos_to_pair(plot.clamp(pos));
            Some(ChartSignal::Query(dates))
        }
        PointerEvent::Left => {
            hover.pointer = None;
            hover.over_record = false;
            None
        }
    }
}

/// Last record in dataset order whose extent contains the pair.
/// Later records paint on top, so they win the hit.
fn match_at(dataset: &Dataset, dates: &DatePair) -> Option<usize> {
    let mut matched = None;
    for (index, record) in dataset.iter().enumerate() {
        if record
            .extent()
            .map_or(false, |extent| extent.contains(dates))
        {
            matched = Some(index);
        }
    }
    matched
}
