//! Widgets for the bitemporal record visualizer
//!
//! Two widgets share the notification bus: [`BitemporalChart`] plots
//! records as rectangles in valid-time x transaction-time space, and
//! [`TableView`] lists the raw rows with containment-based
//! highlighting.

pub mod chart;
pub mod table;

use std::sync::Arc;

use bv_data::DataManager;
use chrono::NaiveDate;

pub use chart::{
    BitemporalChart, ChartMargins, ChartSignal, ChartStyle, DisplayList, DrawCommand, HoverState,
    PlotFrame, PlotMapper, PointerEvent,
};
pub use table::{TableConfig, TableView};

/// Context passed to widgets during rendering.
#[derive(Clone)]
pub struct ViewerContext {
    /// Shared dataset snapshots and the notification bus.
    pub data: Arc<DataManager>,
    /// The date treated as "now" for domain bounds and today markers.
    pub today: NaiveDate,
}
