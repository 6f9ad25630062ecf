//! Tabular record view with containment-based row highlighting.

use egui::Ui;
use egui_extras::{Column, TableBuilder};
use serde_json::Value;

use bv_core::record::{DatasetKey, DatePair, Dataset};

use crate::ViewerContext;

/// Configuration for table widgets.
#[derive(Debug, Clone)]
pub struct TableConfig {
    pub title: String,
    /// Point-query result tables opt out of hover highlighting.
    pub ignore_hover: bool,
    pub striped: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            ignore_hover: false,
            striped: true,
        }
    }
}

/// Table widget bound to one dataset key.
///
/// Shows every record as a row, columns taken from the first record's
/// fields in wire order. Hover broadcasts highlight the single row
/// effective at the hovered date pair; the table re-derives that match
/// itself, since only the pair crosses the bus.
pub struct TableView {
    key: DatasetKey,
    pub config: TableConfig,
    data: Dataset,
    highlight: Option<usize>,
    scroll_to: Option<usize>,
}

impl TableView {
    pub fn new(key: impl Into<DatasetKey>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            config: TableConfig {
                title: title.into(),
                ..TableConfig::default()
            },
            data: Dataset::default(),
            highlight: None,
            scroll_to: None,
        }
    }

    pub fn dataset_key(&self) -> &str {
        &self.key
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlight
    }

    /// Swap in a new snapshot. Row identity is positional, so any
    /// previous highlight is meaningless and gets cleared.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.data = dataset;
        self.highlight = None;
        self.scroll_to = None;
    }

    /// React to a hover broadcast: exclusively highlight the record
    /// effective at `dates`, or clear when nothing matches.
    pub fn apply_hover(&mut self, dates: &DatePair) {
        if self.config.ignore_hover {
            return;
        }
        let next = self
            .data
            .record_effective_at(dates)
            .map(|(index, _)| index);
        if next != self.highlight {
            self.highlight = next;
            self.scroll_to = next;
        }
    }

    /// Column names in wire order, from the first record.
    fn columns(&self) -> Vec<String> {
        self.data
            .records()
            .first()
            .map(|record| record.field_names().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn ui(&mut self, _ctx: &ViewerContext, ui: &mut Ui) {
        if !self.config.title.is_empty() {
            ui.strong(&self.config.title);
        }
        if self.data.is_empty() {
            ui.weak("No records loaded");
            return;
        }

        let columns = self.columns();
        let data = self.data.clone();
        let highlight = self.highlight;
        let text_height = egui::TextStyle::Body.resolve(ui.style()).size * 1.5;
        let selection_bg_fill = ui.style().visuals.selection.bg_fill;

        let mut builder = TableBuilder::new(ui)
            .striped(self.config.striped)
            .resizable(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .min_scrolled_height(0.0)
            .vscroll(true);
        for _ in &columns {
            builder = builder.column(Column::auto().at_least(60.0).clip(true));
        }
        if let Some(row) = self.scroll_to.take() {
            builder = builder.scroll_to_row(row, Some(egui::Align::Center));
        }

        builder
            .header(20.0, |mut header| {
                for column in &columns {
                    header.col(|ui| {
                        ui.strong(column);
                    });
                }
            })
            .body(|body| {
                body.rows(text_height, data.len(), |row_index, mut row| {
                    let is_highlighted = highlight == Some(row_index);
                    let record = data.get(row_index);
                    for column in &columns {
                        row.col(|ui| {
                            if is_highlighted {
                                ui.painter().rect_filled(
                                    ui.available_rect_before_wrap(),
                                    0.0,
                                    selection_bg_fill,
                                );
                            }
                            let text = record
                                .and_then(|record| record.get(column))
                                .map(cell_text)
                                .unwrap_or_default();
                            ui.label(text);
                        });
                    }
                });
            });
    }
}

/// Strings render raw (no quotes), nulls render empty, everything else
/// as compact JSON.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
