//! Main application entry point

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use anyhow::Result;
use chrono::Local;
use egui::Context;
use parking_lot::Mutex;
use tracing::info;

use bv_core::record::{DatePair, Dataset};
use bv_data::{DataManager, FetchParams};
use bv_views::{BitemporalChart, TableView, ViewerContext};

mod config;
mod demo;

use config::AppConfig;
use demo::{DemoFetcher, DEPARTMENT_KEY, EMPLOYEE_KEY, POINT_QUERY_KEY};

/// Latest-value cell a bus subscription fills and the UI thread
/// drains once per frame.
type Inbox<T> = Arc<Mutex<Option<T>>>;

/// Main application state
struct BitemporalApp {
    config: AppConfig,
    manager: Arc<DataManager>,

    /// Tokio runtime backing all loads
    runtime: tokio::runtime::Runtime,

    dept_chart: BitemporalChart,
    emp_chart: BitemporalChart,
    dept_table: TableView,
    emp_table: TableView,
    query_table: TableView,

    dept_inbox: Inbox<Dataset>,
    emp_inbox: Inbox<Dataset>,
    query_inbox: Inbox<Dataset>,
    hover_inbox: Inbox<DatePair>,
}

impl BitemporalApp {
    fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        // Initialize tokio runtime
        let runtime = tokio::runtime::Runtime::new().unwrap();

        let fetcher = Arc::new(DemoFetcher::new(&config));
        let manager = Arc::new(DataManager::new(fetcher, runtime.handle().clone()));

        let dept_inbox = Inbox::default();
        let emp_inbox = Inbox::default();
        let query_inbox = Inbox::default();
        let hover_inbox = Inbox::default();

        // Dataset subscriptions fill an inbox and wake the UI; the
        // widgets pick the snapshot up on the next frame.
        for (key, inbox) in [
            (DEPARTMENT_KEY, &dept_inbox),
            (EMPLOYEE_KEY, &emp_inbox),
            (POINT_QUERY_KEY, &query_inbox),
        ] {
            let inbox: Inbox<Dataset> = inbox.clone();
            let egui_ctx = cc.egui_ctx.clone();
            manager.subscribe_dataset(key, move |dataset: &Dataset| {
                *inbox.lock() = Some(dataset.clone());
                egui_ctx.request_repaint();
            });
        }

        {
            let inbox = hover_inbox.clone();
            let egui_ctx = cc.egui_ctx.clone();
            manager.subscribe_hover(move |dates: &DatePair| {
                *inbox.lock() = Some(*dates);
                egui_ctx.request_repaint();
            });
        }

        // One query binding for the whole app: every chart click turns
        // into a point-query load.
        {
            let weak: Weak<DataManager> = Arc::downgrade(&manager);
            manager.subscribe_query(move |dates: &DatePair| {
                if let Some(manager) = weak.upgrade() {
                    manager.request_load(POINT_QUERY_KEY, FetchParams::as_of(*dates));
                }
            });
        }

        let dept_title = config.department_title();
        let emp_title = config.employee_title();

        let mut query_table = TableView::new(POINT_QUERY_KEY, "Query Results");
        query_table.config.ignore_hover = true;

        let app = Self {
            dept_chart: BitemporalChart::new(DEPARTMENT_KEY, dept_title.clone()),
            emp_chart: BitemporalChart::new(EMPLOYEE_KEY, emp_title.clone()),
            dept_table: TableView::new(DEPARTMENT_KEY, dept_title),
            emp_table: TableView::new(EMPLOYEE_KEY, emp_title),
            query_table,
            config,
            manager,
            runtime,
            dept_inbox,
            emp_inbox,
            query_inbox,
            hover_inbox,
        };
        app.reload_all();
        app
    }

    /// Kick off a fresh load of both entity datasets.
    fn reload_all(&self) {
        let manager = self.manager.clone();
        let dept_params =
            FetchParams::default().with_filter("deptId", self.config.dept_id.to_string());
        let emp_params =
            FetchParams::default().with_filter("empId", self.config.emp_id.to_string());
        self.runtime.spawn(async move {
            // Failures are logged and recorded by load() itself.
            let _ = tokio::join!(
                manager.load(DEPARTMENT_KEY, dept_params),
                manager.load(EMPLOYEE_KEY, emp_params),
            );
        });
    }

    /// Apply whatever the bus delivered since the last frame.
    fn drain_inboxes(&mut self) {
        if let Some(dataset) = self.dept_inbox.lock().take() {
            self.dept_chart.set_dataset(dataset.clone());
            self.dept_table.set_dataset(dataset);
        }
        if let Some(dataset) = self.emp_inbox.lock().take() {
            self.emp_chart.set_dataset(dataset.clone());
            self.emp_table.set_dataset(dataset);
        }
        if let Some(dataset) = self.query_inbox.lock().take() {
            self.query_table.set_dataset(dataset);
        }
        if let Some(dates) = self.hover_inbox.lock().take() {
            self.dept_table.apply_hover(&dates);
            self.emp_table.apply_hover(&dates);
            self.query_table.apply_hover(&dates);
        }
    }

    fn connection_error(&self) -> Option<String> {
        [DEPARTMENT_KEY, EMPLOYEE_KEY, POINT_QUERY_KEY]
            .iter()
            .find_map(|key| {
                self.manager
                    .last_load_error(key)
                    .map(|message| format!("{key}: {message}"))
            })
    }
}

impl eframe::App for BitemporalApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.drain_inboxes();

        let viewer = ViewerContext {
            data: self.manager.clone(),
            today: Local::now().date_naive(),
        };

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Bitemporal Visualizer");
                ui.separator();
                if ui.button("🔄 Reload").clicked() {
                    info!("manual reload requested");
                    self.reload_all();
                }
                if let Some(message) = self.connection_error() {
                    let color = ui.visuals().error_fg_color;
                    ui.colored_label(color, format!("Load failing, showing last data ({message})"));
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let chart_height = (ui.available_height() * 0.55).max(240.0);
            ui.columns(2, |columns| {
                let size = egui::vec2(columns[0].available_width(), chart_height);
                columns[0].allocate_ui(size, |ui| self.dept_chart.ui(&viewer, ui));
                let size = egui::vec2(columns[1].available_width(), chart_height);
                columns[1].allocate_ui(size, |ui| self.emp_chart.ui(&viewer, ui));
            });
            ui.separator();
            ui.columns(3, |columns| {
                columns[0].push_id("dept_table", |ui| self.dept_table.ui(&viewer, ui));
                columns[1].push_id("emp_table", |ui| self.emp_table.ui(&viewer, ui));
                columns[2].push_id("query_table", |ui| self.query_table.ui(&viewer, ui));
            });
        });
    }
}

fn config_path() -> PathBuf {
    std::env::var_os("BITEMVIS_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("bitemvis.json"))
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = AppConfig::load(&config_path())?;
    info!(?config, "starting bitemporal visualizer");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([900.0, 620.0]),
        default_theme: eframe::Theme::Dark,
        persist_window: false,
        ..Default::default()
    };

    eframe::run_native(
        "Bitemporal Visualizer",
        options,
        Box::new(|cc| Box::new(BitemporalApp::new(cc, config))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run app: {}", e))?;

    Ok(())
}
