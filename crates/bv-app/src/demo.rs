//! Built-in sample data: two small bitemporal entity histories.
//!
//! The department history carries a retroactive budget correction and
//! the employee history a retroactive salary fix, so both charts show
//! superseded record versions stacked below their replacements.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::sleep;

use bv_core::record::BitemporalRecord;
use bv_data::fetch::{FetchError, FetchParams, RecordFetcher};

use crate::config::AppConfig;

pub const DEPARTMENT_KEY: &str = "department";
pub const EMPLOYEE_KEY: &str = "employee";
pub const POINT_QUERY_KEY: &str = "point-query";

/// Fixture collaborator standing in for the records API.
pub struct DemoFetcher {
    latency: Duration,
    dept_id: u32,
    emp_id: u32,
}

impl DemoFetcher {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            latency: Duration::from_millis(config.fetch_latency_ms),
            dept_id: config.dept_id,
            emp_id: config.emp_id,
        }
    }

    fn department_history(&self, dept_id: u32) -> Vec<BitemporalRecord> {
        vec![
            // Original budget, later corrected retroactively.
            record(json!({
                "dept_id": dept_id,
                "dept_name": "Engineering",
                "budget": 900_000,
                "valid_from": "2020-01-01",
                "valid_to": "2022-01-01",
                "tran_from": "2020-01-10",
                "tran_to": "2021-03-15",
            })),
            record(json!({
                "dept_id": dept_id,
                "dept_name": "Engineering",
                "budget": 950_000,
                "valid_from": "2020-01-01",
                "valid_to": "2022-01-01",
                "tran_from": "2021-03-15",
                "tran_to": null,
            })),
            record(json!({
                "dept_id": dept_id,
                "dept_name": "Engineering",
                "budget": 1_200_000,
                "valid_from": "2022-01-01",
                "valid_to": null,
                "tran_from": "2021-11-20",
                "tran_to": null,
            })),
        ]
    }

    fn employee_history(&self, emp_id: u32) -> Vec<BitemporalRecord> {
        vec![
            record(json!({
                "emp_id": emp_id,
                "name": "Dana Whitfield",
                "title": "Engineer II",
                "salary": 68_000,
                "valid_from": "2020-03-01",
                "valid_to": "2021-03-01",
                "tran_from": "2020-03-01",
                "tran_to": null,
            })),
            // Raise recorded early, then corrected upward in June.
            record(json!({
                "emp_id": emp_id,
                "name": "Dana Whitfield",
                "title": "Engineer II",
                "salary": 72_000,
                "valid_from": "2021-03-01",
                "valid_to": "2022-03-01",
                "tran_from": "2021-02-20",
                "tran_to": "2021-06-10",
            })),
            record(json!({
                "emp_id": emp_id,
                "name": "Dana Whitfield",
                "title": "Engineer II",
                "salary": 74_000,
                "valid_from": "2021-03-01",
                "valid_to": "2022-03-01",
                "tran_from": "2021-06-10",
                "tran_to": null,
            })),
            record(json!({
                "emp_id": emp_id,
                "name": "Dana Whitfield",
                "title": "Senior Engineer",
                "salary": 80_000,
                "valid_from": "2022-03-01",
                "valid_to": null,
                "tran_from": "2022-02-25",
                "tran_to": null,
            })),
        ]
    }
}

#[async_trait]
impl RecordFetcher for DemoFetcher {
    async fn fetch(
        &self,
        key: &str,
        params: &FetchParams,
    ) -> Result<Vec<BitemporalRecord>, FetchError> {
        sleep(self.latency).await;
        match key {
            DEPARTMENT_KEY => Ok(self.department_history(filter_id(params, "deptId", self.dept_id))),
            EMPLOYEE_KEY => Ok(self.employee_history(filter_id(params, "empId", self.emp_id))),
            POINT_QUERY_KEY => {
                let Some(pair) = params.as_of else {
                    return Err(FetchError::Payload(
                        "point query needs an as-of date pair".to_string(),
                    ));
                };
                let mut rows = self.department_history(self.dept_id);
                rows.extend(self.employee_history(self.emp_id));
                Ok(rows
                    .into_iter()
                    .filter(|record| record.contains_pair(&pair))
                    .collect())
            }
            _ => Err(FetchError::Status(404)),
        }
    }

    fn source_name(&self) -> &str {
        "demo"
    }
}

fn record(value: serde_json::Value) -> BitemporalRecord {
    serde_json::from_value(value).unwrap_or_default()
}

fn filter_id(params: &FetchParams, name: &str, default: u32) -> u32 {
    params
        .filters
        .iter()
        .find(|(key, _)| key == name)
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(default)
}
