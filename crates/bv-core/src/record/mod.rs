//! Bitemporal records, intervals and containment matching.
//!
//! Every record carries its position in bitemporal space through four
//! wire fields: `valid_from`/`valid_to` (when the fact was true in the
//! modelled world) and `tran_from`/`tran_to` (when the database
//! believed it). All intervals are half-open `[from, to)`; an absent or
//! `null` upper bound means the interval is still open.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::time::parse_wire_date;

/// Logical dataset name, e.g. `"department"`.
pub type DatasetKey = String;

/// Wire field holding the valid-time lower bound.
pub const VALID_FROM: &str = "valid_from";
/// Wire field holding the valid-time upper bound.
pub const VALID_TO: &str = "valid_to";
/// Wire field holding the transaction-time lower bound.
pub const TRAN_FROM: &str = "tran_from";
/// Wire field holding the transaction-time upper bound.
pub const TRAN_TO: &str = "tran_to";

/// A point in bitemporal space: one valid date, one transaction date.
///
/// This is the payload of hover and point-query notifications. No
/// record identity crosses the bus; every subscriber re-derives its own
/// match from the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatePair {
    pub valid_date: NaiveDate,
    pub tran_date: NaiveDate,
}

impl DatePair {
    pub fn new(valid_date: NaiveDate, tran_date: NaiveDate) -> Self {
        Self {
            valid_date,
            tran_date,
        }
    }
}

impl fmt::Display for DatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "valid {} / recorded {}", self.valid_date, self.tran_date)
    }
}

/// Parse result of a single temporal wire field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// A concrete date.
    Date(NaiveDate),
    /// Absent or `null`: open-ended on this side.
    Open,
    /// Present but unparseable.
    Invalid,
}

/// Half-open date interval `[from, to)`; `to: None` is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub from: NaiveDate,
    pub to: Option<NaiveDate>,
}

impl Interval {
    /// Half-open containment; an open upper bound never excludes.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && self.to.map_or(true, |to| date < to)
    }
}

/// A record's parsed position in bitemporal space: valid time on one
/// axis, transaction time on the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitemporalExtent {
    pub valid: Interval,
    pub tran: Interval,
}

impl BitemporalExtent {
    pub fn contains(&self, pair: &DatePair) -> bool {
        self.valid.contains(pair.valid_date) && self.tran.contains(pair.tran_date)
    }
}

/// One bitemporal row: arbitrary business fields plus the four temporal
/// fields, kept in wire order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BitemporalRecord {
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl BitemporalRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Field names in wire order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    fn bound(&self, field: &str) -> Bound {
        match self.fields.get(field) {
            None | Some(Value::Null) => Bound::Open,
            Some(Value::String(text)) => parse_wire_date(text).map_or(Bound::Invalid, Bound::Date),
            Some(_) => Bound::Invalid,
        }
    }

    /// Lower bounds are required; an absent lower behaves like an
    /// unparseable one.
    fn lower(&self, field: &str) -> Option<NaiveDate> {
        match self.bound(field) {
            Bound::Date(date) => Some(date),
            Bound::Open | Bound::Invalid => None,
        }
    }

    /// The record's chart extent.
    ///
    /// `None` when any temporal field is unparseable or a bounded
    /// interval is reversed or empty. Such records are skipped by
    /// domain computation, rendering and hit-testing but stay in the
    /// dataset for the tables.
    pub fn extent(&self) -> Option<BitemporalExtent> {
        let valid = interval_of(self.lower(VALID_FROM)?, self.bound(VALID_TO))?;
        let tran = interval_of(self.lower(TRAN_FROM)?, self.bound(TRAN_TO))?;
        Some(BitemporalExtent { valid, tran })
    }

    /// Containment under the table matcher's policy: an unparseable
    /// upper bound counts as unbounded, an unparseable lower bound
    /// never matches.
    pub fn contains_pair(&self, pair: &DatePair) -> bool {
        axis_contains(self.lower(VALID_FROM), self.bound(VALID_TO), pair.valid_date)
            && axis_contains(self.lower(TRAN_FROM), self.bound(TRAN_TO), pair.tran_date)
    }
}

fn interval_of(from: NaiveDate, to: Bound) -> Option<Interval> {
    match to {
        Bound::Date(to) if to > from => Some(Interval { from, to: Some(to) }),
        // Reversed or empty: no drawable area.
        Bound::Date(_) => None,
        Bound::Open => Some(Interval { from, to: None }),
        Bound::Invalid => None,
    }
}

fn axis_contains(from: Option<NaiveDate>, to: Bound, date: NaiveDate) -> bool {
    let Some(from) = from else {
        return false;
    };
    if date < from {
        return false;
    }
    match to {
        Bound::Date(to) => date < to,
        // Absent and unparseable uppers both mean "still in effect".
        Bound::Open | Bound::Invalid => true,
    }
}

/// An immutable snapshot of one dataset.
///
/// Replaced wholesale on every load, never patched; clones share the
/// underlying records.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Arc<Vec<BitemporalRecord>>,
}

impl Dataset {
    pub fn new(records: Vec<BitemporalRecord>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }

    pub fn records(&self) -> &[BitemporalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&BitemporalRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BitemporalRecord> {
        self.records.iter()
    }

    /// First record (in dataset order) whose valid and transaction
    /// intervals both contain `pair`.
    ///
    /// Temporally consistent data yields at most one match; first-in-
    /// order is the deterministic tie-break when it does not.
    pub fn record_effective_at(&self, pair: &DatePair) -> Option<(usize, &BitemporalRecord)> {
        self.records
            .iter()
            .enumerate()
            .find(|(_, record)| record.contains_pair(pair))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(value: Value) -> BitemporalRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_interval_contains_half_open() {
        let interval = Interval {
            from: date(2020, 1, 1),
            to: Some(date(2021, 1, 1)),
        };
        assert!(interval.contains(date(2020, 1, 1)));
        assert!(interval.contains(date(2020, 12, 31)));
        assert!(!interval.contains(date(2021, 1, 1)));
        assert!(!interval.contains(date(2019, 12, 31)));
    }

    #[test]
    fn test_interval_open_end_never_excludes() {
        let interval = Interval {
            from: date(2020, 1, 1),
            to: None,
        };
        assert!(interval.contains(date(2020, 1, 1)));
        assert!(interval.contains(date(2999, 1, 1)));
        assert!(!interval.contains(date(2019, 12, 31)));
    }

    #[test]
    fn test_record_preserves_wire_field_order() {
        let rec = record(json!({
            "dept_id": 10,
            "dept_name": "Engineering",
            "valid_from": "2020-01-01",
            "valid_to": "2021-01-01",
            "tran_from": "2020-06-01",
            "tran_to": null,
        }));
        let names: Vec<&str> = rec.field_names().collect();
        assert_eq!(
            names,
            vec![
                "dept_id",
                "dept_name",
                "valid_from",
                "valid_to",
                "tran_from",
                "tran_to"
            ]
        );
    }

    #[test]
    fn test_extent_with_open_transaction_end() {
        let rec = record(json!({
            "valid_from": "2020-01-01",
            "valid_to": "2021-01-01",
            "tran_from": "2020-06-01",
        }));
        let extent = rec.extent().unwrap();
        assert_eq!(extent.valid.from, date(2020, 1, 1));
        assert_eq!(extent.valid.to, Some(date(2021, 1, 1)));
        assert_eq!(extent.tran.from, date(2020, 6, 1));
        assert_eq!(extent.tran.to, None);
    }

    #[test]
    fn test_extent_rejects_unparseable_and_reversed() {
        let bad_lower = record(json!({
            "valid_from": "garbage",
            "valid_to": "2021-01-01",
            "tran_from": "2020-06-01",
        }));
        assert!(bad_lower.extent().is_none());

        let reversed = record(json!({
            "valid_from": "2021-01-01",
            "valid_to": "2020-01-01",
            "tran_from": "2020-06-01",
        }));
        assert!(reversed.extent().is_none());

        let empty = record(json!({
            "valid_from": "2020-01-01",
            "valid_to": "2020-01-01",
            "tran_from": "2020-06-01",
        }));
        assert!(empty.extent().is_none());
    }

    #[test]
    fn test_contains_pair_open_transaction_end() {
        // Valid through 2020, recorded open-ended from mid-2020.
        let rec = record(json!({
            "valid_from": "2020-01-01",
            "valid_to": "2021-01-01",
            "tran_from": "2020-06-01",
        }));
        assert!(rec.contains_pair(&DatePair::new(date(2020, 6, 15), date(2023, 1, 1))));
        assert!(!rec.contains_pair(&DatePair::new(date(2021, 6, 1), date(2023, 1, 1))));
        assert!(!rec.contains_pair(&DatePair::new(date(2020, 6, 15), date(2020, 5, 31))));
    }

    #[test]
    fn test_contains_pair_unparseable_upper_is_unbounded() {
        let rec = record(json!({
            "valid_from": "2020-01-01",
            "valid_to": "not a date",
            "tran_from": "2020-06-01",
            "tran_to": null,
        }));
        // No chart extent, but the matcher treats the bad upper as open.
        assert!(rec.extent().is_none());
        assert!(rec.contains_pair(&DatePair::new(date(2030, 1, 1), date(2021, 1, 1))));
    }

    #[test]
    fn test_contains_pair_unparseable_lower_never_matches() {
        let rec = record(json!({
            "valid_from": "garbage",
            "valid_to": "2099-01-01",
            "tran_from": "2020-01-01",
        }));
        assert!(!rec.contains_pair(&DatePair::new(date(2021, 1, 1), date(2021, 1, 1))));
    }

    #[test]
    fn test_record_effective_at_first_match_wins() {
        let overlapping = Dataset::new(vec![
            record(json!({
                "id": 1,
                "valid_from": "2020-01-01",
                "tran_from": "2020-01-01",
            })),
            record(json!({
                "id": 2,
                "valid_from": "2020-01-01",
                "tran_from": "2020-01-01",
            })),
        ]);
        let pair = DatePair::new(date(2021, 1, 1), date(2021, 1, 1));
        let (index, rec) = overlapping.record_effective_at(&pair).unwrap();
        assert_eq!(index, 0);
        assert_eq!(rec.get("id"), Some(&json!(1)));
    }

    #[test]
    fn test_record_effective_at_none_when_outside() {
        let dataset = Dataset::new(vec![record(json!({
            "valid_from": "2020-01-01",
            "valid_to": "2021-01-01",
            "tran_from": "2020-01-01",
            "tran_to": "2021-01-01",
        }))]);
        let pair = DatePair::new(date(2022, 1, 1), date(2022, 1, 1));
        assert!(dataset.record_effective_at(&pair).is_none());
    }

    #[test]
    fn test_dataset_clone_shares_records() {
        let dataset = Dataset::new(vec![record(json!({"valid_from": "2020-01-01"}))]);
        let clone = dataset.clone();
        assert_eq!(dataset.len(), clone.len());
        assert!(Arc::ptr_eq(&dataset.records, &clone.records));
    }
}
