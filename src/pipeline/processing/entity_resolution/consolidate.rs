//! Duplicate consolidation: one surviving record per (canonical company, email).
//!
//! Records are ordered by canonical name ascending and close date descending,
//! missing dates last. The first record of each key in that order survives.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::constants::{CLOSE_DATE, COMPANY_NAME, COMPANY_NAME_NORMALIZED, EMAIL, ORIGINAL_COMPANY_NAME};
use crate::domain::{Dataset, Record, Value};
use crate::error::{PipelineError, Result};

use super::rewrite::company_name_of;

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y", "%b %d, %Y", "%B %d, %Y"];

/// How records without an email take part in the dedup key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingEmailPolicy {
    /// All missing-email records of one canonical company form a single group
    #[default]
    GroupTogether,
    /// A missing email never matches another record
    KeepSeparate,
}

/// A close date that could not be parsed and was treated as missing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateParseWarning {
    pub row: usize,
    pub raw: String,
}

/// What consolidation did to the dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsolidationSummary {
    pub records_in: usize,
    pub records_out: usize,
    pub date_warnings: Vec<DateParseWarning>,
}

impl ConsolidationSummary {
    pub fn records_removed(&self) -> usize {
        self.records_in - self.records_out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EmailKey {
    Address(String),
    Missing,
    /// Unique per row, for `KeepSeparate`
    Unmatched(usize),
}

/// Parse a close date; `None` for missing, blank or unparsable values
pub fn parse_close_date(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Date(date) => Some(*date),
        Value::Text(raw) => parse_date_text(raw.trim()),
        _ => None,
    }
}

fn parse_date_text(raw: &str) -> Option<NaiveDateTime> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// Most recent first; missing dates sort after every present date
fn recency_order(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Reduces rewritten records to one survivor per (canonical company, email)
#[derive(Debug, Clone, Default)]
pub struct DuplicateConsolidator {
    missing_email: MissingEmailPolicy,
}

impl DuplicateConsolidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_missing_email_policy(mut self, policy: MissingEmailPolicy) -> Self {
        self.missing_email = policy;
        self
    }

    pub fn missing_email_policy(&self) -> MissingEmailPolicy {
        self.missing_email
    }

    fn email_key(&self, record: &Record, row: usize) -> EmailKey {
        match record.get(EMAIL) {
            Value::Missing => match self.missing_email {
                MissingEmailPolicy::GroupTogether => EmailKey::Missing,
                MissingEmailPolicy::KeepSeparate => EmailKey::Unmatched(row),
            },
            value => EmailKey::Address(value.render()),
        }
    }

    /// Consolidate the dataset. Without a `company_name_normalized` column the
    /// current `company_name` is taken as already canonical.
    pub fn consolidate(&self, dataset: Dataset) -> Result<(Dataset, ConsolidationSummary)> {
        let records_in = dataset.len();
        let key_field = if dataset.has_column(COMPANY_NAME_NORMALIZED) {
            COMPANY_NAME_NORMALIZED
        } else if dataset.has_column(COMPANY_NAME) {
            COMPANY_NAME
        } else {
            return Err(PipelineError::SchemaAssumption(format!(
                "dataset has neither '{}' nor '{}'",
                COMPANY_NAME_NORMALIZED, COMPANY_NAME
            )));
        };
        let has_close_date = dataset.has_column(CLOSE_DATE);
        let had_original = dataset.has_column(ORIGINAL_COMPANY_NAME);
        // Only an already consolidated dataset keeps the names it recorded
        let keep_original = had_original && key_field == COMPANY_NAME;

        let (mut columns, records) = dataset.into_parts();

        let mut date_warnings = Vec::new();
        let mut keyed: Vec<(String, Option<NaiveDateTime>, Record)> = Vec::with_capacity(records.len());
        for (row, mut record) in records.into_iter().enumerate() {
            let name = if key_field == COMPANY_NAME {
                company_name_of(&record, row)?
            } else {
                match record.get(key_field) {
                    Value::Missing => {
                        return Err(PipelineError::MappingIncomplete {
                            name: company_name_of(&record, row)?,
                        })
                    }
                    value => value.render(),
                }
            };

            let close_date = if has_close_date {
                let raw = record.get(CLOSE_DATE);
                let parsed = parse_close_date(raw);
                if parsed.is_none() && raw.is_present() && !raw.render().trim().is_empty() {
                    warn!("Unparsable close_date '{}' at row {}; treating as missing", raw.render(), row);
                    date_warnings.push(DateParseWarning { row, raw: raw.render() });
                }
                record.set(CLOSE_DATE, Value::from(parsed.map(Value::Date)));
                parsed
            } else {
                None
            };

            keyed.push((name, close_date, record));
        }

        if has_close_date {
            // Stable: equal keys keep their current relative order
            keyed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| recency_order(a.1, b.1)));
        }

        let mut seen: HashSet<(String, EmailKey)> = HashSet::new();
        let mut survivors = Vec::new();
        for (row, (name, _, mut record)) in keyed.into_iter().enumerate() {
            let email = self.email_key(&record, row);
            if !seen.insert((name.clone(), email)) {
                debug!("Dropping duplicate record for '{}'", name);
                continue;
            }

            if !keep_original {
                let original = record.get(COMPANY_NAME).clone();
                record.set(ORIGINAL_COMPANY_NAME, original);
            }
            record.set(COMPANY_NAME, Value::Text(name));
            record.remove(COMPANY_NAME_NORMALIZED);
            survivors.push(record);
        }

        columns.retain(|c| c != COMPANY_NAME_NORMALIZED);
        if !had_original {
            columns.push(ORIGINAL_COMPANY_NAME.to_string());
        }
        if !columns.iter().any(|c| c == COMPANY_NAME) {
            columns.insert(0, COMPANY_NAME.to_string());
        }

        let summary = ConsolidationSummary {
            records_in,
            records_out: survivors.len(),
            date_warnings,
        };
        Ok((Dataset::from_records(columns, survivors), summary))
    }
}
