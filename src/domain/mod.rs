use chrono::{NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::collections::HashMap;

/// A single scalar cell of a CRM record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Missing,
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDateTime),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn is_present(&self) -> bool {
        !self.is_missing()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the value; text is never coerced
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }

    /// Render the value the way it is written to CSV; missing renders empty
    pub fn render(&self) -> String {
        match self {
            Value::Missing => String::new(),
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 {
                    format!("{:.1}", f)
                } else {
                    f.to_string()
                }
            }
            Value::Date(d) => {
                if d.time() == NaiveTime::MIN {
                    d.format("%Y-%m-%d").to_string()
                } else {
                    d.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
        }
    }

    /// Type-tagged rendering used for exact-duplicate detection
    pub fn signature(&self) -> String {
        match self {
            Value::Missing => "m:".to_string(),
            Value::Text(s) => format!("t:{}", s),
            Value::Integer(i) => format!("i:{}", i),
            Value::Float(f) => format!("f:{}", f),
            Value::Date(d) => format!("d:{}", d),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Missing)
    }
}

static MISSING: Value = Value::Missing;

/// One CRM row: field name to value. Absent fields read as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(field, value)` pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&MISSING)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).as_str()
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).as_f64()
    }

    pub fn is_present(&self, field: &str) -> bool {
        self.get(field).is_present()
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Value {
        self.fields.remove(field).unwrap_or(Value::Missing)
    }
}

/// An ordered sequence of records sharing one ordered column list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            records: Vec::new(),
        }
    }

    pub fn from_records<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        records: Vec<Record>,
    ) -> Self {
        let mut dataset = Self::new(columns);
        dataset.records = records;
        dataset
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Record>) {
        (self.columns, self.records)
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Append a column filled with `default`; no-op if it already exists
    pub fn add_column(&mut self, name: &str, default: Value) {
        if self.has_column(name) {
            return;
        }
        self.columns.push(name.to_string());
        for record in &mut self.records {
            record.set(name, default.clone());
        }
    }

    /// Make sure a column is part of the schema without touching any values
    pub fn ensure_column(&mut self, name: &str) {
        if !self.has_column(name) {
            self.columns.push(name.to_string());
        }
    }

    pub fn retain<F: FnMut(&Record) -> bool>(&mut self, f: F) {
        self.records.retain(f);
    }

    /// Count of missing cells across all schema columns
    pub fn missing_values_total(&self) -> usize {
        self.records
            .iter()
            .map(|record| {
                self.columns
                    .iter()
                    .filter(|column| record.get(column).is_missing())
                    .count()
            })
            .sum()
    }

    /// Sum of the numeric values of a column, skipping missing cells
    pub fn sum_numeric(&self, column: &str) -> f64 {
        self.records
            .iter()
            .filter_map(|record| record.number(column))
            .sum()
    }

    /// Render one record as a JSON object in column order
    pub fn record_to_json(&self, record: &Record) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        for column in &self.columns {
            let value = serde_json::to_value(record.get(column)).unwrap_or(serde_json::Value::Null);
            object.insert(column.clone(), value);
        }
        serde_json::Value::Object(object)
    }

    /// First `n` records as JSON objects, for previews
    pub fn preview(&self, n: usize) -> Vec<serde_json::Value> {
        self.records
            .iter()
            .take(n)
            .map(|record| self.record_to_json(record))
            .collect()
    }
}
