//! Pipeline ingestion: load raw CRM exports and normalize their schema.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

use crate::constants::{COMPANY_NAME, CONTACT_NAME, EMPLOYEE_COUNT, ID, REVENUE};
use crate::domain::{Dataset, Record, Value};
use crate::error::{PipelineError, Result};

/// Cell contents read as missing
const NA_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A", "n/a", "<NA>"];

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid column-name regex"));

/// Common alternative spellings of the core columns
static COLUMN_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("company", COMPANY_NAME),
        ("organization", COMPANY_NAME),
        ("contact", CONTACT_NAME),
        ("person", CONTACT_NAME),
        ("zip", "zip_code"),
        ("postal_code", "zip_code"),
        ("employees", EMPLOYEE_COUNT),
        ("annual_revenue", REVENUE),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Text,
}

/// Load a CSV or JSON file into a dataset
pub fn load_data(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(PipelineError::FileNotFound(path.display().to_string()));
    }

    info!("Loading data from {}", path.display());
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let dataset = match extension.as_deref() {
        Some("csv") => read_csv(BufReader::new(File::open(path)?))?,
        Some("json") => read_json(BufReader::new(File::open(path)?))?,
        _ => return Err(PipelineError::UnsupportedFormat(path.display().to_string())),
    };

    info!(
        "Loaded {} rows and {} columns",
        dataset.len(),
        dataset.columns().len()
    );
    Ok(dataset)
}

fn is_na(cell: &str) -> bool {
    NA_TOKENS.contains(&cell)
}

fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut kind = ColumnKind::Integer;
    for cell in cells.filter(|c| !is_na(c)) {
        if kind == ColumnKind::Integer && cell.trim().parse::<i64>().is_ok() {
            continue;
        }
        if cell.trim().parse::<f64>().is_ok() {
            kind = ColumnKind::Float;
        } else {
            return ColumnKind::Text;
        }
    }
    kind
}

fn parse_cell(cell: &str, kind: ColumnKind) -> Value {
    if is_na(cell) {
        return Value::Missing;
    }
    match kind {
        ColumnKind::Integer => cell.trim().parse().map(Value::Integer).unwrap_or_else(|_| Value::text(cell)),
        ColumnKind::Float => cell.trim().parse().map(Value::Float).unwrap_or_else(|_| Value::text(cell)),
        ColumnKind::Text => Value::text(cell),
    }
}

/// Read CSV with a header row, inferring a type per column
pub fn read_csv<R: Read>(reader: R) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let rows: Vec<csv::StringRecord> = reader.records().collect::<std::result::Result<_, _>>()?;

    let kinds: Vec<ColumnKind> = (0..headers.len())
        .map(|i| infer_kind(rows.iter().map(|row| row.get(i).unwrap_or(""))))
        .collect();

    let records = rows
        .iter()
        .map(|row| {
            Record::from_pairs(
                headers
                    .iter()
                    .zip(&kinds)
                    .enumerate()
                    .map(|(i, (header, kind))| (header.clone(), parse_cell(row.get(i).unwrap_or(""), *kind))),
            )
        })
        .collect();

    Ok(Dataset::from_records(headers, records))
}

fn json_to_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Missing,
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Missing),
        },
        serde_json::Value::String(s) => Value::text(s.as_str()),
        serde_json::Value::Bool(b) => Value::text(if *b { "True" } else { "False" }),
        other => Value::text(other.to_string()),
    }
}

/// Read JSON in records orient (array of objects) or columns orient
/// (object of column name to an index-keyed object or an array)
pub fn read_json<R: Read>(reader: R) -> Result<Dataset> {
    let document: serde_json::Value = serde_json::from_reader(reader)?;

    match document {
        serde_json::Value::Array(rows) => {
            let mut columns: Vec<String> = Vec::new();
            let mut known: HashSet<String> = HashSet::new();
            let mut records = Vec::with_capacity(rows.len());

            for (index, row) in rows.iter().enumerate() {
                let object = row.as_object().ok_or_else(|| {
                    PipelineError::InvalidInput(format!("JSON row {} is not an object", index))
                })?;
                for key in object.keys() {
                    if known.insert(key.clone()) {
                        columns.push(key.clone());
                    }
                }
                records.push(Record::from_pairs(
                    object.iter().map(|(k, v)| (k.clone(), json_to_value(v))),
                ));
            }

            Ok(Dataset::from_records(columns, records))
        }
        serde_json::Value::Object(table) => {
            let columns: Vec<String> = table.keys().cloned().collect();
            let mut index: Vec<String> = Vec::new();
            let mut seen_rows: HashSet<String> = HashSet::new();
            let mut cells: HashMap<(String, String), Value> = HashMap::new();

            for (column, values) in &table {
                let entries: Vec<(String, &serde_json::Value)> = match values {
                    serde_json::Value::Object(by_index) => {
                        by_index.iter().map(|(k, v)| (k.clone(), v)).collect()
                    }
                    serde_json::Value::Array(list) => {
                        list.iter().enumerate().map(|(i, v)| (i.to_string(), v)).collect()
                    }
                    _ => {
                        return Err(PipelineError::InvalidInput(format!(
                            "JSON column '{}' is neither an object nor an array",
                            column
                        )))
                    }
                };
                for (row_key, value) in entries {
                    if seen_rows.insert(row_key.clone()) {
                        index.push(row_key.clone());
                    }
                    cells.insert((row_key, column.clone()), json_to_value(value));
                }
            }

            let records = index
                .iter()
                .map(|row_key| {
                    Record::from_pairs(columns.iter().map(|column| {
                        let value = cells
                            .remove(&(row_key.clone(), column.clone()))
                            .unwrap_or(Value::Missing);
                        (column.clone(), value)
                    }))
                })
                .collect();

            Ok(Dataset::from_records(columns, records))
        }
        _ => Err(PipelineError::InvalidInput(
            "JSON input must be an array of records or an object of columns".to_string(),
        )),
    }
}

/// Lowercase, trim, strip punctuation and snake_case a raw column name
pub fn clean_column_name(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    NON_WORD.replace_all(lowered.trim(), "").replace(' ', "_")
}

/// Standardize column names and make sure an `id` column exists
pub fn normalize_schema(dataset: Dataset) -> Dataset {
    info!("Normalizing schema");
    let (old_columns, old_records) = dataset.into_parts();

    let cleaned: Vec<String> = old_columns.iter().map(|c| clean_column_name(c)).collect();

    let mut renamed: Vec<String> = Vec::with_capacity(cleaned.len());
    for name in &cleaned {
        let target = COLUMN_ALIASES.get(name.as_str()).copied();
        let final_name = match target {
            Some(target) if cleaned.iter().any(|c| c == target) || renamed.iter().any(|c| c == target) => {
                warn!(
                    "Column '{}' not renamed to '{}': a column with that name already exists",
                    name, target
                );
                name.clone()
            }
            Some(target) => target.to_string(),
            None => name.clone(),
        };

        let mut unique = final_name.clone();
        let mut suffix = 1;
        while renamed.contains(&unique) {
            unique = format!("{}_{}", final_name, suffix);
            suffix += 1;
        }
        if unique != final_name {
            warn!("Duplicate column '{}' renamed to '{}'", final_name, unique);
        }
        renamed.push(unique);
    }

    let records = old_records
        .iter()
        .map(|record| {
            Record::from_pairs(
                old_columns
                    .iter()
                    .zip(&renamed)
                    .map(|(old, new)| (new.clone(), record.get(old).clone())),
            )
        })
        .collect();

    let mut dataset = Dataset::from_records(renamed, records);

    if !dataset.has_column(ID) {
        dataset.ensure_column(ID);
        for (i, record) in dataset.records_mut().iter_mut().enumerate() {
            record.set(ID, Value::Integer(i as i64 + 1));
        }
    }

    dataset
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_csv_infers_types() {
        let csv = "Company,Revenue,Employees,Zip\nAcme,1000,10,02139\nBeta,,2.5,N/A\nGamma,300,7,10001\n";
        let data = read_csv(csv.as_bytes()).unwrap();

        assert_eq!(data.columns(), &["Company", "Revenue", "Employees", "Zip"]);
        let beta = &data.records()[1];
        assert!(beta.get("Revenue").is_missing());
        assert_eq!(beta.get("Employees"), &Value::Float(2.5));
        assert!(beta.get("Zip").is_missing());
        assert_eq!(data.records()[0].get("Revenue"), &Value::Integer(1000));
        assert_eq!(data.records()[0].get("Employees"), &Value::Float(10.0));
        assert_eq!(data.records()[2].get("Zip"), &Value::Integer(10001));
    }

    #[test]
    fn test_read_csv_short_rows_read_as_missing() {
        let csv = "Company,Email,Phone\nAcme,a@acme.com,555\nBeta,b@beta.com\n";
        let data = read_csv(csv.as_bytes()).unwrap();

        assert_eq!(data.len(), 2);
        let beta = &data.records()[1];
        assert_eq!(beta.text("Email"), Some("b@beta.com"));
        assert!(beta.get("Phone").is_missing());
        assert_eq!(data.records()[0].get("Phone"), &Value::Integer(555));
    }

    #[test]
    fn test_read_json_records_and_columns() {
        let records = r#"[{"company": "Acme", "revenue": 10}, {"company": null, "revenue": 2.5, "email": "a@b.com"}]"#;
        let data = read_json(records.as_bytes()).unwrap();
        assert_eq!(data.columns(), &["company", "revenue", "email"]);
        assert!(data.records()[1].get("company").is_missing());
        assert_eq!(data.records()[0].get("revenue"), &Value::Integer(10));
        assert!(data.records()[0].get("email").is_missing());

        let columns = r#"{"company": {"0": "Acme", "1": "Beta"}, "revenue": [1, null], "email": {"2": "c@d.com"}}"#;
        let data = read_json(columns.as_bytes()).unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data.records()[2].text("email"), Some("c@d.com"));
        assert!(data.records()[2].get("company").is_missing());
        assert_eq!(data.records()[1].text("company"), Some("Beta"));
        assert!(data.records()[1].get("revenue").is_missing());
    }

    #[test]
    fn test_read_json_rejects_scalars() {
        assert!(matches!(read_json("42".as_bytes()), Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn test_load_data_errors() {
        assert!(matches!(
            load_data("/definitely/not/here.csv"),
            Err(PipelineError::FileNotFound(_))
        ));

        let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        writeln!(file, "binary").unwrap();
        assert!(matches!(
            load_data(file.path()),
            Err(PipelineError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_clean_column_name() {
        assert_eq!(clean_column_name("  Company Name "), "company_name");
        assert_eq!(clean_column_name("E-mail"), "email");
        assert_eq!(clean_column_name("Annual Revenue ($)"), "annual_revenue_");
        assert_eq!(clean_column_name("Close Date"), "close_date");
    }

    #[test]
    fn test_normalize_schema_renames_and_adds_id() {
        let data = read_csv("Organization,Person,Annual_Revenue,Employees\nAcme,Ann,5,3\n".as_bytes()).unwrap();
        let data = normalize_schema(data);

        assert_eq!(
            data.columns(),
            &[COMPANY_NAME, CONTACT_NAME, REVENUE, EMPLOYEE_COUNT, ID]
        );
        let record = &data.records()[0];
        assert_eq!(record.text(COMPANY_NAME), Some("Acme"));
        assert_eq!(record.get(ID), &Value::Integer(1));
    }

    #[test]
    fn test_rename_collision_keeps_cleaned_name() {
        let data = read_csv("company_name,company\nAcme,Acme Holdings\n".as_bytes()).unwrap();
        let data = normalize_schema(data);

        assert_eq!(data.columns(), &[COMPANY_NAME, "company", ID]);
        assert_eq!(data.records()[0].text("company"), Some("Acme Holdings"));
    }

    #[test]
    fn test_existing_id_is_kept() {
        let data = read_csv("ID,Company\n7,Acme\n".as_bytes()).unwrap();
        let data = normalize_schema(data);
        assert_eq!(data.columns(), &[ID, COMPANY_NAME]);
        assert_eq!(data.records()[0].get(ID), &Value::Integer(7));
    }
}
