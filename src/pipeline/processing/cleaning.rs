use std::collections::HashSet;
use tracing::info;

use crate::constants::{
    self, COMPANY_NAME, DEAL_STAGE, EMAIL, EMPLOYEE_COUNT, INDUSTRY, OTHER, OWNER, REVENUE,
    UNASSIGNED, UNKNOWN_ENTITY, UNQUALIFIED,
};
use crate::domain::{Dataset, Value};

/// Drop records identical on every column, keeping the first occurrence.
/// Returns the number of records removed.
pub fn remove_exact_duplicates(dataset: &mut Dataset) -> usize {
    let columns = dataset.columns().to_vec();
    let before = dataset.len();
    let mut seen: HashSet<Vec<String>> = HashSet::new();

    dataset.retain(|record| {
        let signature: Vec<String> = columns.iter().map(|c| record.get(c).signature()).collect();
        seen.insert(signature)
    });

    let removed = before - dataset.len();
    if removed > 0 {
        info!("Removed {} exact duplicate rows", removed);
    }
    removed
}

/// Fill missing values with their defaults.
///
/// `company_name` is only filled; an absent column is left for entity
/// resolution to reject.
pub fn handle_missing_values(dataset: &mut Dataset) {
    info!("Handling missing values");

    if dataset.has_column(COMPANY_NAME) {
        fill_missing(dataset, COMPANY_NAME, Value::text(UNKNOWN_ENTITY));
    }

    let defaults = [
        (REVENUE, Value::Integer(0)),
        (EMPLOYEE_COUNT, Value::Integer(0)),
        (INDUSTRY, Value::text(OTHER)),
        (DEAL_STAGE, Value::text(UNQUALIFIED)),
        (OWNER, Value::text(UNASSIGNED)),
    ];
    for (column, default) in defaults {
        if dataset.has_column(column) {
            fill_missing(dataset, column, default);
        } else {
            dataset.add_column(column, default);
        }
    }
}

fn fill_missing(dataset: &mut Dataset, column: &str, default: Value) {
    for record in dataset.records_mut() {
        if record.get(column).is_missing() {
            record.set(column, default.clone());
        }
    }
}

/// Trim and title-case the free-text columns, normalize emails
pub fn normalize_text_fields(dataset: &mut Dataset) {
    info!("Normalizing text fields");

    let present: Vec<&str> = constants::text_columns()
        .into_iter()
        .filter(|c| dataset.has_column(c))
        .collect();
    let has_email = dataset.has_column(EMAIL);

    for record in dataset.records_mut() {
        for column in &present {
            let value = record.get(column);
            if value.is_missing() {
                continue;
            }
            let titled = title_case(value.render().trim());
            record.set(*column, Value::Text(titled));
        }

        if has_email {
            let email = record.get(EMAIL);
            if email.is_present() {
                let normalized = email.render().trim().to_lowercase();
                let value = if normalized.is_empty() {
                    Value::Missing
                } else {
                    Value::Text(normalized)
                };
                record.set(EMAIL, value);
            }
        }
    }
}

/// Uppercase the first letter of every run of letters, lowercase the rest
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_word = false;
    for c in input.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Run the cleaning sequence in order
pub fn clean(dataset: &mut Dataset) -> usize {
    let removed = remove_exact_duplicates(dataset);
    handle_missing_values(dataset);
    normalize_text_fields(dataset);
    removed
}
