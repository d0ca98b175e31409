use crate::constants::{COMPANY_NAME, COMPANY_NAME_NORMALIZED};
use crate::domain::{Dataset, Record, Value};
use crate::error::{PipelineError, Result};

use super::clustering::CanonicalMap;

/// The company name of a record as a string, failing on a missing value
pub fn company_name_of(record: &Record, row: usize) -> Result<String> {
    match record.get(COMPANY_NAME) {
        Value::Missing => Err(PipelineError::SchemaAssumption(format!(
            "'{}' is missing at row {}",
            COMPANY_NAME, row
        ))),
        Value::Text(name) => Ok(name.clone()),
        other => Ok(other.render()),
    }
}

/// Every company name in the dataset, in row order
pub fn company_names(dataset: &Dataset) -> Result<Vec<String>> {
    if !dataset.has_column(COMPANY_NAME) {
        return Err(PipelineError::SchemaAssumption(format!(
            "dataset has no '{}' column",
            COMPANY_NAME
        )));
    }

    dataset
        .records()
        .iter()
        .enumerate()
        .map(|(row, record)| company_name_of(record, row))
        .collect()
}

/// Write each record's canonical company name into `company_name_normalized`.
///
/// Fails with [`PipelineError::MappingIncomplete`] if a name has no canonical
/// entry; the field is never left missing.
pub fn rewrite_company_names(dataset: &mut Dataset, map: &CanonicalMap) -> Result<()> {
    let names = company_names(dataset)?;

    let mut canonical_names = Vec::with_capacity(names.len());
    for name in names {
        let canonical = map
            .resolve(&name)
            .ok_or_else(|| PipelineError::MappingIncomplete { name: name.clone() })?;
        canonical_names.push(canonical.to_string());
    }

    dataset.ensure_column(COMPANY_NAME_NORMALIZED);
    for (record, canonical) in dataset.records_mut().iter_mut().zip(canonical_names) {
        record.set(COMPANY_NAME_NORMALIZED, Value::Text(canonical));
    }

    Ok(())
}
