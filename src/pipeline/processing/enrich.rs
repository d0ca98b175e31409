use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::info;

use crate::constants::{COMPANY_NAME, INDUSTRY, OTHER, REGION, STATE};
use crate::domain::{Dataset, Value};

static STATE_ABBREVIATIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("New York", "NY"),
        ("California", "CA"),
        ("Texas", "TX"),
        ("Illinois", "IL"),
        ("Florida", "FL"),
        ("Washington", "WA"),
    ])
});

static STATE_REGIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let regions: [(&str, [&str; 5]); 4] = [
        ("Northeast", ["NY", "MA", "PA", "NJ", "CT"]),
        ("West", ["CA", "WA", "OR", "NV", "AZ"]),
        ("South", ["TX", "FL", "GA", "NC", "TN"]),
        ("Midwest", ["IL", "OH", "MI", "WI", "MN"]),
    ];
    regions
        .iter()
        .flat_map(|(region, states)| states.iter().map(move |state| (*state, *region)))
        .collect()
});

/// Company-name keywords checked in order; the first hit decides the industry
const INDUSTRY_KEYWORDS: &[(&str, &str)] = &[
    ("tech", "Technology"),
    ("soft", "Technology"),
    ("data", "Technology"),
    ("logistics", "Logistics"),
    ("transport", "Logistics"),
    ("finance", "Finance"),
    ("capital", "Finance"),
    ("bank", "Finance"),
    ("retail", "Retail"),
    ("shop", "Retail"),
    ("mfg", "Manufacturing"),
    ("corp", "Corporate"),
];

/// Standard abbreviation for a state: known full names map to their code and
/// two-letter codes are uppercased (title-casing turns `CA` into `Ca`)
pub fn standardize_state(state: &str) -> Option<String> {
    if let Some(abbreviation) = STATE_ABBREVIATIONS.get(state) {
        return Some(abbreviation.to_string());
    }
    if state.len() == 2 && state.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some(state.to_ascii_uppercase());
    }
    None
}

/// Replace full state names with their two-letter abbreviation
pub fn standardize_state_names(dataset: &mut Dataset) {
    if !dataset.has_column(STATE) {
        return;
    }
    info!("Standardizing state names");

    for record in dataset.records_mut() {
        if let Some(abbreviation) = record.text(STATE).and_then(standardize_state) {
            record.set(STATE, abbreviation);
        }
    }
}

/// Region for a state abbreviation, `Other` when unknown
pub fn region_for(state: &str) -> &'static str {
    STATE_REGIONS.get(state).copied().unwrap_or(OTHER)
}

/// Add the `region` column derived from `state`
pub fn enrich_regions(dataset: &mut Dataset) {
    info!("Enriching regions");
    dataset.ensure_column(REGION);

    for record in dataset.records_mut() {
        let region = record.text(STATE).map(region_for).unwrap_or(OTHER);
        record.set(REGION, region);
    }
}

/// Industry guessed from a company name, if any keyword matches
pub fn industry_from_name(company_name: &str) -> Option<&'static str> {
    let lowered = company_name.to_lowercase();
    INDUSTRY_KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, industry)| *industry)
}

/// Guess the industry of records still classified as `Other`
pub fn fill_missing_industry_from_keywords(dataset: &mut Dataset) -> usize {
    info!("Enriching missing industries");
    let mut filled = 0;

    for record in dataset.records_mut() {
        if record.text(INDUSTRY) != Some(OTHER) {
            continue;
        }
        let guess = industry_from_name(&record.get(COMPANY_NAME).render());
        if let Some(industry) = guess {
            record.set(INDUSTRY, Value::text(industry));
            filled += 1;
        }
    }

    filled
}

/// Run the enrichment sequence in order
pub fn enrich(dataset: &mut Dataset) -> usize {
    standardize_state_names(dataset);
    enrich_regions(dataset);
    fill_missing_industry_from_keywords(dataset)
}
