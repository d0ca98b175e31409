use tracing::info;

use crate::constants::{DEAL_STAGE, EMAIL, EMPLOYEE_COUNT, LEAD_SCORE, PHONE, REVENUE, SEGMENT};
use crate::domain::{Dataset, Record, Value};

/// Business tier of a customer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Enterprise,
    MidMarket,
    Smb,
    Unknown,
}

impl Segment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Enterprise => "Enterprise",
            Segment::MidMarket => "Mid-Market",
            Segment::Smb => "SMB",
            Segment::Unknown => "Unknown",
        }
    }

    /// Missing numbers fail every comparison
    pub fn classify(revenue: Option<f64>, employees: Option<f64>) -> Self {
        let revenue_at_least = |floor: f64| revenue.map_or(false, |r| r >= floor);
        let employees_at_least = |floor: f64| employees.map_or(false, |e| e >= floor);

        if revenue_at_least(5_000_000.0) || employees_at_least(500.0) {
            Segment::Enterprise
        } else if revenue_at_least(1_000_000.0) || employees_at_least(100.0) {
            Segment::MidMarket
        } else if revenue.map_or(false, |r| r > 0.0) {
            Segment::Smb
        } else {
            Segment::Unknown
        }
    }
}

fn deal_stage_weight(stage: &str) -> i64 {
    match stage {
        "Closed Won" => 50,
        "Negotiation" => 40,
        "Proposal" => 30,
        "Qualified" => 20,
        "Discovery" => 10,
        "Lead" => 5,
        _ => 0,
    }
}

pub fn lead_score(record: &Record) -> i64 {
    let mut score = 0;

    match record.number(REVENUE) {
        Some(revenue) if revenue > 1_000_000.0 => score += 30,
        Some(revenue) if revenue > 0.0 => score += 10,
        _ => {}
    }
    if record.number(EMPLOYEE_COUNT).map_or(false, |e| e > 100.0) {
        score += 20;
    }
    if record.is_present(EMAIL) {
        score += 10;
    }
    if record.is_present(PHONE) {
        score += 10;
    }
    if let Some(stage) = record.text(DEAL_STAGE) {
        score += deal_stage_weight(stage);
    }

    score
}

/// Add the `segment` column
pub fn segment_customers(dataset: &mut Dataset) {
    info!("Segmenting customers");
    dataset.ensure_column(SEGMENT);
    for record in dataset.records_mut() {
        let segment = Segment::classify(record.number(REVENUE), record.number(EMPLOYEE_COUNT));
        record.set(SEGMENT, segment.as_str());
    }
}

/// Add the integer `lead_score` column
pub fn calculate_scoring(dataset: &mut Dataset) {
    info!("Calculating lead scores");
    dataset.ensure_column(LEAD_SCORE);
    for record in dataset.records_mut() {
        let score = lead_score(record);
        record.set(LEAD_SCORE, Value::Integer(score));
    }
}

/// Segmentation first, then scoring
pub fn score(dataset: &mut Dataset) {
    segment_customers(dataset);
    calculate_scoring(dataset);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_boundaries() {
        assert_eq!(Segment::classify(Some(5_000_000.0), None), Segment::Enterprise);
        assert_eq!(Segment::classify(Some(10.0), Some(500.0)), Segment::Enterprise);
        assert_eq!(Segment::classify(Some(1_000_000.0), Some(0.0)), Segment::MidMarket);
        assert_eq!(Segment::classify(None, Some(100.0)), Segment::MidMarket);
        assert_eq!(Segment::classify(Some(0.5), Some(99.0)), Segment::Smb);
        assert_eq!(Segment::classify(Some(0.0), Some(0.0)), Segment::Unknown);
        assert_eq!(Segment::classify(None, None), Segment::Unknown);
    }

    #[test]
    fn test_lead_score() {
        let hot = Record::from_pairs([
            (REVENUE, Value::Integer(2_000_000)),
            (EMPLOYEE_COUNT, Value::Integer(250)),
            (EMAIL, Value::text("a@acme.com")),
            (PHONE, Value::text("555-0100")),
            (DEAL_STAGE, Value::text("Closed Won")),
        ]);
        assert_eq!(lead_score(&hot), 120);

        let cold = Record::from_pairs([
            (REVENUE, Value::Integer(1_000_000)),
            (EMPLOYEE_COUNT, Value::Integer(100)),
            (DEAL_STAGE, Value::text("Unqualified")),
        ]);
        assert_eq!(lead_score(&cold), 10);

        assert_eq!(lead_score(&Record::new()), 0);
    }

    #[test]
    fn test_score_adds_columns() {
        let mut data = Dataset::from_records(
            [REVENUE],
            vec![Record::from_pairs([(REVENUE, Value::Float(7_500_000.0))])],
        );

        score(&mut data);

        assert_eq!(data.columns(), &[REVENUE, SEGMENT, LEAD_SCORE]);
        let record = &data.records()[0];
        assert_eq!(record.text(SEGMENT), Some("Enterprise"));
        assert_eq!(record.get(LEAD_SCORE), &Value::Integer(30));
    }
}
