use serde::Serialize;
use std::collections::BTreeMap;

use crate::constants::{DEAL_STAGE, ID, LEAD_SCORE, REVENUE, SEGMENT};
use crate::domain::{Dataset, Value};

/// One (segment, deal stage) row of the KPI summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiRow {
    pub segment: String,
    pub deal_stage: String,
    pub total_revenue: f64,
    pub avg_score: Option<f64>,
    pub count: usize,
}

impl KpiRow {
    pub const HEADERS: [&'static str; 5] = ["segment", "deal_stage", "total_revenue", "avg_score", "count"];

    /// Cells as written to the summary CSV
    pub fn to_csv_row(&self) -> [String; 5] {
        [
            self.segment.clone(),
            self.deal_stage.clone(),
            Value::Float(self.total_revenue).render(),
            Value::from(self.avg_score).render(),
            self.count.to_string(),
        ]
    }
}

#[derive(Default)]
struct Accumulator {
    revenue: f64,
    score_sum: f64,
    scores: usize,
    ids: usize,
}

/// Group by (segment, deal_stage), skipping records missing either key
pub fn summarize_kpis(dataset: &Dataset) -> Vec<KpiRow> {
    let mut groups: BTreeMap<(String, String), Accumulator> = BTreeMap::new();

    for record in dataset.records() {
        let (segment, stage) = match (record.get(SEGMENT), record.get(DEAL_STAGE)) {
            (Value::Missing, _) | (_, Value::Missing) => continue,
            (segment, stage) => (segment.render(), stage.render()),
        };

        let acc = groups.entry((segment, stage)).or_default();
        if let Some(revenue) = record.number(REVENUE) {
            acc.revenue += revenue;
        }
        if let Some(score) = record.number(LEAD_SCORE) {
            acc.score_sum += score;
            acc.scores += 1;
        }
        if record.is_present(ID) {
            acc.ids += 1;
        }
    }

    groups
        .into_iter()
        .map(|((segment, deal_stage), acc)| KpiRow {
            segment,
            deal_stage,
            total_revenue: acc.revenue,
            avg_score: (acc.scores > 0).then(|| acc.score_sum / acc.scores as f64),
            count: acc.ids,
        })
        .collect()
}
