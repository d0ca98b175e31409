use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

use crm_pipeline::app::PipelineUseCase;
use crm_pipeline::config::{Config, EntityResolutionConfig};
use crm_pipeline::constants::{COMPANY_NAME, INDUSTRY, LEAD_SCORE, REGION, SEGMENT, STATE};
use crm_pipeline::domain::Value;
use crm_pipeline::infra::FilePipelineOutputAdapter;

const RAW_CSV: &str = "\
ID,Company,Contact,Email,Phone,State,Industry,Annual Revenue,Employees,Deal Stage,Owner,Close Date
1,globex inc,Hank Scorpio,HANK@globex.com,555-0101,California,,2500000,300,closed won,ann,2024-01-15
2,Globex Inc.,Hank Scorpio,hank@globex.com,555-0101,CA,,2600000,320,negotiation,ann,2024-06-01
3,Umbrella Corp,Albert Wesker,,555-0199,Texas,Pharma,800000,40,proposal,bob,2023-03-03
4,Umbrella Corp Ltd,Albert Wesker,,,TX,Pharma,850000,45,lead,bob,someday
5,Initech Software,Peter Gibbons,peter@initech.com,,Ontario,,,,,,
5,Initech Software,Peter Gibbons,peter@initech.com,,Ontario,,,,,,
";

fn write_input(dir: &Path, name: &str, contents: &str) -> Result<std::path::PathBuf> {
    let path = dir.join(name);
    fs::write(&path, contents)?;
    Ok(path)
}

#[test]
fn test_full_run_exports_artifacts() -> Result<()> {
    let dir = tempdir()?;
    let input = write_input(dir.path(), "crm_raw_data.csv", RAW_CSV)?;
    let processed_dir = dir.path().join("data/processed");
    let reports_dir = dir.path().join("reports");

    let run = PipelineUseCase::from_config(&EntityResolutionConfig::default())
        .with_output(Arc::new(FilePipelineOutputAdapter::new(&processed_dir, &reports_dir)))
        .run(&input)?;

    // Exact duplicate dropped, Globex and Umbrella consolidated
    assert_eq!(run.dataset.len(), 3);
    let companies: Vec<&str> = run
        .dataset
        .records()
        .iter()
        .map(|r| r.text(COMPANY_NAME).unwrap())
        .collect();
    assert_eq!(companies, vec!["Globex Inc.", "Initech Software", "Umbrella Corp Ltd"]);

    let globex = &run.dataset.records()[0];
    assert_eq!(globex.text(STATE), Some("CA"));
    assert_eq!(globex.text(REGION), Some("West"));
    assert_eq!(globex.text(SEGMENT), Some("Mid-Market"));
    // revenue 30 + employees 20 + email 10 + phone 10 + negotiation 40
    assert_eq!(globex.get(LEAD_SCORE), &Value::Integer(110));

    let initech = &run.dataset.records()[1];
    assert_eq!(initech.text(INDUSTRY), Some("Technology"));
    assert_eq!(initech.text(REGION), Some("Other"));
    assert_eq!(initech.text(SEGMENT), Some("Unknown"));

    let umbrella = &run.dataset.records()[2];
    assert_eq!(umbrella.text("original_company_name"), Some("Umbrella Corp"));

    let exported = run.exported.expect("file adapter configured");
    let processed = fs::read_to_string(&exported.processed)?;
    let header = processed.lines().next().unwrap_or_default();
    assert!(header.starts_with("id,company_name,contact_name,email"));
    assert!(header.ends_with("original_company_name,segment,lead_score"));
    assert!(!header.contains("company_name_normalized"));

    let kpi = fs::read_to_string(reports_dir.join("kpi_summary.csv"))?;
    assert_eq!(kpi.lines().next(), Some("segment,deal_stage,total_revenue,avg_score,count"));
    assert_eq!(kpi.lines().count(), 4);

    let metrics: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(reports_dir.join("pipeline_metrics.json"))?)?;
    let stages = metrics["stages"].as_array().unwrap();
    assert_eq!(stages.len(), 5);
    assert_eq!(stages[0]["row_count"], 6);
    assert_eq!(stages[1]["row_count"], 5);
    assert_eq!(stages[3]["stage"], "Entity Resolution");
    assert_eq!(stages[3]["row_count"], 3);
    assert_eq!(stages[3]["details"]["entity_resolution"]["merged_names"], 2);
    Ok(())
}

#[test]
fn test_json_input_runs_end_to_end() -> Result<()> {
    let dir = tempdir()?;
    let input = write_input(
        dir.path(),
        "crm_raw_data.json",
        r#"[
            {"Organization": "Stark Industries", "Email": "tony@stark.com", "Revenue": 9000000, "Deal Stage": "Closed Won"},
            {"Organization": "Stark Industries Ltd", "Email": "tony@stark.com", "Revenue": 1, "Deal Stage": "Lead"}
        ]"#,
    )?;

    let run = PipelineUseCase::from_config(&EntityResolutionConfig::default()).run(&input)?;

    assert_eq!(run.dataset.len(), 1);
    assert!(run.exported.is_none());
    assert_eq!(run.dataset.records()[0].text(COMPANY_NAME), Some("Stark Industries Ltd"));
    Ok(())
}

#[test]
fn test_failed_run_writes_nothing() -> Result<()> {
    let dir = tempdir()?;
    let input = write_input(dir.path(), "contacts.csv", "Email,Phone\na@b.com,555\n")?;
    let reports_dir = dir.path().join("reports");

    let err = PipelineUseCase::from_config(&EntityResolutionConfig::default())
        .with_output(Arc::new(FilePipelineOutputAdapter::new(dir.path().join("processed"), &reports_dir)))
        .run(&input)
        .unwrap_err();

    assert!(format!("{:#}", err).contains("Pipeline failed at Entity Resolution"));
    assert!(!reports_dir.exists());
    Ok(())
}

#[test]
fn test_config_threshold_flows_into_resolution() -> Result<()> {
    let dir = tempdir()?;
    let input = write_input(
        dir.path(),
        "crm_raw_data.csv",
        "Company,Email\nAcme Corp,a@acme.com\nAcme Corporation,a@acme.com\n",
    )?;

    let strict = Config::default();
    let run = PipelineUseCase::from_config(&strict.entity_resolution).run(&input)?;
    assert_eq!(run.dataset.len(), 2);

    let loose = Config::from_toml("[entity_resolution]\nsimilarity_threshold = 0.7\n")?;
    let run = PipelineUseCase::from_config(&loose.entity_resolution).run(&input)?;
    assert_eq!(run.dataset.len(), 1);
    assert_eq!(run.dataset.records()[0].text(COMPANY_NAME), Some("Acme Corporation"));
    Ok(())
}
