/// Field name constants shared by every stage of the pipeline
/// These are the snake_case names produced by schema normalization

// Fields the entity resolution core depends on
pub const COMPANY_NAME: &str = "company_name";
pub const COMPANY_NAME_NORMALIZED: &str = "company_name_normalized";
pub const ORIGINAL_COMPANY_NAME: &str = "original_company_name";
pub const EMAIL: &str = "email";
pub const CLOSE_DATE: &str = "close_date";

// Fields consumed or produced by the surrounding stages
pub const ID: &str = "id";
pub const CONTACT_NAME: &str = "contact_name";
pub const PHONE: &str = "phone";
pub const REVENUE: &str = "revenue";
pub const EMPLOYEE_COUNT: &str = "employee_count";
pub const INDUSTRY: &str = "industry";
pub const DEAL_STAGE: &str = "deal_stage";
pub const OWNER: &str = "owner";
pub const CITY: &str = "city";
pub const STATE: &str = "state";
pub const REGION: &str = "region";
pub const SEGMENT: &str = "segment";
pub const LEAD_SCORE: &str = "lead_score";

// Placeholder values written by the cleaning stage
pub const UNKNOWN_ENTITY: &str = "Unknown Entity";
pub const OTHER: &str = "Other";
pub const UNQUALIFIED: &str = "Unqualified";
pub const UNASSIGNED: &str = "Unassigned";

// Stage labels as they appear in the pipeline metrics report
pub const STAGE_INGESTION: &str = "Ingestion";
pub const STAGE_CLEANING: &str = "Cleaning";
pub const STAGE_ENRICHMENT: &str = "Enrichment";
pub const STAGE_ENTITY_RESOLUTION: &str = "Entity Resolution";
pub const STAGE_SCORING: &str = "Pricing & Scoring";

// Export file names
pub const PROCESSED_FILE_NAME: &str = "crm_analytics_ready.csv";
pub const KPI_SUMMARY_FILE_NAME: &str = "kpi_summary.csv";
pub const METRICS_FILE_NAME: &str = "pipeline_metrics.json";
pub const UPLOAD_FILE_STEM: &str = "crm_raw_data";

/// Get the text columns that cleaning trims and title-cases
pub fn text_columns() -> Vec<&'static str> {
    vec![COMPANY_NAME, CONTACT_NAME, CITY, STATE, INDUSTRY, DEAL_STAGE, OWNER]
}
