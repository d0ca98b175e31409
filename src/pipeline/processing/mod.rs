// Pipeline processing: cleaning, enrichment, entity resolution and scoring

pub mod cleaning;
pub mod enrich;
pub mod entity_resolution;
pub mod scoring;
