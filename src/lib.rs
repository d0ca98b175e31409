pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod server;

// Domain data shapes shared across layers
pub mod domain;
pub mod pipeline;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;

pub mod observability;
