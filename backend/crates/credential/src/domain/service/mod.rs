pub mod analytics;
pub mod workflow;
