//! Applicant snapshot synchronization between normalized Airtable tables and a
//! denormalized JSON document, with LLM enrichment and rule-based shortlisting.

pub mod completion;
pub mod config;
pub mod error;
pub mod store;
pub mod telemetry;
pub mod workflows;
