//! Warehouse implementations for Data Copilot.
//!
//! [`BigQueryEngine`] implements `datacopilot_core::QueryEngine` against the
//! BigQuery REST API. The agent only sees the trait.

pub mod bigquery;
pub mod dataset;
mod decode;

pub use bigquery::BigQueryEngine;
pub use dataset::DatasetRef;
