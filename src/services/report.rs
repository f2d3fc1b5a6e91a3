//! Shared pieces of the job reports.

use comfy_table::{presets, Table};
use serde::Serialize;

use crate::error::AppError;

/// A single record that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    pub id: String,
    pub code: String,
    pub message: String,
}

impl RecordFailure {
    pub fn new(id: impl Into<String>, err: &AppError) -> Self {
        Self {
            id: id.into(),
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Borderless table used by the summaries.
pub(crate) fn summary_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::ASCII_BORDERS_ONLY_CONDENSED)
        .set_header(headers.to_vec());
    table
}
