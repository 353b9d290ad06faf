use std::path::PathBuf;
use thiserror::Error;

use crate::intent::ChartKind;

/// Failures surfaced by a single chart-build request.
///
/// Every variant is recoverable at the request boundary: the caller reports
/// the message back to the agent/UI and the session carries on.
#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Unsupported chart kind '{0}' (expected one of: bar, line, pie, histogram, heatmap, scatter, box)")]
    UnsupportedKind(String),

    #[error("Column '{0}' not found in query result")]
    UnknownColumn(String),

    #[error("Invalid columns for {kind} chart: {reason}")]
    InvalidColumnShape { kind: ChartKind, reason: String },

    #[error("Query result has no rows to plot")]
    EmptyResult,

    #[error("Invalid value in column '{column}': {reason}")]
    InvalidValue { column: String, reason: String },

    #[error("Failed to render chart: {0}")]
    RenderFailure(String),

    #[error("Artifact storage unavailable at {}: {source}", path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed chart intent: {0}")]
    MalformedIntent(String),

    #[error("Malformed result table: {0}")]
    MalformedTable(String),
}

impl ChartError {
    /// Stable machine-readable name of the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            ChartError::UnsupportedKind(_) => "unsupported_kind",
            ChartError::UnknownColumn(_) => "unknown_column",
            ChartError::InvalidColumnShape { .. } => "invalid_column_shape",
            ChartError::EmptyResult => "empty_result",
            ChartError::InvalidValue { .. } => "invalid_value",
            ChartError::RenderFailure(_) => "render_failure",
            ChartError::StorageUnavailable { .. } => "storage_unavailable",
            ChartError::MalformedIntent(_) => "malformed_intent",
            ChartError::MalformedTable(_) => "malformed_table",
        }
    }

    /// Errors that describe the request itself rather than the render or write.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ChartError::UnsupportedKind(_)
                | ChartError::UnknownColumn(_)
                | ChartError::InvalidColumnShape { .. }
                | ChartError::EmptyResult
                | ChartError::InvalidValue { .. }
                | ChartError::MalformedIntent(_)
                | ChartError::MalformedTable(_)
        )
    }

    pub(crate) fn shape(kind: ChartKind, reason: impl Into<String>) -> Self {
        ChartError::InvalidColumnShape {
            kind,
            reason: reason.into(),
        }
    }

    pub(crate) fn value(column: &str, reason: impl Into<String>) -> Self {
        ChartError::InvalidValue {
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<anyhow::Error> for ChartError {
    fn from(err: anyhow::Error) -> Self {
        ChartError::RenderFailure(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, ChartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_failure_keeps_context_chain() {
        let err = anyhow::anyhow!("encoder exploded").context("Failed to encode PNG");
        let chart_err: ChartError = err.into();
        let msg = chart_err.to_string();
        assert!(msg.contains("Failed to encode PNG"));
        assert!(msg.contains("encoder exploded"));
        assert_eq!(chart_err.code(), "render_failure");
    }

    #[test]
    fn test_validation_classification() {
        assert!(ChartError::EmptyResult.is_validation());
        assert!(ChartError::UnknownColumn("x".into()).is_validation());
        assert!(!ChartError::RenderFailure("boom".into()).is_validation());
    }

    #[test]
    fn test_shape_message_names_kind() {
        let err = ChartError::shape(ChartKind::Scatter, "expected 2 columns, got 1");
        assert_eq!(
            err.to_string(),
            "Invalid columns for scatter chart: expected 2 columns, got 1"
        );
    }
}
