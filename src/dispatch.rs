use serde_json::Value;
use tracing::{debug, info, warn};

use crate::artifact::ArtifactRef;
use crate::builders::{self, ChartOptions};
use crate::config::VizConfig;
use crate::data::ResultTable;
use crate::error::{ChartError, Result};
use crate::intent::ChartIntent;
use crate::shape;
use crate::store::ArtifactStore;
use crate::RenderOptions;

/// Validates a chart intent against a result table, routes it to the
/// matching builder and stores the artifact.
///
/// Holds only read-only settings, so one instance can serve concurrent requests.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    store: ArtifactStore,
    render: RenderOptions,
    histogram_bins: usize,
    categorical_max_distinct: usize,
}

impl Dispatcher {
    pub fn new(config: &VizConfig) -> Self {
        Self {
            store: ArtifactStore::new(config.output_dir.clone()),
            render: config.render.clone(),
            histogram_bins: config.histogram_bins,
            categorical_max_distinct: config.categorical_max_distinct,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Build and store one chart.
    ///
    /// Validation runs before any builder: column names, then the per-kind
    /// shape, then row count. Builders may still report `EmptyResult` or
    /// `InvalidValue` once nulls are excluded.
    pub fn dispatch(&self, intent: &ChartIntent, table: &ResultTable) -> Result<ArtifactRef> {
        // An empty row array carries no column metadata to validate against
        if table.is_empty() && table.columns().is_empty() {
            return Err(ChartError::EmptyResult);
        }

        let plan = shape::plan(intent, table)?;
        if table.is_empty() {
            return Err(ChartError::EmptyResult);
        }
        let opts = ChartOptions::from_intent(intent, &self.render, self.histogram_bins)?;

        debug!(kind = %intent.kind, rows = table.len(), "routing to builder");
        let artifact = builders::build(plan, table, &opts).map_err(|err| {
            if !err.is_validation() {
                warn!(kind = %intent.kind, error = %err, "chart builder failed");
            }
            err
        })?;

        let reference = self.store.store(&artifact)?;
        info!(
            kind = %reference.kind,
            id = %reference.id,
            rows = reference.rows_rendered,
            "chart ready"
        );
        Ok(reference)
    }

    /// Dispatch from the JSON values the agent and query layers hand over.
    pub fn dispatch_json(&self, intent: &Value, table: &Value) -> Result<ArtifactRef> {
        let intent = ChartIntent::from_json(intent)?;
        let table = ResultTable::from_json_with(table, self.categorical_max_distinct)?;
        self.dispatch(&intent, &table)
    }
}
