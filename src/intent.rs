use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{ChartError, Result};

/// Closed set of chart kinds the dispatcher can route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Histogram,
    Heatmap,
    Scatter,
    Box,
}

impl ChartKind {
    pub const ALL: [ChartKind; 7] = [
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Pie,
        ChartKind::Histogram,
        ChartKind::Heatmap,
        ChartKind::Scatter,
        ChartKind::Box,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Histogram => "histogram",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Scatter => "scatter",
            ChartKind::Box => "box",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "bar" | "bar_chart" => Ok(ChartKind::Bar),
            "line" | "line_chart" => Ok(ChartKind::Line),
            "pie" | "pie_chart" => Ok(ChartKind::Pie),
            "histogram" | "hist" => Ok(ChartKind::Histogram),
            "heatmap" | "heat_map" => Ok(ChartKind::Heatmap),
            "scatter" | "scatter_plot" => Ok(ChartKind::Scatter),
            "box" | "boxplot" | "box_plot" => Ok(ChartKind::Box),
            _ => Err(ChartError::UnsupportedKind(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for ChartKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Mean,
    Count,
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "sum" => Ok(Aggregation::Sum),
            "mean" | "avg" | "average" => Ok(Aggregation::Mean),
            "count" => Ok(Aggregation::Count),
            other => Err(format!("unknown aggregation '{}' (expected sum, mean or count)", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Aggregation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Aggregation::Sum => "sum",
            Aggregation::Mean => "mean",
            Aggregation::Count => "count",
        };
        f.write_str(s)
    }
}

/// Bar direction. Only bar charts honour it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    #[serde(alias = "v")]
    Vertical,
    #[serde(alias = "h")]
    Horizontal,
}

/// The agent's decision about what to draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartIntent {
    pub kind: ChartKind,
    pub columns: Vec<String>,
    #[serde(default)]
    pub aggregation: Option<Aggregation>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub x_label: Option<String>,
    #[serde(default)]
    pub y_label: Option<String>,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub bins: Option<usize>,
    #[serde(default)]
    pub color: Option<String>,
}

impl ChartIntent {
    pub fn new(kind: ChartKind, columns: &[&str]) -> Self {
        Self {
            kind,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            aggregation: None,
            title: None,
            x_label: None,
            y_label: None,
            orientation: Orientation::Vertical,
            bins: None,
            color: None,
        }
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Parse an intent coming from the agent layer.
    ///
    /// An unknown `kind` string is reported as `UnsupportedKind`; any other
    /// structural problem as `MalformedIntent`.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| ChartError::MalformedIntent("intent must be a JSON object".to_string()))?;

        match obj.get("kind") {
            Some(Value::String(kind)) => {
                kind.parse::<ChartKind>()?;
            }
            Some(other) => {
                return Err(ChartError::MalformedIntent(format!(
                    "'kind' must be a string, got {}",
                    other
                )))
            }
            None => return Err(ChartError::MalformedIntent("missing field 'kind'".to_string())),
        }

        serde_json::from_value(value.clone()).map_err(|e| ChartError::MalformedIntent(e.to_string()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ChartError::MalformedIntent(format!("invalid JSON: {}", e)))?;
        Self::from_json(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_intent() {
        let intent = ChartIntent::from_json(&json!({
            "kind": "bar",
            "columns": ["category", "amount"],
            "aggregation": "sum",
            "title": "Revenue by category",
            "orientation": "h"
        }))
        .unwrap();
        assert_eq!(intent.kind, ChartKind::Bar);
        assert_eq!(intent.columns, vec!["category", "amount"]);
        assert_eq!(intent.aggregation, Some(Aggregation::Sum));
        assert_eq!(intent.orientation, Orientation::Horizontal);
        assert_eq!(intent.title.as_deref(), Some("Revenue by category"));
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!("boxplot".parse::<ChartKind>().unwrap(), ChartKind::Box);
        assert_eq!("Scatter-Plot".parse::<ChartKind>().unwrap(), ChartKind::Scatter);
        assert_eq!("hist".parse::<ChartKind>().unwrap(), ChartKind::Histogram);
    }

    #[test]
    fn test_unknown_kind_is_unsupported() {
        let err = ChartIntent::from_json(&json!({"kind": "funnel", "columns": ["a"]})).unwrap_err();
        assert!(matches!(err, ChartError::UnsupportedKind(ref k) if k == "funnel"));
    }

    #[test]
    fn test_wrong_field_types_are_malformed() {
        let err = ChartIntent::from_json(&json!({"kind": "bar", "columns": "category"})).unwrap_err();
        assert!(matches!(err, ChartError::MalformedIntent(_)));

        let err = ChartIntent::from_json(&json!({"kind": 3, "columns": []})).unwrap_err();
        assert!(matches!(err, ChartError::MalformedIntent(_)));

        let err = ChartIntent::from_json(&json!(["bar"])).unwrap_err();
        assert!(matches!(err, ChartError::MalformedIntent(_)));
    }

    #[test]
    fn test_unknown_aggregation_is_malformed() {
        let err = ChartIntent::from_json(&json!({
            "kind": "bar", "columns": ["a", "b"], "aggregation": "median"
        }))
        .unwrap_err();
        assert!(matches!(err, ChartError::MalformedIntent(_)));
    }

    #[test]
    fn test_aggregation_aliases() {
        assert_eq!("avg".parse::<Aggregation>().unwrap(), Aggregation::Mean);
        assert_eq!("COUNT".parse::<Aggregation>().unwrap(), Aggregation::Count);
    }

    #[test]
    fn test_builder_helpers() {
        let intent = ChartIntent::new(ChartKind::Pie, &["state", "orders"])
            .with_aggregation(Aggregation::Count)
            .with_title("Orders");
        assert_eq!(intent.aggregation, Some(Aggregation::Count));
        assert_eq!(intent.title.as_deref(), Some("Orders"));
        assert_eq!(intent.orientation, Orientation::Vertical);
    }
}
