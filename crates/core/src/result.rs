//! Decoding of the COMPLETED job result payload.
//!
//! The service stores the result as a JSON string of the shape
//! `{"responseType": "text" | "table" | "plotData", "metadata": {...}, ...}`.
//! Anything that does not match is kept verbatim as [`AnalyticsResult::Raw`].

use serde::Deserialize;

use crate::types::Timestamp;

/// Metadata the service attaches to every structured result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    #[serde(default)]
    pub generated_at: Option<Timestamp>,
    #[serde(default)]
    pub query: Option<String>,
}

/// A decoded analytics result.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsResult {
    /// Free-form answer text.
    Text {
        content: String,
        metadata: Option<ResultMetadata>,
    },
    /// Tabular answer; the table shape is passed through untouched.
    Table {
        table_data: serde_json::Value,
        metadata: Option<ResultMetadata>,
    },
    /// One or more chart specifications.
    Plot {
        plot_data: Vec<serde_json::Value>,
        metadata: Option<ResultMetadata>,
    },
    /// Not a recognised structured result.
    Raw(String),
}

#[derive(Deserialize)]
#[serde(tag = "responseType")]
enum Tagged {
    #[serde(rename = "text")]
    Text {
        #[serde(default)]
        content: String,
        #[serde(default)]
        metadata: Option<ResultMetadata>,
    },
    #[serde(rename = "table")]
    Table {
        #[serde(rename = "tableData", default)]
        table_data: serde_json::Value,
        #[serde(default)]
        metadata: Option<ResultMetadata>,
    },
    #[serde(rename = "plotData")]
    Plot {
        #[serde(rename = "plotData", default)]
        plot_data: Vec<serde_json::Value>,
        #[serde(default)]
        metadata: Option<ResultMetadata>,
    },
}

impl AnalyticsResult {
    /// Decode a result string. Never fails.
    pub fn decode(raw: &str) -> Self {
        match serde_json::from_str::<Tagged>(raw) {
            Ok(Tagged::Text { content, metadata }) => AnalyticsResult::Text { content, metadata },
            Ok(Tagged::Table {
                table_data,
                metadata,
            }) => AnalyticsResult::Table {
                table_data,
                metadata,
            },
            Ok(Tagged::Plot {
                plot_data,
                metadata,
            }) => AnalyticsResult::Plot {
                plot_data,
                metadata,
            },
            Err(_) => AnalyticsResult::Raw(raw.to_string()),
        }
    }

    /// The wire `responseType`, or `"raw"` for undecoded payloads.
    pub fn response_type(&self) -> &'static str {
        match self {
            AnalyticsResult::Text { .. } => "text",
            AnalyticsResult::Table { .. } => "table",
            AnalyticsResult::Plot { .. } => "plotData",
            AnalyticsResult::Raw(_) => "raw",
        }
    }

    pub fn metadata(&self) -> Option<&ResultMetadata> {
        match self {
            AnalyticsResult::Text { metadata, .. }
            | AnalyticsResult::Table { metadata, .. }
            | AnalyticsResult::Plot { metadata, .. } => metadata.as_ref(),
            AnalyticsResult::Raw(_) => None,
        }
    }
}
