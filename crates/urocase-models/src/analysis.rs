//! Video analysis modes, strategies and results.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Which code path produced an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStrategyName {
    /// Whole video sent inline to the model
    Native,
    /// Evenly spaced stills sent as an ordered image sequence
    Frames,
}

impl AnalysisStrategyName {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStrategyName::Native => "native",
            AnalysisStrategyName::Frames => "frames",
        }
    }
}

impl fmt::Display for AnalysisStrategyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide selector behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Native only; oversized videos are rejected
    Native,
    /// Frame extraction only
    Legacy,
    /// Native when eligible, frame extraction otherwise or on failure
    #[default]
    NativeWithFallback,
}

impl AnalysisMode {
    /// Parse a configured value. Absent or unrecognized values map to the default.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("native") => AnalysisMode::Native,
            Some("legacy") => AnalysisMode::Legacy,
            Some("native_with_fallback") => AnalysisMode::NativeWithFallback,
            _ => AnalysisMode::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Native => "native",
            AnalysisMode::Legacy => "legacy",
            AnalysisMode::NativeWithFallback => "native_with_fallback",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one video analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Generated teaching explanation
    #[serde(rename = "explanation")]
    pub explanation_text: String,
    /// Thumbnail as a `data:` URL
    #[serde(rename = "thumbnail")]
    pub thumbnail_data_url: String,
    /// Strategy that produced the explanation
    #[serde(rename = "strategy")]
    pub strategy_used: AnalysisStrategyName,
}
