//! MCP `health_insights` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `health_insights` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthInsightsParams {
    #[schemars(description = "Also return the mood, pain and sleep tallies the insights were based on. Defaults to false.")]
    pub include_counts: Option<bool>,
}
