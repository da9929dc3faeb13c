//! MCP `predict_cycle` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `predict_cycle` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PredictCycleParams {
    #[schemars(description = "Also return 2-3 wellness insights from recent mood, pain and sleep. Defaults to false.")]
    pub include_insights: Option<bool>,
}
