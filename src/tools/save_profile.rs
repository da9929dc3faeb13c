//! MCP `save_profile` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `save_profile` MCP tool. Omitted fields keep their
/// stored value.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SaveProfileParams {
    #[schemars(description = "Display name")]
    pub name: Option<String>,

    #[schemars(description = "Typical cycle length in days (1-90)")]
    pub avg_cycle_length: Option<u32>,
}
