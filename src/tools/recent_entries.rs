//! MCP `recent_entries` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `recent_entries` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecentEntriesParams {
    /// Maximum number of entries to return (1–365). Defaults to `[tracking].default_limit`.
    #[schemars(description = "Maximum number of entries to return, newest first (1-365). Defaults to 30.")]
    pub limit: Option<usize>,
}
