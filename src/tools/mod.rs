pub mod health_insights;
pub mod log_entry;
pub mod predict_cycle;
pub mod recent_entries;
pub mod save_profile;

use chrono::Utc;
use health_insights::HealthInsightsParams;
use log_entry::LogEntryParams;
use predict_cycle::PredictCycleParams;
use recent_entries::RecentEntriesParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use save_profile::SaveProfileParams;
use std::sync::Arc;

use flowfriend::advisory::{self, SymptomCounts};
use flowfriend::config::FlowFriendConfig;
use flowfriend::llm::{self, LanguageModel};
use flowfriend::tracking::identity;
use flowfriend::tracking::{Entry, EntrySink, EntrySource, EntryStore};

const MAX_RECENT_ENTRIES: usize = 365;

/// The FlowFriend MCP tool handler. Holds the entry store, the signed-in
/// identity, config and (when configured) the model client.
#[derive(Clone)]
pub struct FlowFriendTools {
    tool_router: ToolRouter<Self>,
    store: EntryStore,
    user_id: Arc<str>,
    config: Arc<FlowFriendConfig>,
    model: Option<Arc<dyn LanguageModel>>,
}

#[tool_router]
impl FlowFriendTools {
    pub fn new(
        store: EntryStore,
        user_id: Arc<str>,
        config: Arc<FlowFriendConfig>,
        model: Option<Arc<dyn LanguageModel>>,
    ) -> Self {
        Self {
            tool_router: Self::tool_router(),
            store,
            user_id,
            config,
            model,
        }
    }

    /// The model client, or the configuration error explaining why there is
    /// none.
    fn model(&self) -> Result<Arc<dyn LanguageModel>, String> {
        match &self.model {
            Some(model) => Ok(Arc::clone(model)),
            None => llm::create_model(&self.config.model).map_err(|e| e.to_string()),
        }
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Entry>, String> {
        self.store
            .recent(&self.user_id, limit)
            .await
            .map_err(|e| format!("read failed: {e}"))
    }

    /// Append a manual tracking entry.
    #[tool(description = "Log a manual tracking entry for today (or a given date). Any of flow, mood, pain, sleep may be omitted and is stored as not_recorded.")]
    async fn log_entry(
        &self,
        Parameters(params): Parameters<LogEntryParams>,
    ) -> Result<String, String> {
        let entry = params.to_new_entry()?;
        tracing::info!(flow = %entry.flow, mood = %entry.mood, "log_entry called");

        let stored = self
            .store
            .append(&self.user_id, entry)
            .await
            .map_err(|e| format!("store failed: {e}"))?;

        serde_json::to_string(&stored).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Most recent entries, newest first.
    #[tool(description = "List the most recent tracking entries, newest first.")]
    async fn recent_entries(
        &self,
        Parameters(params): Parameters<RecentEntriesParams>,
    ) -> Result<String, String> {
        let limit = params
            .limit
            .unwrap_or(self.config.tracking.default_limit)
            .clamp(1, MAX_RECENT_ENTRIES);
        tracing::info!(limit, "recent_entries called");

        let entries = self.recent(limit).await?;
        Ok(serde_json::json!({
            "entries": entries,
            "total": entries.len(),
        })
        .to_string())
    }

    /// Predict the next period start date.
    #[tool(description = "Predict the next period start date, cycle length and confidence from recent flow history.")]
    async fn predict_cycle(
        &self,
        Parameters(params): Parameters<PredictCycleParams>,
    ) -> Result<String, String> {
        let model = self.model()?;
        let entries = self.recent(self.config.tracking.prediction_window).await?;
        tracing::info!(entries = entries.len(), "predict_cycle called");

        if entries.is_empty() {
            return Ok(serde_json::json!({
                "prediction": null,
                "message": "Not enough data yet. Track your flow for at least one cycle to enable predictions."
            })
            .to_string());
        }

        let today = Utc::now().date_naive();
        let (prediction, insights) = if params.include_insights.unwrap_or(false) {
            let advice = advisory::advise(model.as_ref(), &entries, today)
                .await
                .map_err(|e| e.to_string())?;
            (advice.prediction, Some(advice.insights))
        } else {
            let prediction = advisory::predict_next_cycle(model.as_ref(), &entries, today)
                .await
                .map_err(|e| e.to_string())?;
            (prediction, None)
        };

        Ok(serde_json::json!({
            "prediction": prediction,
            "days_until": prediction.as_ref().map(|p| p.days_until(today)),
            "insights": insights,
        })
        .to_string())
    }

    /// Wellness insights from recent mood, pain and sleep.
    #[tool(description = "Get 2-3 short wellness insights based on recent mood, pain and sleep patterns.")]
    async fn health_insights(
        &self,
        Parameters(params): Parameters<HealthInsightsParams>,
    ) -> Result<String, String> {
        let model = self.model()?;
        let entries = self.recent(self.config.tracking.insights_window).await?;
        tracing::info!(entries = entries.len(), "health_insights called");

        let insights = advisory::health_insights(model.as_ref(), &entries)
            .await
            .map_err(|e| e.to_string())?;

        let mut response = serde_json::json!({ "insights": insights });
        if params.include_counts.unwrap_or(false) {
            response["counts"] = serde_json::to_value(SymptomCounts::tally(&entries))
                .map_err(|e| format!("serialization failed: {e}"))?;
        }
        Ok(response.to_string())
    }

    /// Update the signed-in user's profile.
    #[tool(description = "Save the user's profile. Omitted fields keep their current value.")]
    async fn save_profile(
        &self,
        Parameters(params): Parameters<SaveProfileParams>,
    ) -> Result<String, String> {
        if let Some(days) = params.avg_cycle_length {
            if !(1..=90).contains(&days) {
                return Err("avg_cycle_length must be between 1 and 90".into());
            }
        }
        tracing::info!("save_profile called");

        let user_id = self.user_id.to_string();
        let user = self
            .store
            .with_conn(move |conn| {
                identity::save_user(conn, &user_id, params.name.as_deref(), params.avg_cycle_length)
            })
            .await
            .map_err(|e| format!("save failed: {e}"))?;

        serde_json::to_string(&user).map_err(|e| format!("serialization failed: {e}"))
    }
}

#[tool_handler]
impl ServerHandler for FlowFriendTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "FlowFriend is a cycle tracker. Use log_entry to record a day, recent_entries \
                 to read history, and predict_cycle or health_insights for model-backed advice."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
