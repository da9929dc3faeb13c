//! Free-text wellness insights from symptom tallies.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::llm::{GenerateRequest, LanguageModel, LlmError};
use crate::tracking::types::Entry;

/// About a month of daily logs.
pub const INSIGHTS_WINDOW: usize = 30;

/// Counts of each recorded value; `not_recorded` is never counted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymptomCounts {
    pub mood: BTreeMap<&'static str, u32>,
    pub pain: BTreeMap<&'static str, u32>,
    pub sleep: BTreeMap<&'static str, u32>,
}

impl SymptomCounts {
    pub fn tally(entries: &[Entry]) -> Self {
        let mut counts = Self::default();
        for entry in entries {
            if entry.mood.is_recorded() {
                *counts.mood.entry(entry.mood.as_str()).or_default() += 1;
            }
            if entry.pain.is_recorded() {
                *counts.pain.entry(entry.pain.as_str()).or_default() += 1;
            }
            if entry.sleep.is_recorded() {
                *counts.sleep.entry(entry.sleep.as_str()).or_default() += 1;
            }
        }
        counts
    }
}

pub fn insights_prompt(counts: &SymptomCounts) -> String {
    let render = |map: &BTreeMap<&'static str, u32>| {
        serde_json::to_string(map).unwrap_or_else(|_| "{}".into())
    };
    format!(
        "As a menstrual health assistant, provide brief wellness insights based on this tracking data from the past month:\n\
         \n\
         Mood patterns: {}\n\
         Pain patterns: {}\n\
         Sleep patterns: {}\n\
         \n\
         Provide 2-3 actionable insights in a friendly, supportive tone. Keep it under 100 words.",
        render(&counts.mood),
        render(&counts.pain),
        render(&counts.sleep),
    )
}

/// Ask the model for insights over the first [`INSIGHTS_WINDOW`] entries.
pub async fn health_insights(
    model: &dyn LanguageModel,
    entries: &[Entry],
) -> Result<String, LlmError> {
    let window = &entries[..entries.len().min(INSIGHTS_WINDOW)];
    let counts = SymptomCounts::tally(window);
    let reply = model
        .generate(&GenerateRequest::new(insights_prompt(&counts)))
        .await?;
    tracing::info!(model = model.name(), entries = window.len(), "health insights requested");
    Ok(reply.trim().to_string())
}
