//! Next-cycle prediction.
//!
//! Summarizes recent flow history into a prompt, asks the model for a single
//! JSON object and parses it into a [`CyclePrediction`]. A reply that does not
//! parse is "no prediction", never an error. No retry happens here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::advisory::cycle::{average_cycle_length, flow_entries, flow_gaps};
use crate::llm::{GenerateRequest, LanguageModel, LlmError};
use crate::tracking::types::Entry;

/// Entries considered, newest first. Roughly three months of daily logs.
pub const PREDICTION_WINDOW: usize = 90;

/// Flow entries quoted verbatim in the prompt.
const RECENT_FLOW_SAMPLES: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CyclePrediction {
    pub next_period_date: NaiveDate,
    pub cycle_length: u32,
    /// In `[0, 1]`.
    pub confidence: f64,
    #[serde(default)]
    pub notes: String,
}

impl CyclePrediction {
    /// Whole days from `today` to the predicted start; negative once passed.
    pub fn days_until(&self, today: NaiveDate) -> i64 {
        days_until(self.next_period_date, today)
    }

    pub fn confidence_percent(&self) -> u32 {
        (self.confidence * 100.0).round() as u32
    }
}

pub fn days_until(date: NaiveDate, today: NaiveDate) -> i64 {
    (date - today).num_days()
}

/// Build the prediction prompt from entries already windowed, newest first.
pub fn prediction_prompt(entries: &[Entry], today: NaiveDate) -> String {
    let flow = flow_entries(entries);
    let gaps = flow_gaps(&flow);
    let average = average_cycle_length(&gaps);

    let recent: Vec<_> = flow
        .iter()
        .take(RECENT_FLOW_SAMPLES)
        .map(|e| json!({ "date": e.date().to_string(), "flow": e.flow.as_str() }))
        .collect();
    let recent = serde_json::Value::Array(recent).to_string();
    let gaps = serde_json::to_string(&gaps).unwrap_or_else(|_| "[]".into());

    format!(
        r#"You are a menstrual health assistant. Based on the following cycle tracking data, predict the next menstrual period start date and provide a confidence score.

Data Analysis:
- Recent flow data (last 6 periods): {recent}
- Calculated cycle lengths (in days): {gaps}
- Average cycle length: {average} days
- Total data points analyzed: {total}

Today's date: {today}

Please respond in valid JSON format with EXACTLY this structure (no markdown, no code blocks):
{{
  "nextPeriodDate": "YYYY-MM-DD",
  "cycleLength": 28,
  "confidence": 0.85,
  "notes": "Brief explanation of the prediction"
}}

Only return the JSON object, nothing else."#,
        total = entries.len(),
        today = today.format("%Y-%m-%d"),
    )
}

/// Remove markdown code-fence markers (`` ```json `` and `` ``` ``, each with
/// an optional trailing newline) and surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}

/// Parse a model reply. `None` for anything that is not a well-formed
/// prediction.
pub fn parse_prediction(raw: &str) -> Option<CyclePrediction> {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<CyclePrediction>(cleaned) {
        Ok(prediction) if (0.0..=1.0).contains(&prediction.confidence) => Some(prediction),
        Ok(prediction) => {
            tracing::warn!(
                confidence = prediction.confidence,
                "prediction confidence out of range"
            );
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "unparseable prediction reply");
            None
        }
    }
}

/// Predict the next period from `entries` (newest first). Only the first
/// [`PREDICTION_WINDOW`] entries are used.
///
/// `Ok(None)` means the model answered but not with a usable prediction; a
/// failed model call is an error.
pub async fn predict_next_cycle(
    model: &dyn LanguageModel,
    entries: &[Entry],
    today: NaiveDate,
) -> Result<Option<CyclePrediction>, LlmError> {
    let window = &entries[..entries.len().min(PREDICTION_WINDOW)];
    let request = GenerateRequest::new(prediction_prompt(window, today)).json();

    let reply = model.generate(&request).await?;
    let prediction = parse_prediction(&reply);
    tracing::info!(
        model = model.name(),
        entries = window.len(),
        predicted = prediction.is_some(),
        "cycle prediction requested"
    );
    Ok(prediction)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{"nextPeriodDate":"2024-03-25","cycleLength":28,"confidence":0.8,"notes":"Regular."}"#;

    #[test]
    fn fenced_reply_parses_like_bare_reply() {
        let fenced = format!("```json\n{BODY}\n```");
        assert_eq!(parse_prediction(&fenced), parse_prediction(BODY));
        assert!(parse_prediction(&fenced).is_some());

        let plain_fence = format!("```\n{BODY}\n```\n");
        assert_eq!(parse_prediction(&plain_fence), parse_prediction(BODY));
    }

    #[test]
    fn malformed_reply_is_no_prediction() {
        assert_eq!(parse_prediction("I think around the 25th?"), None);
        assert_eq!(parse_prediction(r#"{"nextPeriodDate":"soon"}"#), None);
        assert_eq!(
            parse_prediction(r#"{"nextPeriodDate":"2024-03-25","cycleLength":28,"confidence":1.7,"notes":""}"#),
            None
        );
    }

    #[test]
    fn days_until_counts_calendar_days() {
        let prediction = parse_prediction(BODY).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        assert_eq!(prediction.days_until(today), 5);
        assert_eq!(prediction.confidence_percent(), 80);
        assert_eq!(days_until(today, prediction.next_period_date), -5);
    }

    #[test]
    fn prompt_without_history_uses_default_average() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let prompt = prediction_prompt(&[], today);
        assert!(prompt.contains("Recent flow data (last 6 periods): []"));
        assert!(prompt.contains("Average cycle length: 28 days"));
        assert!(prompt.contains("Total data points analyzed: 0"));
        assert!(prompt.contains("Today's date: 2024-03-20"));
        assert!(prompt.contains(r#""nextPeriodDate": "YYYY-MM-DD","#));
    }
}
