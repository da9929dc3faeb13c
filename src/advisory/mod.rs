//! Model-backed advice over a user's entries: next-cycle prediction and
//! wellness insights.

pub mod cycle;
pub mod insights;
pub mod prediction;

use chrono::NaiveDate;

use crate::llm::{LanguageModel, LlmError};
use crate::tracking::types::Entry;

pub use insights::{health_insights, SymptomCounts};
pub use prediction::{predict_next_cycle, CyclePrediction};

/// Everything the prediction screen shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Advice {
    pub prediction: Option<CyclePrediction>,
    pub insights: String,
}

/// Request the prediction and the insights concurrently. Either call failing
/// fails the pair.
pub async fn advise(
    model: &dyn LanguageModel,
    entries: &[Entry],
    today: NaiveDate,
) -> Result<Advice, LlmError> {
    let (prediction, insights) = tokio::try_join!(
        predict_next_cycle(model, entries, today),
        health_insights(model, entries),
    )?;
    Ok(Advice { prediction, insights })
}
