//! MCP `log_entry` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use flowfriend::tracking::types::{parse_observation_time, NewEntry};

/// Parameters for the `log_entry` MCP tool. Omitted dimensions are stored as
/// `not_recorded`.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct LogEntryParams {
    #[schemars(
        description = "Flow: 'none', 'light_spotting', 'moderate', 'heavy', 'extra_heavy'"
    )]
    pub flow: Option<String>,

    #[schemars(
        description = "Mood: 'super_sad', 'only_okay', 'comfy_cozy', 'super_duper', 'extra_angry'"
    )]
    pub mood: Option<String>,

    #[schemars(
        description = "Pain: 'none', 'back_pain', 'stomach_cramps', 'pelvic_pain', 'headaches'"
    )]
    pub pain: Option<String>,

    #[schemars(
        description = "Sleep: 'no_battery', 'still_sleepy', 'decent', 'feeling_good', 'fully_powered'"
    )]
    pub sleep: Option<String>,

    #[schemars(description = "Day the entry applies to (YYYY-MM-DD or RFC 3339). Defaults to now.")]
    pub date: Option<String>,
}

impl LogEntryParams {
    /// Strict conversion: unknown values are rejected rather than dropped.
    pub fn to_new_entry(&self) -> Result<NewEntry, String> {
        let mut entry = NewEntry::manual();
        if let Some(flow) = &self.flow {
            entry.flow = flow.trim().parse()?;
        }
        if let Some(mood) = &self.mood {
            entry.mood = mood.trim().parse()?;
        }
        if let Some(pain) = &self.pain {
            entry.pain = pain.trim().parse()?;
        }
        if let Some(sleep) = &self.sleep {
            entry.sleep = sleep.trim().parse()?;
        }
        if let Some(date) = &self.date {
            entry.recorded_at =
                Some(parse_observation_time(date).ok_or_else(|| format!("invalid date: {date}"))?);
        }
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowfriend::tracking::types::{Flow, Mood, Pain, Sleep, Source};

    #[test]
    fn omitted_fields_are_not_recorded() {
        let params = LogEntryParams {
            flow: Some("moderate".into()),
            ..Default::default()
        };
        let entry = params.to_new_entry().unwrap();
        assert_eq!(entry.flow, Flow::Moderate);
        assert_eq!(entry.mood, Mood::NotRecorded);
        assert_eq!(entry.pain, Pain::NotRecorded);
        assert_eq!(entry.sleep, Sleep::NotRecorded);
        assert_eq!(entry.source, Source::Manual);
        assert!(entry.recorded_at.is_none());
    }

    #[test]
    fn rejects_unknown_values_and_dates() {
        let params = LogEntryParams {
            mood: Some("grumpy".into()),
            ..Default::default()
        };
        assert_eq!(params.to_new_entry().unwrap_err(), "unknown mood value: grumpy");

        let params = LogEntryParams {
            date: Some("last tuesday".into()),
            ..Default::default()
        };
        assert_eq!(params.to_new_entry().unwrap_err(), "invalid date: last tuesday");
    }
}
