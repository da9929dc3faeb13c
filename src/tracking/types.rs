//! Tracking type definitions.
//!
//! The four tracked dimensions ([`Flow`], [`Mood`], [`Pain`], [`Sleep`]) are
//! closed enumerations with an explicit `NotRecorded` variant, so an entry
//! never carries a missing field. [`Entry`] is a stored record, [`NewEntry`]
//! is the write-side shape, and [`User`] is an anonymous identity's profile.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Generates a tracked dimension enum with its storage string, display label
/// and grid glyph.
macro_rules! tracked_dimension {
    (
        $(#[$meta:meta])*
        $name:ident, $noun:literal {
            $($variant:ident => ($value:literal, $label:literal, $glyph:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant,)+
            #[default]
            NotRecorded,
        }

        impl $name {
            /// Every variant, `NotRecorded` last.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+ Self::NotRecorded];

            /// SQL-compatible string representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value,)+
                    Self::NotRecorded => "not_recorded",
                }
            }

            /// Human-readable label for legends.
            pub fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                    Self::NotRecorded => "No Data",
                }
            }

            /// Single-character marker for tracker grids.
            pub fn glyph(&self) -> &'static str {
                match self {
                    $(Self::$variant => $glyph,)+
                    Self::NotRecorded => "?",
                }
            }

            pub fn is_recorded(&self) -> bool {
                !matches!(self, Self::NotRecorded)
            }

            /// Lenient parse for free-form feed values: absent, blank or
            /// unrecognized input becomes `NotRecorded`.
            pub fn from_feed(value: Option<&str>) -> Self {
                let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
                    return Self::NotRecorded;
                };
                raw.parse().unwrap_or_else(|_| {
                    tracing::warn!(value = raw, dimension = $noun, "unrecognized feed value");
                    Self::NotRecorded
                })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok(Self::$variant),)+
                    "not_recorded" => Ok(Self::NotRecorded),
                    _ => Err(format!(concat!("unknown ", $noun, " value: {}"), s)),
                }
            }
        }
    };
}

tracked_dimension! {
    /// Menstrual flow intensity.
    Flow, "flow" {
        None => ("none", "None", "○"),
        LightSpotting => ("light_spotting", "Light Spotting", "·"),
        Moderate => ("moderate", "Moderate", "•"),
        Heavy => ("heavy", "Heavy", "●"),
        ExtraHeavy => ("extra_heavy", "Extra Heavy", "◉"),
    }
}

tracked_dimension! {
    /// Self-reported mood.
    Mood, "mood" {
        SuperSad => ("super_sad", "Super Sad", "v"),
        OnlyOkay => ("only_okay", "Only Okay", "-"),
        ComfyCozy => ("comfy_cozy", "Comfy Cozy", "~"),
        SuperDuper => ("super_duper", "Super Duper", "*"),
        ExtraAngry => ("extra_angry", "Extra Angry", "#"),
    }
}

tracked_dimension! {
    /// Pain location, if any.
    Pain, "pain" {
        None => ("none", "None", "○"),
        BackPain => ("back_pain", "Back Pain", "↑"),
        StomachCramps => ("stomach_cramps", "Cramps", "~"),
        PelvicPain => ("pelvic_pain", "Pelvic Pain", "◇"),
        Headaches => ("headaches", "Headaches", "!"),
    }
}

tracked_dimension! {
    /// Sleep quality, expressed as a battery level.
    Sleep, "sleep" {
        NoBattery => ("no_battery", "No Battery", "0"),
        StillSleepy => ("still_sleepy", "Still Sleepy", "1"),
        Decent => ("decent", "Decent", "2"),
        FeelingGood => ("feeling_good", "Feeling Good", "3"),
        FullyPowered => ("fully_powered", "Fully Powered", "4"),
    }
}

impl Flow {
    /// True for a recorded flow other than `none`: the entries that mark
    /// period days.
    pub fn has_flow(&self) -> bool {
        self.is_recorded() && *self != Self::None
    }
}

/// Parse an observation time: an RFC 3339 instant, or a bare `YYYY-MM-DD`
/// date taken as midnight UTC.
pub fn parse_observation_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Where an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Mirrored from the sensor feed.
    Device,
    /// Logged by hand (CLI, MCP tool, or seed data).
    Manual,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "device" => Ok(Self::Device),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("unknown source: {s}")),
        }
    }
}

/// A stored entry, matching the `entries` table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    pub user_id: String,
    pub flow: Flow,
    pub mood: Mood,
    pub pain: Pain,
    pub sleep: Sleep,
    /// When the observation applies. Stamped by the store unless supplied.
    pub recorded_at: DateTime<Utc>,
    pub source: Source,
    /// Raw timestamp string from the device feed, if any.
    pub device_timestamp: Option<String>,
    /// When the store accepted the write.
    pub created_at: DateTime<Utc>,
}

impl Entry {
    /// Calendar date of the observation.
    pub fn date(&self) -> NaiveDate {
        self.recorded_at.date_naive()
    }
}

/// The write-side shape of an entry. Every dimension defaults to
/// `NotRecorded`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub flow: Flow,
    pub mood: Mood,
    pub pain: Pain,
    pub sleep: Sleep,
    /// `None` lets the store stamp the current time.
    pub recorded_at: Option<DateTime<Utc>>,
    pub source: Source,
    pub device_timestamp: Option<String>,
}

impl NewEntry {
    pub fn manual() -> Self {
        Self {
            flow: Flow::NotRecorded,
            mood: Mood::NotRecorded,
            pain: Pain::NotRecorded,
            sleep: Sleep::NotRecorded,
            recorded_at: None,
            source: Source::Manual,
            device_timestamp: None,
        }
    }
}

/// An anonymous identity and its profile, matching the `users` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub avg_cycle_length: u32,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_strings_round_trip_through_from_str() {
        for flow in Flow::ALL {
            assert_eq!(flow.as_str().parse::<Flow>().unwrap(), *flow);
        }
        for pain in Pain::ALL {
            assert_eq!(pain.as_str().parse::<Pain>().unwrap(), *pain);
        }
    }

    #[test]
    fn strict_parse_rejects_unknown_values() {
        let err = "gushing".parse::<Flow>().unwrap_err();
        assert_eq!(err, "unknown flow value: gushing");
        assert!("grumpy".parse::<Mood>().is_err());
    }

    #[test]
    fn feed_parse_normalizes_missing_and_unknown() {
        assert_eq!(Flow::from_feed(None), Flow::NotRecorded);
        assert_eq!(Flow::from_feed(Some("")), Flow::NotRecorded);
        assert_eq!(Flow::from_feed(Some("  ")), Flow::NotRecorded);
        assert_eq!(Sleep::from_feed(Some("overcharged")), Sleep::NotRecorded);
        assert_eq!(Sleep::from_feed(Some(" decent ")), Sleep::Decent);
    }

    #[test]
    fn has_flow_excludes_none_and_not_recorded() {
        assert!(!Flow::None.has_flow());
        assert!(!Flow::NotRecorded.has_flow());
        assert!(Flow::LightSpotting.has_flow());
        assert!(Flow::ExtraHeavy.has_flow());
    }

    #[test]
    fn serde_uses_storage_strings() {
        let json = serde_json::to_string(&Pain::StomachCramps).unwrap();
        assert_eq!(json, "\"stomach_cramps\"");
        let mood: Mood = serde_json::from_str("\"comfy_cozy\"").unwrap();
        assert_eq!(mood, Mood::ComfyCozy);
        assert_eq!(Mood::default(), Mood::NotRecorded);
    }

    #[test]
    fn pain_labels_match_legend() {
        assert_eq!(Pain::StomachCramps.label(), "Cramps");
        assert_eq!(Pain::NotRecorded.label(), "No Data");
        assert_eq!(Pain::NotRecorded.glyph(), "?");
    }

    #[test]
    fn parses_rfc3339_and_bare_dates() {
        use chrono::TimeZone;
        assert_eq!(
            parse_observation_time("2024-03-01T08:30:00+02:00"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 6, 30, 0).unwrap())
        );
        assert_eq!(
            parse_observation_time(" 2024-03-01 "),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_observation_time("yesterday-ish"), None);
    }
}
