//! Demo month of entries for trying the screens without a device.
//!
//! Twenty-four days out of the last thirty, two heavy spells (days 30-26 and
//! 10-7 ago) and plenty of partially recorded days.

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use rusqlite::Connection;

use crate::tracking::identity;
use crate::tracking::store::append_entry;
use crate::tracking::types::{Flow, Mood, NewEntry, Pain, Sleep};
use crate::tracking::types::{Flow as F, Mood as M, Pain as P, Sleep as S};

/// Identity the demo data is written to unless another is given.
pub const DEMO_USER_ID: &str = "testUser123";

struct SeedDay {
    days_ago: i64,
    flow: Flow,
    mood: Mood,
    pain: Pain,
    sleep: Sleep,
}

const fn day(days_ago: i64, flow: Flow, mood: Mood, pain: Pain, sleep: Sleep) -> SeedDay {
    SeedDay {
        days_ago,
        flow,
        mood,
        pain,
        sleep,
    }
}

const DEMO_MONTH: &[SeedDay] = &[
    day(30, F::Heavy, M::NotRecorded, P::NotRecorded, S::NotRecorded),
    day(29, F::Heavy, M::NotRecorded, P::NotRecorded, S::NoBattery),
    day(28, F::Moderate, M::SuperSad, P::StomachCramps, S::NotRecorded),
    day(27, F::Moderate, M::NotRecorded, P::NotRecorded, S::StillSleepy),
    day(26, F::LightSpotting, M::OnlyOkay, P::NotRecorded, S::NotRecorded),
    day(24, F::None, M::NotRecorded, P::NotRecorded, S::Decent),
    day(23, F::NotRecorded, M::ComfyCozy, P::NotRecorded, S::FeelingGood),
    day(22, F::NotRecorded, M::SuperDuper, P::NotRecorded, S::NotRecorded),
    day(19, F::None, M::NotRecorded, P::NotRecorded, S::FullyPowered),
    day(18, F::NotRecorded, M::SuperDuper, P::None, S::NotRecorded),
    day(17, F::NotRecorded, M::NotRecorded, P::NotRecorded, S::FeelingGood),
    day(16, F::NotRecorded, M::ComfyCozy, P::NotRecorded, S::NotRecorded),
    day(14, F::None, M::NotRecorded, P::Headaches, S::NotRecorded),
    day(13, F::NotRecorded, M::ExtraAngry, P::NotRecorded, S::StillSleepy),
    day(12, F::NotRecorded, M::NotRecorded, P::BackPain, S::NoBattery),
    day(10, F::LightSpotting, M::NotRecorded, P::NotRecorded, S::NotRecorded),
    day(9, F::Heavy, M::SuperSad, P::StomachCramps, S::NoBattery),
    day(8, F::Heavy, M::NotRecorded, P::PelvicPain, S::NotRecorded),
    day(7, F::Moderate, M::NotRecorded, P::NotRecorded, S::StillSleepy),
    day(6, F::NotRecorded, M::OnlyOkay, P::NotRecorded, S::NotRecorded),
    day(4, F::None, M::NotRecorded, P::NotRecorded, S::Decent),
    day(3, F::NotRecorded, M::ComfyCozy, P::NotRecorded, S::NotRecorded),
    day(2, F::NotRecorded, M::NotRecorded, P::NotRecorded, S::FeelingGood),
    day(1, F::NotRecorded, M::SuperDuper, P::NotRecorded, S::NotRecorded),
];

/// Number of entries [`seed_demo_month`] writes.
pub fn demo_len() -> usize {
    DEMO_MONTH.len()
}

/// Append the demo month for `user_id`, dated relative to `today` (each entry
/// at midnight UTC). Runs in one transaction. Returns the number written.
pub fn seed_demo_month(conn: &mut Connection, user_id: &str, today: NaiveDate) -> Result<usize> {
    let tx = conn.transaction()?;
    identity::ensure_user(&tx, user_id)?;

    for seed in DEMO_MONTH {
        let date = today - Duration::days(seed.days_ago);
        let entry = NewEntry {
            flow: seed.flow,
            mood: seed.mood,
            pain: seed.pain,
            sleep: seed.sleep,
            recorded_at: date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc()),
            ..NewEntry::manual()
        };
        append_entry(&tx, user_id, &entry)?;
    }

    tx.commit()?;
    tracing::info!(user = %user_id, count = DEMO_MONTH.len(), "seeded demo month");
    Ok(DEMO_MONTH.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::tracking::store::recent_entries;
    use crate::tracking::types::Source;

    #[test]
    fn seeds_24_manual_entries_newest_first() {
        let mut conn = db::open_memory_database().unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();

        assert_eq!(seed_demo_month(&mut conn, DEMO_USER_ID, today).unwrap(), 24);

        let entries = recent_entries(&conn, DEMO_USER_ID, 100).unwrap();
        assert_eq!(entries.len(), demo_len());
        assert!(entries.iter().all(|e| e.source == Source::Manual));
        assert_eq!(entries[0].date(), NaiveDate::from_ymd_opt(2024, 6, 29).unwrap());
        assert_eq!(entries[0].mood, Mood::SuperDuper);
        assert_eq!(entries[23].date(), NaiveDate::from_ymd_opt(2024, 5, 31).unwrap());
        assert_eq!(entries[23].flow, Flow::Heavy);
    }
}
