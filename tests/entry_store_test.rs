mod helpers;

use chrono::{TimeZone, Utc};
use flowfriend::tracking::identity;
use flowfriend::tracking::{EntrySink, EntrySource, Flow, Mood, NewEntry, Source};

fn on_day(day: u32, flow: Flow) -> NewEntry {
    NewEntry {
        flow,
        recorded_at: Some(Utc.with_ymd_and_hms(2024, 4, day, 8, 0, 0).unwrap()),
        ..NewEntry::manual()
    }
}

#[tokio::test]
async fn recent_is_newest_first_and_truncated() {
    let (store, user) = helpers::test_store();
    let seeded = [
        (3, Flow::Heavy),
        (1, Flow::LightSpotting),
        (5, Flow::None),
        (2, Flow::Moderate),
    ];
    for (day, flow) in seeded {
        store.append(&user, on_day(day, flow)).await.unwrap();
    }

    let entries = store.recent(&user, 3).await.unwrap();
    let days: Vec<u32> = entries
        .iter()
        .map(|e| e.date().format("%d").to_string().parse().unwrap())
        .collect();
    assert_eq!(days, vec![5, 3, 2]);
    assert_eq!(store.count(&user).await.unwrap(), 4);
}

#[tokio::test]
async fn users_only_see_their_own_entries() {
    let (store, alice) = helpers::test_store();
    let bob = helpers::add_user(&store).await;

    store.append(&alice, on_day(1, Flow::Heavy)).await.unwrap();
    store.append(&bob, on_day(2, Flow::Moderate)).await.unwrap();
    store.append(&bob, on_day(3, Flow::Moderate)).await.unwrap();

    assert_eq!(store.recent(&alice, 10).await.unwrap().len(), 1);
    let bobs = store.recent(&bob, 10).await.unwrap();
    assert_eq!(bobs.len(), 2);
    assert!(bobs.iter().all(|e| e.user_id == bob));
}

#[tokio::test]
async fn append_fills_unset_dimensions_and_notifies() {
    let (store, user) = helpers::test_store();
    let mut changes = store.changes();

    let entry = NewEntry {
        mood: Mood::ComfyCozy,
        ..NewEntry::manual()
    };
    let stored = store.append(&user, entry).await.unwrap();

    assert_eq!(stored.flow, Flow::NotRecorded);
    assert_eq!(stored.mood, Mood::ComfyCozy);
    assert_eq!(stored.source, Source::Manual);

    let change = helpers::next_change(&mut changes).await;
    assert_eq!(change.user_id, user);
    assert_eq!(change.entry_id, stored.id);

    let read_back = store.recent(&user, 1).await.unwrap();
    assert_eq!(read_back, vec![stored]);
}

#[tokio::test]
async fn append_for_unknown_user_fails() {
    let (store, _) = helpers::test_store();
    let err = store.append("nobody", NewEntry::manual()).await.unwrap_err();
    assert!(err.to_string().contains("nobody"));
}

#[tokio::test]
async fn profile_save_merges_fields() {
    let (store, user) = helpers::test_store();
    let id = user.clone();
    let (named, resized) = store
        .with_conn(move |conn| {
            let named = identity::save_user(conn, &id, Some("Robin"), None)?;
            let resized = identity::save_user(conn, &id, None, Some(31))?;
            Ok((named, resized))
        })
        .await
        .unwrap();

    assert_eq!(named.name.as_deref(), Some("Robin"));
    assert_eq!(named.avg_cycle_length, 28);
    assert_eq!(resized.name.as_deref(), Some("Robin"));
    assert_eq!(resized.avg_cycle_length, 31);
}
