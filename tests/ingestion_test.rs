mod helpers;

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use flowfriend::device::{self, DeviceData, DeviceFeed};
use flowfriend::tracking::{EntrySource, Flow, Mood, Pain, Sleep, Source};

fn full_reading() -> DeviceData {
    DeviceData {
        flow: Some("heavy".into()),
        mood: Some("extra_angry".into()),
        pain: Some("pelvic_pain".into()),
        sleep: Some("still_sleepy".into()),
        timestamp: Some("2024-05-02T07:15:00Z".into()),
    }
}

fn flow_only(flow: &str) -> DeviceData {
    DeviceData {
        flow: Some(flow.into()),
        ..DeviceData::default()
    }
}

#[tokio::test]
async fn full_update_is_mirrored_field_for_field() {
    let (store, user) = helpers::test_store();
    let feed = DeviceFeed::new();
    let mut changes = store.changes();
    let _listener = device::listen(&feed, Arc::new(store.clone()), user.clone());

    feed.publish(full_reading());
    helpers::next_change(&mut changes).await;

    let entries = store.recent(&user, 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.flow, Flow::Heavy);
    assert_eq!(entry.mood, Mood::ExtraAngry);
    assert_eq!(entry.pain, Pain::PelvicPain);
    assert_eq!(entry.sleep, Sleep::StillSleepy);
    assert_eq!(entry.source, Source::Device);
    assert_eq!(entry.recorded_at, Utc.with_ymd_and_hms(2024, 5, 2, 7, 15, 0).unwrap());
    assert_eq!(entry.device_timestamp.as_deref(), Some("2024-05-02T07:15:00Z"));
}

#[tokio::test]
async fn absent_fields_become_not_recorded() {
    let (store, user) = helpers::test_store();
    let feed = DeviceFeed::new();
    let mut changes = store.changes();
    let _listener = device::listen(&feed, Arc::new(store.clone()), user.clone());

    feed.publish(flow_only("light_spotting"));
    helpers::next_change(&mut changes).await;

    let entry = store.recent(&user, 1).await.unwrap().remove(0);
    assert_eq!(entry.flow, Flow::LightSpotting);
    assert_eq!(entry.mood, Mood::NotRecorded);
    assert_eq!(entry.pain, Pain::NotRecorded);
    assert_eq!(entry.sleep, Sleep::NotRecorded);
    assert_eq!(entry.device_timestamp, None);
}

#[tokio::test]
async fn value_present_before_listening_is_not_written() {
    let (store, user) = helpers::test_store();
    let feed = DeviceFeed::new();
    feed.publish(flow_only("heavy"));

    let mut changes = store.changes();
    let _listener = device::listen(&feed, Arc::new(store.clone()), user.clone());

    feed.publish(flow_only("moderate"));
    helpers::next_change(&mut changes).await;

    let entries = store.recent(&user, 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].flow, Flow::Moderate);
}

#[tokio::test]
async fn unchanged_value_writes_nothing_but_a_return_to_it_does() {
    let (store, user) = helpers::test_store();
    let feed = DeviceFeed::new();
    let mut changes = store.changes();
    let _listener = device::listen(&feed, Arc::new(store.clone()), user.clone());

    feed.publish(flow_only("heavy"));
    helpers::next_change(&mut changes).await;

    assert!(!feed.publish(flow_only("heavy")));

    feed.publish(flow_only("moderate"));
    helpers::next_change(&mut changes).await;
    feed.publish(flow_only("heavy"));
    helpers::next_change(&mut changes).await;

    let flows: Vec<Flow> = store.recent(&user, 10).await.unwrap().iter().map(|e| e.flow).collect();
    assert_eq!(flows.len(), 3);
    assert_eq!(flows.iter().filter(|f| **f == Flow::Heavy).count(), 2);
}

#[tokio::test]
async fn cancelled_listener_stops_writing() {
    let (store, user) = helpers::test_store();
    let feed = DeviceFeed::new();
    let mut changes = store.changes();
    let listener = device::listen(&feed, Arc::new(store.clone()), user.clone());

    feed.publish(flow_only("heavy"));
    helpers::next_change(&mut changes).await;

    listener.cancel();
    feed.publish(flow_only("moderate"));

    let late = tokio::time::timeout(Duration::from_millis(200), changes.recv()).await;
    assert!(late.is_err(), "listener wrote after cancel");
    assert_eq!(store.count(&user).await.unwrap(), 1);
}

#[tokio::test]
async fn listeners_for_two_users_each_get_a_copy() {
    let (store, alice) = helpers::test_store();
    let bob = helpers::add_user(&store).await;
    let feed = DeviceFeed::new();
    let mut changes = store.changes();
    let _a = device::listen(&feed, Arc::new(store.clone()), alice.clone());
    let _b = device::listen(&feed, Arc::new(store.clone()), bob.clone());

    feed.publish(full_reading());
    helpers::next_change(&mut changes).await;
    helpers::next_change(&mut changes).await;

    assert_eq!(store.count(&alice).await.unwrap(), 1);
    assert_eq!(store.count(&bob).await.unwrap(), 1);
}

#[tokio::test]
async fn write_failures_do_not_stop_the_listener() {
    let (store, _) = helpers::test_store();
    let feed = DeviceFeed::new();
    let listener = device::listen(&feed, Arc::new(store.clone()), "no-such-user");

    feed.publish(flow_only("heavy"));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(listener.is_active());
}
