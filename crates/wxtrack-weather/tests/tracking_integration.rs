//! Integration tests for LocationTracker on a file-backed SQLite store.
//!
//! These tests drive the tracker with a manual clock so retention and
//! refresh windows can be crossed without waiting.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use wxtrack_weather::{
    LocationClient, LocationRepository, LocationTracker, ManualClock, SqliteLocationStore,
};

fn start() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 1, 6, 0, 0).unwrap()
}

fn sqlite_tracker(dir: &tempfile::TempDir) -> (LocationTracker, Arc<ManualClock>) {
    let store = SqliteLocationStore::new(dir.path().join("locations.db")).unwrap();
    let clock = Arc::new(ManualClock::new(start()));
    let tracker = LocationTracker::new(Arc::new(store)).with_clock(clock.clone());
    (tracker, clock)
}

#[test]
fn test_cape_town_scenario_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let (tracker, clock) = sqlite_tracker(&dir);

    for _ in 0..3 {
        tracker.track_location("Cape Town", "ZA").unwrap();
    }
    let record = tracker.find_location("cape town", "za").unwrap().unwrap();
    assert_eq!(record.request_count, 3);
    assert!(record.is_active);

    clock.advance(Duration::days(31));
    assert_eq!(tracker.deactivate_old_locations().unwrap(), 1);
    assert!(tracker.active_locations().unwrap().is_empty());

    let record = tracker.track_location("Cape Town", "za").unwrap();
    assert!(record.is_active);
    assert_eq!(record.request_count, 4);
}

#[test]
fn test_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let (tracker, _) = sqlite_tracker(&dir);
        tracker.track_location("Messina South", "ZA").unwrap();
        tracker.track_location("Durban", "ZA").unwrap();
    }

    let store = SqliteLocationStore::new(dir.path().join("locations.db")).unwrap();
    assert_eq!(store.count().unwrap(), 2);

    let tracker = LocationTracker::new(Arc::new(store));
    let messina = tracker.find_location("messina", "za").unwrap().unwrap();
    assert_eq!(messina.request_count, 1);
    assert_eq!(messina.last_request_at, start());
    assert_eq!(tracker.location_string(&messina), "messina,za");
    assert_eq!(tracker.cache_key(&messina), "weather_messina_za_3_yes");
}

#[test]
fn test_sweep_leaves_recent_records_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (tracker, clock) = sqlite_tracker(&dir);

    tracker.track_location("Old Town", "ZA").unwrap();
    clock.advance(Duration::days(25));
    let recent = tracker.track_location("New Town", "ZA").unwrap();
    clock.advance(Duration::days(6));

    assert_eq!(tracker.deactivate_old_locations().unwrap(), 1);

    let after = tracker.find_location("New Town", "ZA").unwrap().unwrap();
    assert_eq!(after, recent);

    let old = tracker.find_location("Old Town", "ZA").unwrap().unwrap();
    assert!(!old.is_active);
    assert_eq!(old.request_count, 1);
}

#[test]
fn test_concurrent_tracks_do_not_lose_counts() {
    let dir = tempfile::tempdir().unwrap();
    let (tracker, _) = sqlite_tracker(&dir);
    let tracker = Arc::new(tracker);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let tracker = tracker.clone();
            std::thread::spawn(move || {
                let city = if i % 2 == 0 { "Durban" } else { " DURBAN " };
                for _ in 0..25 {
                    tracker.track_location(city, "za").unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let record = tracker.find_location("durban", "za").unwrap().unwrap();
    assert_eq!(record.request_count, 200);
}

#[test]
fn test_record_serializes_with_snake_case_fields() {
    let dir = tempfile::tempdir().unwrap();
    let (tracker, _) = sqlite_tracker(&dir);
    let record = tracker.track_location("George", "ZA").unwrap();

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["city_name"], "george");
    assert_eq!(json["country_code"], "za");
    assert_eq!(json["request_count"], 1);
    assert!(json["last_fetched_at"].is_null());
}

#[tokio::test]
async fn test_async_client_fetch_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let (tracker, clock) = sqlite_tracker(&dir);
    let client = LocationClient::new(tracker);

    let durban = client.track_location("Durban", "ZA").await.unwrap();
    client.track_location("George", "ZA").await.unwrap();

    let refresh = Duration::hours(3);
    assert_eq!(client.locations_due_for_fetch(refresh).await.unwrap().len(), 2);

    let fetched = client.mark_as_fetched(&durban).await.unwrap();
    assert_eq!(fetched.last_fetched_at, Some(start()));

    let due = client.locations_due_for_fetch(refresh).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].city_name, "george");

    clock.advance(Duration::days(40));
    assert_eq!(client.deactivate_old_locations().await.unwrap(), 2);
    assert!(client.active_locations().await.unwrap().is_empty());
    assert!(client.locations_due_for_fetch(refresh).await.unwrap().is_empty());

    let found = client.find_location("durban", "za").await.unwrap().unwrap();
    assert!(!found.is_active);
    assert_eq!(client.tracker().location_string(&found), "durban,za");
}
