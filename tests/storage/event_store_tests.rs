//! EventStore interface tests.
//!
//! These tests verify the contract of the EventStore trait.
//! Each storage implementation should run these tests.
//!
//! Implementations may share one database across all functions, so every
//! test works in its own calendar year.

use chrono::{DateTime, TimeZone, Utc};

use calendar::storage::{Event, EventId, EventStore, NewEvent, StorageError};
use calendar::utils::cancel::CancelToken;

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

pub fn make_event(title: &str, time: DateTime<Utc>) -> NewEvent {
    NewEvent {
        client_id: 1,
        title: title.to_string(),
        time,
    }
}

fn titles(events: &[Event]) -> Vec<&str> {
    events.iter().map(|e| e.title.as_str()).collect()
}

async fn create<S: EventStore>(store: &S, title: &str, time: DateTime<Utc>) -> EventId {
    store
        .create_event(&CancelToken::new(), make_event(title, time))
        .await
        .expect("create should succeed")
}

// =============================================================================
// create_event
// =============================================================================

pub async fn test_create_assigns_increasing_ids<S: EventStore>(store: &S) {
    let first = create(store, "first", at(2001, 1, 10, 9, 0, 0)).await;
    let second = create(store, "second", at(2001, 1, 10, 10, 0, 0)).await;
    let third = create(store, "third", at(2001, 1, 10, 11, 0, 0)).await;

    assert!(first < second && second < third, "{first} {second} {third}");

    let events = store
        .get_day_events(&CancelToken::new(), at(2001, 1, 10, 0, 0, 0))
        .await
        .unwrap();
    assert_eq!(
        events.iter().map(|e| e.id).collect::<Vec<_>>(),
        vec![first, second, third]
    );
}

pub async fn test_created_event_round_trips<S: EventStore>(store: &S) {
    let time = at(2001, 6, 15, 13, 45, 59);
    let id = store
        .create_event(
            &CancelToken::new(),
            NewEvent {
                client_id: 42,
                title: "dentist".to_string(),
                time,
            },
        )
        .await
        .unwrap();

    let events = store
        .get_day_events(&CancelToken::new(), at(2001, 6, 15, 0, 0, 0))
        .await
        .unwrap();
    assert_eq!(
        events,
        vec![Event {
            id,
            client_id: 42,
            title: "dentist".to_string(),
            time,
        }]
    );
}

// =============================================================================
// Range queries
// =============================================================================

pub async fn test_day_window<S: EventStore>(store: &S) {
    create(store, "before", at(2002, 3, 9, 23, 59, 59)).await;
    create(store, "start", at(2002, 3, 10, 0, 0, 0)).await;
    create(store, "end", at(2002, 3, 10, 23, 59, 59)).await;
    create(store, "after", at(2002, 3, 11, 0, 0, 0)).await;

    let events = store
        .get_day_events(&CancelToken::new(), at(2002, 3, 10, 12, 0, 0))
        .await
        .unwrap();
    assert_eq!(titles(&events), vec!["start", "end"]);
}

pub async fn test_week_window<S: EventStore>(store: &S) {
    // 2003-04-14 is a Monday.
    create(store, "prev sunday", at(2003, 4, 13, 23, 59, 59)).await;
    create(store, "monday", at(2003, 4, 14, 0, 0, 0)).await;
    create(store, "sunday", at(2003, 4, 20, 23, 59, 59)).await;
    create(store, "next monday", at(2003, 4, 21, 0, 0, 0)).await;

    let events = store
        .get_week_events(&CancelToken::new(), at(2003, 4, 16, 8, 0, 0))
        .await
        .unwrap();
    assert_eq!(titles(&events), vec!["monday", "sunday"]);
}

pub async fn test_week_window_stops_at_month_end<S: EventStore>(store: &S) {
    // Week of Monday 2003-04-28 runs into May; May days are not returned.
    create(store, "april monday", at(2003, 4, 28, 9, 0, 0)).await;
    create(store, "april wednesday", at(2003, 4, 30, 9, 0, 0)).await;
    create(store, "may thursday", at(2003, 5, 1, 9, 0, 0)).await;

    let events = store
        .get_week_events(&CancelToken::new(), at(2003, 4, 30, 0, 0, 0))
        .await
        .unwrap();
    assert_eq!(titles(&events), vec!["april monday", "april wednesday"]);

    let events = store
        .get_week_events(&CancelToken::new(), at(2003, 5, 1, 0, 0, 0))
        .await
        .unwrap();
    assert_eq!(titles(&events), vec!["may thursday"]);
}

pub async fn test_week_window_at_year_start<S: EventStore>(store: &S) {
    // 2010-01-01 (Friday) and 2010-01-03 (Sunday) are in ISO week 53 of 2009,
    // 2010-01-04 starts week 1.
    create(store, "dec 31", at(2009, 12, 31, 12, 0, 0)).await;
    create(store, "jan 1", at(2010, 1, 1, 12, 0, 0)).await;
    create(store, "jan 3", at(2010, 1, 3, 12, 0, 0)).await;
    create(store, "jan 4", at(2010, 1, 4, 12, 0, 0)).await;

    let events = store
        .get_week_events(&CancelToken::new(), at(2010, 1, 1, 0, 0, 0))
        .await
        .unwrap();
    assert_eq!(titles(&events), vec!["jan 1", "jan 3"]);
}

pub async fn test_month_window<S: EventStore>(store: &S) {
    create(store, "jan 31", at(2004, 1, 31, 23, 59, 59)).await;
    create(store, "feb 1", at(2004, 2, 1, 0, 0, 0)).await;
    create(store, "feb 29", at(2004, 2, 29, 23, 59, 59)).await;
    create(store, "mar 1", at(2004, 3, 1, 0, 0, 0)).await;
    create(store, "feb 1 next year", at(2005, 2, 1, 0, 0, 0)).await;

    let events = store
        .get_month_events(&CancelToken::new(), at(2004, 2, 15, 0, 0, 0))
        .await
        .unwrap();
    assert_eq!(titles(&events), vec!["feb 1", "feb 29"]);
}

pub async fn test_windows_nest<S: EventStore>(store: &S) {
    create(store, "a", at(2011, 7, 4, 9, 0, 0)).await;
    create(store, "b", at(2011, 7, 6, 9, 0, 0)).await;
    create(store, "c", at(2011, 7, 20, 9, 0, 0)).await;

    let token = CancelToken::new();
    let query = at(2011, 7, 4, 18, 0, 0);
    let day = store.get_day_events(&token, query).await.unwrap();
    let week = store.get_week_events(&token, query).await.unwrap();
    let month = store.get_month_events(&token, query).await.unwrap();

    assert_eq!(titles(&day), vec!["a"]);
    assert_eq!(titles(&week), vec!["a", "b"]);
    assert_eq!(titles(&month), vec!["a", "b", "c"]);
}

pub async fn test_empty_range<S: EventStore>(store: &S) {
    let events = store
        .get_month_events(&CancelToken::new(), at(1999, 9, 9, 0, 0, 0))
        .await
        .unwrap();
    assert!(events.is_empty());
}

// =============================================================================
// update_event / remove_event
// =============================================================================

pub async fn test_update_moves_event<S: EventStore>(store: &S) {
    let id = create(store, "draft", at(2012, 1, 5, 9, 0, 0)).await;

    store
        .update_event(
            &CancelToken::new(),
            Event {
                id,
                client_id: 9,
                title: "final".to_string(),
                time: at(2012, 3, 5, 9, 0, 0),
            },
        )
        .await
        .unwrap();

    let token = CancelToken::new();
    let january = store.get_month_events(&token, at(2012, 1, 1, 0, 0, 0)).await.unwrap();
    assert!(january.is_empty());

    let march = store.get_month_events(&token, at(2012, 3, 1, 0, 0, 0)).await.unwrap();
    assert_eq!(march.len(), 1);
    assert_eq!(march[0].id, id);
    assert_eq!(march[0].client_id, 9);
    assert_eq!(march[0].title, "final");
    assert_eq!(march[0].time, at(2012, 3, 5, 9, 0, 0));
}

pub async fn test_update_missing_is_not_found<S: EventStore>(store: &S) {
    let missing = 987_654_321;
    let result = store
        .update_event(
            &CancelToken::new(),
            Event {
                id: missing,
                client_id: 1,
                title: "ghost".to_string(),
                time: at(2013, 1, 1, 0, 0, 0),
            },
        )
        .await;
    assert!(matches!(result, Err(StorageError::NotFound { id }) if id == missing));

    let events = store
        .get_month_events(&CancelToken::new(), at(2013, 1, 1, 0, 0, 0))
        .await
        .unwrap();
    assert!(events.is_empty(), "failed update must not insert");
}

pub async fn test_remove_event<S: EventStore>(store: &S) {
    let keep = create(store, "keep", at(2014, 5, 5, 9, 0, 0)).await;
    let drop = create(store, "drop", at(2014, 5, 6, 9, 0, 0)).await;

    store.remove_event(&CancelToken::new(), drop).await.unwrap();

    let events = store
        .get_month_events(&CancelToken::new(), at(2014, 5, 1, 0, 0, 0))
        .await
        .unwrap();
    assert_eq!(events.iter().map(|e| e.id).collect::<Vec<_>>(), vec![keep]);

    let again = store.remove_event(&CancelToken::new(), drop).await;
    assert!(matches!(again, Err(StorageError::NotFound { id }) if id == drop));
}

pub async fn test_remove_missing_is_not_found<S: EventStore>(store: &S) {
    let result = store.remove_event(&CancelToken::new(), 987_654_322).await;
    assert!(matches!(result, Err(StorageError::NotFound { id: 987_654_322 })));
}

pub async fn test_ids_not_reused_after_remove<S: EventStore>(store: &S) {
    let first = create(store, "first", at(2015, 2, 2, 9, 0, 0)).await;
    store.remove_event(&CancelToken::new(), first).await.unwrap();
    let second = create(store, "second", at(2015, 2, 2, 9, 0, 0)).await;

    assert!(second > first, "{second} should follow {first}");
}

// =============================================================================
// Cancellation
// =============================================================================

pub async fn test_cancelled_token_is_honoured<S: EventStore>(store: &S) {
    let id = create(store, "untouched", at(2016, 8, 8, 9, 0, 0)).await;

    let cancelled = CancelToken::new();
    cancelled.cancel();
    let query = at(2016, 8, 8, 0, 0, 0);

    let result = store
        .create_event(&cancelled, make_event("late", at(2016, 8, 8, 10, 0, 0)))
        .await;
    assert!(matches!(result, Err(StorageError::Cancelled { .. })));

    let result = store
        .update_event(
            &cancelled,
            Event {
                id,
                client_id: 1,
                title: "changed".to_string(),
                time: at(2016, 8, 8, 9, 0, 0),
            },
        )
        .await;
    assert!(matches!(result, Err(StorageError::Cancelled { .. })));

    let result = store.remove_event(&cancelled, id).await;
    assert!(matches!(result, Err(StorageError::Cancelled { .. })));

    for result in [
        store.get_day_events(&cancelled, query).await,
        store.get_week_events(&cancelled, query).await,
        store.get_month_events(&cancelled, query).await,
    ] {
        assert!(
            matches!(result, Err(StorageError::Cancelled { ref partial }) if partial.is_empty()),
            "{result:?}"
        );
    }

    let events = store
        .get_day_events(&CancelToken::new(), query)
        .await
        .unwrap();
    assert_eq!(titles(&events), vec!["untouched"]);
}

/// Cancelling while creates are in flight never leaves a stored event behind
/// a `Cancelled` result: every row in the table was reported as created.
pub async fn test_cancel_during_create_keeps_results_honest<S: EventStore>(store: &S) {
    const ATTEMPTS: u64 = 200;
    let day = at(2017, 1, 17, 0, 0, 0);

    let mut created = Vec::new();
    for i in 0..ATTEMPTS {
        let token = CancelToken::new();
        let canceller = token.clone();
        let timer = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_micros(i * 25));
            canceller.cancel();
        });

        match store
            .create_event(&token, make_event(&format!("racing {i}"), day))
            .await
        {
            Ok(id) => created.push(id),
            Err(StorageError::Cancelled { partial }) => assert!(partial.is_empty()),
            Err(e) => panic!("unexpected error: {e}"),
        }
        timer.join().unwrap();
    }

    let stored = store
        .get_month_events(&CancelToken::new(), day)
        .await
        .unwrap();
    let mut stored_ids: Vec<EventId> = stored.iter().map(|e| e.id).collect();
    stored_ids.sort_unstable();
    created.sort_unstable();
    assert_eq!(stored_ids, created);
}

/// Run all EventStore tests against a store implementation.
#[macro_export]
macro_rules! run_event_store_tests {
    ($store:expr) => {
        use $crate::storage::event_store_tests::*;

        // create tests
        test_create_assigns_increasing_ids($store).await;
        println!("  test_create_assigns_increasing_ids: PASSED");

        test_created_event_round_trips($store).await;
        println!("  test_created_event_round_trips: PASSED");

        // range tests
        test_day_window($store).await;
        println!("  test_day_window: PASSED");

        test_week_window($store).await;
        println!("  test_week_window: PASSED");

        test_week_window_stops_at_month_end($store).await;
        println!("  test_week_window_stops_at_month_end: PASSED");

        test_week_window_at_year_start($store).await;
        println!("  test_week_window_at_year_start: PASSED");

        test_month_window($store).await;
        println!("  test_month_window: PASSED");

        test_windows_nest($store).await;
        println!("  test_windows_nest: PASSED");

        test_empty_range($store).await;
        println!("  test_empty_range: PASSED");

        // update/remove tests
        test_update_moves_event($store).await;
        println!("  test_update_moves_event: PASSED");

        test_update_missing_is_not_found($store).await;
        println!("  test_update_missing_is_not_found: PASSED");

        test_remove_event($store).await;
        println!("  test_remove_event: PASSED");

        test_remove_missing_is_not_found($store).await;
        println!("  test_remove_missing_is_not_found: PASSED");

        test_ids_not_reused_after_remove($store).await;
        println!("  test_ids_not_reused_after_remove: PASSED");

        // cancellation tests
        test_cancelled_token_is_honoured($store).await;
        println!("  test_cancelled_token_is_honoured: PASSED");

        test_cancel_during_create_keeps_results_honest($store).await;
        println!("  test_cancel_during_create_keeps_results_honest: PASSED");
    };
}
