/// Toggle orchestration against both stores, including failure handling
use std::sync::Arc;

use crate::support::{day, tracker_on, FlakyStore};
use habit_streaks::*;
use tokio::sync::Notify;
use tempfile::NamedTempFile;
use tokio_test::{assert_err, assert_ok};

async fn toggle_scenario<S: HabitStore>(tracker: HabitTracker<S, FixedClock>) {
    let habit = tracker.add_habit(NewHabit::named("Floss")).await.unwrap();
    assert_eq!((habit.current_streak, habit.longest_streak), (0, 0));

    let habit = tracker.toggle_completion(&habit.id, day(10)).await.unwrap();
    assert_eq!((habit.current_streak, habit.longest_streak), (1, 1));
    assert!(tracker.is_completed(&habit.id, day(10)).await.unwrap());

    let habit = tracker.toggle_completion(&habit.id, day(10)).await.unwrap();
    assert_eq!((habit.current_streak, habit.longest_streak), (0, 0));
    assert!(!tracker.is_completed(&habit.id, day(10)).await.unwrap());
}

#[tokio::test]
async fn test_toggle_flow_memory() {
    toggle_scenario(tracker_on(MemoryStore::new())).await;
}

#[tokio::test]
async fn test_toggle_flow_sqlite() {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let store = SqliteStore::open(temp_file.path()).expect("Failed to open store");
    toggle_scenario(tracker_on(store)).await;
}

#[tokio::test]
async fn test_double_toggle_is_identity() {
    let tracker = tracker_on(MemoryStore::new());
    let habit = tracker.add_habit(NewHabit::named("Read")).await.unwrap();
    for d in [3, 4, 5, 8, 9] {
        tracker.toggle(&habit.id, day(d)).await.unwrap();
    }
    let before = tracker.habit(&habit.id).await.unwrap();
    let history = tracker.list_completions(&habit.id, DateRange::all()).await.unwrap();

    for d in [4, 10] {
        tracker.toggle(&habit.id, day(d)).await.unwrap();
        let after = tracker.toggle_completion(&habit.id, day(d)).await.unwrap();

        assert_eq!(after.streak(), before.streak());
        let dates: Vec<_> = tracker
            .list_completions(&habit.id, DateRange::all())
            .await
            .unwrap()
            .iter()
            .map(|c| c.date)
            .collect();
        assert_eq!(dates, history.iter().map(|c| c.date).collect::<Vec<_>>());
    }
    assert_eq!(before.streak(), Streak { current_streak: 2, longest_streak: 3 });
}

#[tokio::test]
async fn test_toggle_today_uses_clock() {
    let tracker = tracker_on(MemoryStore::new());
    let habit = tracker.add_habit(NewHabit::named("Walk")).await.unwrap();

    let habit = tracker.toggle_today(&habit.id).await.unwrap();
    assert_eq!(habit.current_streak, 1);
    assert!(tracker.is_completed(&habit.id, day(10)).await.unwrap());
}

#[tokio::test]
async fn test_failed_refresh_rolls_back_added_completion() {
    let tracker = tracker_on(FlakyStore::new());
    let habit = tracker.add_habit(NewHabit::named("Yoga")).await.unwrap();

    FlakyStore::set(&tracker.store().fail_update, true);
    let err = assert_err!(tracker.toggle(&habit.id, day(10)).await);
    assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    assert!(matches!(err, TrackerError::Storage(_)));

    // No completion without a matching streak
    assert!(!tracker.is_completed(&habit.id, day(10)).await.unwrap());
    assert_eq!(tracker.habit(&habit.id).await.unwrap().current_streak, 0);
}

#[tokio::test]
async fn test_failed_refresh_rolls_back_removed_completion() {
    let tracker = tracker_on(FlakyStore::new());
    let habit = tracker.add_habit(NewHabit::named("Yoga")).await.unwrap();
    assert_ok!(tracker.toggle(&habit.id, day(10)).await);

    FlakyStore::set(&tracker.store().fail_update, true);
    assert_err!(tracker.toggle(&habit.id, day(10)).await);

    assert!(tracker.is_completed(&habit.id, day(10)).await.unwrap());
    assert_eq!(tracker.habit(&habit.id).await.unwrap().current_streak, 1);
}

#[tokio::test]
async fn test_failed_rollback_is_reported_and_recoverable() {
    let tracker = tracker_on(FlakyStore::new());
    let habit = tracker.add_habit(NewHabit::named("Yoga")).await.unwrap();

    FlakyStore::set(&tracker.store().fail_update, true);
    FlakyStore::set(&tracker.store().fail_remove, true);
    let err = assert_err!(tracker.toggle(&habit.id, day(9)).await);
    assert!(matches!(err, TrackerError::RollbackFailed { .. }));
    assert_eq!(err.kind(), ErrorKind::StoreUnavailable);

    FlakyStore::set(&tracker.store().fail_update, false);
    FlakyStore::set(&tracker.store().fail_remove, false);

    // The stray completion stays; recalculation brings the cache in line
    let habit = tracker.recalculate_streaks(&habit.id).await.unwrap();
    assert!(tracker.is_completed(&habit.id, day(9)).await.unwrap());
    assert_eq!(habit.streak(), Streak { current_streak: 1, longest_streak: 1 });
}

#[tokio::test]
async fn test_failed_insert_leaves_no_trace() {
    let tracker = tracker_on(FlakyStore::new());
    let habit = tracker.add_habit(NewHabit::named("Yoga")).await.unwrap();

    FlakyStore::set(&tracker.store().fail_add, true);
    let err = assert_err!(tracker.toggle(&habit.id, day(10)).await);
    assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    assert!(!tracker.is_completed(&habit.id, day(10)).await.unwrap());
}

async fn uniqueness_scenario<S: HabitStore>(store: S) {
    let habit = store.create_habit(&NewHabit::named("Once a day")).await.unwrap();

    assert_ok!(store.add_completion(&habit.id, day(10)).await);
    let err = assert_err!(store.add_completion(&habit.id, day(10)).await);
    assert_eq!(err.kind(), ErrorKind::Duplicate);

    let completions = store.list_completions(&habit.id, DateRange::all()).await.unwrap();
    assert_eq!(completions.len(), 1);
}

#[tokio::test]
async fn test_uniqueness_memory_store() {
    uniqueness_scenario(MemoryStore::new()).await;
}

#[tokio::test]
async fn test_uniqueness_sqlite_store() {
    uniqueness_scenario(SqliteStore::in_memory().unwrap()).await;
}

#[tokio::test]
async fn test_concurrent_toggles_of_different_habits() {
    let tracker = tracker_on(SqliteStore::in_memory().unwrap());
    let a = tracker.add_habit(NewHabit::named("A")).await.unwrap();
    let b = tracker.add_habit(NewHabit::named("B")).await.unwrap();

    let (ra, rb) = tokio::join!(
        tracker.toggle(&a.id, day(10)),
        tracker.toggle(&b.id, day(10))
    );
    assert_eq!(ra.unwrap().habit.current_streak, 1);
    assert_eq!(rb.unwrap().habit.current_streak, 1);

    let (ra, rb) = tokio::join!(
        tracker.toggle(&a.id, day(9)),
        tracker.toggle(&b.id, day(10))
    );
    assert_eq!(ra.unwrap().habit.streak(), Streak { current_streak: 2, longest_streak: 2 });
    assert_eq!(rb.unwrap().habit.streak(), Streak::default());
}

#[tokio::test]
async fn test_concurrent_toggles_of_one_habit_keep_streaks_current() {
    let gate = Arc::new(Notify::new());
    let tracker = tracker_on(FlakyStore::gated_reads(gate.clone()));
    let habit = tracker.add_habit(NewHabit::named("Journal")).await.unwrap();

    // The first toggle stalls holding the history it read for its streak
    // refresh; the second one is started before it is let go.
    let (today, yesterday, _) = tokio::join!(
        tracker.toggle(&habit.id, day(10)),
        tracker.toggle(&habit.id, day(9)),
        async { gate.notify_one() }
    );
    assert_ok!(today);
    let yesterday = assert_ok!(yesterday);

    let stored = tracker.habit(&habit.id).await.unwrap();
    let history = tracker.list_completions(&habit.id, DateRange::all()).await.unwrap();
    assert_eq!(stored.streak(), Streak::from_completions(&history, day(10)));
    assert_eq!(stored.streak(), Streak { current_streak: 2, longest_streak: 2 });
    assert_eq!(yesterday.habit.streak(), stored.streak());
}
