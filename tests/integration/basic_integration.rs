/// Basic integration tests
use habit_streaks::*;
use tempfile::{NamedTempFile, TempDir};

use crate::support::{day, tracker_on};

#[cfg(test)]
mod basic_integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_database_persistence() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");

        let habit_id = {
            let tracker = tracker_on(SqliteStore::open(temp_file.path()).expect("Failed to open store"));
            let habit = tracker.add_habit(NewHabit::named("Stretch")).await.unwrap();
            tracker.toggle(&habit.id, day(9)).await.unwrap();
            tracker.toggle(&habit.id, day(10)).await.unwrap();
            habit.id
        };

        // Reopen the same file
        let tracker = tracker_on(SqliteStore::open(temp_file.path()).expect("Failed to reopen store"));
        let habit = tracker.habit(&habit_id).await.unwrap();
        assert_eq!(habit.name, "Stretch");
        assert_eq!(habit.streak(), Streak { current_streak: 2, longest_streak: 2 });

        let history = tracker
            .list_completions(&habit_id, DateRange::between(day(10), day(10)).unwrap())
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].date, day(10));
    }

    #[tokio::test]
    async fn test_edit_persists_all_fields() {
        let tracker = tracker_on(SqliteStore::in_memory().unwrap());
        let habit = tracker
            .add_habit(NewHabit::named("Vitamins").with_description("With breakfast"))
            .await
            .unwrap();

        let reminder = parse_time_of_day("08:15").unwrap();
        tracker
            .edit_habit(
                &habit.id,
                vec![
                    HabitChange::Description(None),
                    HabitChange::Frequency(Frequency::Custom),
                    HabitChange::Reminder { enabled: true, time: Some(reminder) },
                ],
            )
            .await
            .unwrap();

        let stored = tracker.habit(&habit.id).await.unwrap();
        assert_eq!(stored.description, None);
        assert_eq!(stored.frequency, Frequency::Custom);
        assert!(stored.reminder_enabled);
        assert_eq!(stored.reminder_time, Some(reminder));
        assert!(stored.updated_at >= stored.created_at);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_completions() {
        let tracker = tracker_on(SqliteStore::in_memory().unwrap());
        let keep = tracker.add_habit(NewHabit::named("Keep")).await.unwrap();
        let gone = tracker.add_habit(NewHabit::named("Drop")).await.unwrap();
        tracker.toggle(&keep.id, day(10)).await.unwrap();
        tracker.toggle(&gone.id, day(10)).await.unwrap();

        tracker.delete_habit(&gone.id).await.unwrap();

        let err = tracker.list_completions(&gone.id, DateRange::all()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let backup = tracker.export().await.unwrap();
        assert_eq!(backup.habits.len(), 1);
        assert_eq!(backup.completions.len(), 1);
        assert_eq!(backup.completions[0].habit_id, keep.id);
    }

    #[tokio::test]
    async fn test_export_import_between_databases() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let export_path = dir.path().join("habits-export.json");

        let source = tracker_on(SqliteStore::open(dir.path().join("source.db")).unwrap());
        let a = source.add_habit(NewHabit::named("Run")).await.unwrap();
        let b = source.add_habit(NewHabit::named("Read")).await.unwrap();
        for d in [6, 7, 8, 10] {
            source.toggle(&a.id, day(d)).await.unwrap();
        }
        source.toggle(&b.id, day(9)).await.unwrap();
        source.set_theme(ThemeMode::Dark, "teal").await.unwrap();
        source.export_to_file(&export_path).await.unwrap();

        let target = tracker_on(SqliteStore::open(dir.path().join("target.db")).unwrap());
        target.add_habit(NewHabit::named("Replaced")).await.unwrap();
        let imported = target.import_from_file(&export_path).await.unwrap();

        let mut names: Vec<_> = imported.iter().map(|h| h.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["Read", "Run"]);
        assert_eq!(
            target.habit(&a.id).await.unwrap().streak(),
            Streak { current_streak: 1, longest_streak: 3 }
        );
        assert_eq!(target.theme().await.unwrap().theme_color, "teal");
        assert_eq!(
            target.dashboard_stats().await.unwrap(),
            source.dashboard_stats().await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_import_rejects_invalid_document() {
        let tracker = tracker_on(SqliteStore::in_memory().unwrap());
        let habit = tracker.add_habit(NewHabit::named("Stay")).await.unwrap();

        let orphan = format!(
            r#"{{"habits": [], "completions": [{{"id": "{}", "habitId": "{}", "date": "2024-06-10", "createdAt": "2024-06-10T08:00:00Z"}}]}}"#,
            CompletionId::new(),
            habit.id
        );
        let err = tracker.import_json(&orphan).await.unwrap_err();
        assert!(matches!(err, TrackerError::InvalidBackup(_)));

        assert_eq!(tracker.habits().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dashboard_stats() {
        let tracker = tracker_on(SqliteStore::in_memory().unwrap());
        let a = tracker.add_habit(NewHabit::named("A")).await.unwrap();
        let b = tracker.add_habit(NewHabit::named("B")).await.unwrap();
        for d in [8, 9, 10] {
            tracker.toggle(&a.id, day(d)).await.unwrap();
        }
        tracker.toggle(&b.id, day(10)).await.unwrap();

        let stats = tracker.dashboard_stats().await.unwrap();
        assert_eq!(stats.habit_count, 2);
        assert_eq!(stats.total_completions, 4);
        assert_eq!(stats.average_current_streak, 2);
        assert_eq!(stats.best_longest_streak, 3);
        assert!((stats.completion_rate - 4.0 / 730.0 * 100.0).abs() < 1e-9);

        let per_habit = tracker.habit_stats(&b.id).await.unwrap();
        assert_eq!(per_habit.total_completions, 1);
        assert!((per_habit.completion_rate - 100.0 / 365.0).abs() < 1e-9);
    }
}
