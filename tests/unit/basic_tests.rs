/// Basic unit tests for domain types exposed by the crate
use habit_streaks::*;

#[cfg(test)]
mod basic_unit_tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_new_habit_validation() {
        assert!(NewHabit::named("Drink water").validate().is_ok());

        let blank = NewHabit::named("  ").validate().unwrap_err();
        assert!(matches!(blank, DomainError::InvalidHabitName(_)));

        let too_long = NewHabit::named("x".repeat(101)).validate();
        assert!(too_long.is_err());

        assert!(NewHabit::named("Push-ups").with_target(0).validate().is_err());
        assert!(NewHabit::named("Push-ups").with_target(10_000).validate().is_ok());
    }

    #[test]
    fn test_new_habit_defaults_from_json() {
        let new: NewHabit = serde_json::from_str(r##"{"name": "Journal"}"##).unwrap();
        assert_eq!(new.frequency, Frequency::Daily);
        assert_eq!(new.target, 1);
        assert_eq!(new.color, Color::default());
        assert!(!new.reminder_enabled);
    }

    #[test]
    fn test_reminder_serialized_as_hh_mm() {
        let time = parse_time_of_day("07:30").unwrap();
        let habit = Habit::from_new(
            HabitId::new(),
            &NewHabit::named("Wake up").with_reminder(time),
            chrono::Utc::now(),
        );

        let json = serde_json::to_value(&habit).unwrap();
        assert_eq!(json["reminderTime"], "07:30");
        assert_eq!(json["reminderEnabled"], true);
        assert_eq!(json["currentStreak"], 0);
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!(Color::parse("#ABC").unwrap().as_str(), "#abc");
        assert_eq!(Color::parse(" #4CAF50 ").unwrap().as_str(), "#4caf50");
        assert!(Color::parse("blue").is_err());
        assert!(Color::parse("#12345").is_err());
        assert!(Color::parse("#ggg").is_err());
    }

    #[test]
    fn test_frequency_parsing() {
        assert_eq!("Weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert_eq!(Frequency::Custom.to_string(), "custom");
        assert!(matches!(
            "hourly".parse::<Frequency>(),
            Err(DomainError::InvalidFrequency(_))
        ));
    }

    #[test]
    fn test_day_parsing_drops_time_of_day() {
        let expected = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        assert_eq!(parse_day("2024-06-10").unwrap(), expected);
        assert_eq!(parse_day("2024-06-10T23:15:00+02:00").unwrap(), expected);
        assert!(parse_day("10/06/2024").is_err());
        assert!(parse_day("2024-02-30").is_err());
    }

    #[test]
    fn test_date_ranges() {
        let from = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();

        let range = DateRange::between(from, to).unwrap();
        assert!(range.contains(from));
        assert!(range.contains(to));
        assert!(!range.contains(to.succ_opt().unwrap()));
        assert!(DateRange::between(to, from).is_err());

        let window = DateRange::last_days(to, 365);
        assert_eq!(window.from, NaiveDate::from_ymd_opt(2023, 6, 12));
        assert!(DateRange::all().contains(NaiveDate::MIN));
    }

    #[test]
    fn test_habit_ids() {
        let id = HabitId::new();
        let parsed: HabitId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!(HabitId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_theme_preference_defaults() {
        let preference = ThemePreference::default();
        assert_eq!(preference.id, THEME_PREFERENCE_ID);
        assert_eq!(preference.theme_mode, ThemeMode::Light);
        assert_eq!(ThemeMode::parse("DARK"), Some(ThemeMode::Dark));
        assert_eq!(ThemeMode::parse("sepia"), None);
    }

    #[test]
    fn test_error_kinds() {
        let err: TrackerError = DomainError::validation("bad").into();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err: TrackerError = StorageError::DuplicateCompletion {
            habit_id: HabitId::new().to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Duplicate);

        let err: TrackerError = StorageError::habit_not_found(&HabitId::new()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: TrackerError = StorageError::Unavailable("offline".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    }
}
