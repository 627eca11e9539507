/// SQLite implementation of the habit store
///
/// This module provides the embedded, file-backed store. It handles all SQL
/// queries and data conversion; the connection sits behind a mutex so that
/// writes from concurrent toggles are serialized.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::backup::Backup;
use crate::domain::{
    parse_time_of_day, Color, Completion, CompletionId, DateRange, Frequency, Habit, HabitChange,
    HabitId, NewHabit, ThemeMode, ThemePreference,
};
use crate::storage::{migrations, HabitStore, StorageError, StorageResult};

const HABIT_COLUMNS: &str = "id, name, description, frequency, color, target, reminder_enabled, \
     reminder_time, current_streak, longest_streak, created_at, updated_at";

const COMPLETION_COLUMNS: &str = "id, habit_id, date, created_at";

/// Extended result code for a violated UNIQUE constraint
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;

/// SQLite-based storage implementation
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    ///
    /// This opens the database file and runs any necessary migrations
    /// to ensure the schema is up to date.
    pub fn open(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path = db_path.as_ref();
        let conn = Connection::open(db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;

        let store = Self::with_connection(conn)?;
        tracing::info!("SQLite store initialized at: {:?}", db_path);
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(mut conn: Connection) -> StorageResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON")
            .map_err(|e| StorageError::Connection(format!("Failed to enable foreign keys: {}", e)))?;

        migrations::initialize_database(&mut conn)?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("database connection lock poisoned".to_string()))
    }
}

// Row conversion helpers

fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error<E>(index: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

fn parse_timestamp(row: &Row<'_>, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(index)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(index, e))
}

fn habit_from_row(row: &Row<'_>) -> rusqlite::Result<Habit> {
    let id = HabitId::from_string(&row.get::<_, String>(0)?).map_err(|e| conversion_error(0, e))?;
    let frequency = row
        .get::<_, String>(3)?
        .parse::<Frequency>()
        .map_err(|e| conversion_error(3, e))?;
    let color = Color::parse(&row.get::<_, String>(4)?).map_err(|e| conversion_error(4, e))?;
    let reminder_time = row
        .get::<_, Option<String>>(7)?
        .map(|raw| parse_time_of_day(&raw))
        .transpose()
        .map_err(|e| conversion_error(7, e))?;

    Ok(Habit {
        id,
        name: row.get(1)?,
        description: row.get(2)?,
        frequency,
        color,
        target: row.get(5)?,
        reminder_enabled: row.get(6)?,
        reminder_time,
        current_streak: row.get(8)?,
        longest_streak: row.get(9)?,
        created_at: parse_timestamp(row, 10)?,
        updated_at: parse_timestamp(row, 11)?,
    })
}

fn completion_from_row(row: &Row<'_>) -> rusqlite::Result<Completion> {
    Ok(Completion {
        id: CompletionId::from_string(&row.get::<_, String>(0)?).map_err(|e| conversion_error(0, e))?,
        habit_id: HabitId::from_string(&row.get::<_, String>(1)?).map_err(|e| conversion_error(1, e))?,
        date: row.get::<_, NaiveDate>(2)?,
        created_at: parse_timestamp(row, 3)?,
    })
}

fn load_habit(conn: &Connection, habit_id: &HabitId) -> StorageResult<Habit> {
    conn.query_row(
        &format!("SELECT {} FROM habits WHERE id = ?1", HABIT_COLUMNS),
        params![habit_id.to_string()],
        habit_from_row,
    )
    .optional()?
    .ok_or_else(|| StorageError::habit_not_found(habit_id))
}

fn habit_exists(conn: &Connection, habit_id: &HabitId) -> StorageResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM habits WHERE id = ?1",
            params![habit_id.to_string()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn insert_habit(conn: &Connection, habit: &Habit) -> StorageResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO habits ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            HABIT_COLUMNS
        ),
        params![
            habit.id.to_string(),
            habit.name,
            habit.description,
            habit.frequency.as_str(),
            habit.color.as_str(),
            habit.target,
            habit.reminder_enabled,
            habit.reminder_time.map(|t| t.format("%H:%M").to_string()),
            habit.current_streak,
            habit.longest_streak,
            timestamp(&habit.created_at),
            timestamp(&habit.updated_at),
        ],
    )?;
    Ok(())
}

fn insert_completion(conn: &Connection, completion: &Completion) -> StorageResult<()> {
    let result = conn.execute(
        &format!("INSERT INTO habit_completions ({}) VALUES (?1, ?2, ?3, ?4)", COMPLETION_COLUMNS),
        params![
            completion.id.to_string(),
            completion.habit_id.to_string(),
            completion.date,
            timestamp(&completion.created_at),
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _)) if err.extended_code == SQLITE_CONSTRAINT_UNIQUE => {
            Err(StorageError::DuplicateCompletion {
                habit_id: completion.habit_id.to_string(),
                date: completion.date,
            })
        }
        Err(e) => Err(StorageError::Query(e)),
    }
}

fn insert_theme_preference(conn: &Connection, preference: &ThemePreference) -> StorageResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO theme_preferences (id, theme_mode, theme_color, updated_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            preference.id,
            preference.theme_mode.as_str(),
            preference.theme_color,
            timestamp(&preference.updated_at),
        ],
    )?;
    Ok(())
}

fn select_theme_preferences(conn: &Connection) -> StorageResult<Vec<ThemePreference>> {
    let mut stmt = conn.prepare(
        "SELECT id, theme_mode, theme_color, updated_at FROM theme_preferences ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| {
        let raw_mode: String = row.get(1)?;
        let theme_mode = ThemeMode::parse(&raw_mode).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(1, format!("Invalid theme mode '{}'", raw_mode), Type::Text)
        })?;
        Ok(ThemePreference {
            id: row.get(0)?,
            theme_mode,
            theme_color: row.get(2)?,
            updated_at: parse_timestamp(row, 3)?,
        })
    })?;

    let preferences = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(preferences)
}

#[async_trait]
impl HabitStore for SqliteStore {
    async fn create_habit(&self, new: &NewHabit) -> StorageResult<Habit> {
        let habit = Habit::from_new(HabitId::new(), new, Utc::now());

        let conn = self.lock()?;
        insert_habit(&conn, &habit)?;

        tracing::debug!("Created habit: {} ({})", habit.name, habit.id);
        Ok(habit)
    }

    async fn get_habit(&self, habit_id: &HabitId) -> StorageResult<Habit> {
        let conn = self.lock()?;
        load_habit(&conn, habit_id)
    }

    async fn list_habits(&self) -> StorageResult<Vec<Habit>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM habits ORDER BY created_at ASC, rowid ASC",
            HABIT_COLUMNS
        ))?;
        let habits = stmt
            .query_map([], habit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(habits)
    }

    async fn update_habit(
        &self,
        habit_id: &HabitId,
        changes: &[HabitChange],
    ) -> StorageResult<Habit> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut habit = load_habit(&tx, habit_id)?;
        for change in changes {
            habit.apply(change);
        }
        habit.updated_at = Utc::now();

        tx.execute(
            "UPDATE habits SET
                name = ?2,
                description = ?3,
                frequency = ?4,
                color = ?5,
                target = ?6,
                reminder_enabled = ?7,
                reminder_time = ?8,
                current_streak = ?9,
                longest_streak = ?10,
                updated_at = ?11
             WHERE id = ?1",
            params![
                habit.id.to_string(),
                habit.name,
                habit.description,
                habit.frequency.as_str(),
                habit.color.as_str(),
                habit.target,
                habit.reminder_enabled,
                habit.reminder_time.map(|t| t.format("%H:%M").to_string()),
                habit.current_streak,
                habit.longest_streak,
                timestamp(&habit.updated_at),
            ],
        )?;
        tx.commit()?;

        tracing::debug!("Updated habit: {} ({})", habit.name, habit.id);
        Ok(habit)
    }

    async fn delete_habit(&self, habit_id: &HabitId) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let removed_completions = tx.execute(
            "DELETE FROM habit_completions WHERE habit_id = ?1",
            params![habit_id.to_string()],
        )?;
        let rows_affected = tx.execute("DELETE FROM habits WHERE id = ?1", params![habit_id.to_string()])?;

        if rows_affected == 0 {
            return Err(StorageError::habit_not_found(habit_id));
        }
        tx.commit()?;

        tracing::debug!(
            "Deleted habit {} and {} completion(s)",
            habit_id,
            removed_completions
        );
        Ok(())
    }

    async fn has_completion(&self, habit_id: &HabitId, date: NaiveDate) -> StorageResult<bool> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM habit_completions WHERE habit_id = ?1 AND date = ?2",
                params![habit_id.to_string(), date],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    async fn find_completion(
        &self,
        habit_id: &HabitId,
        date: NaiveDate,
    ) -> StorageResult<Option<Completion>> {
        let conn = self.lock()?;
        let completion = conn
            .query_row(
                &format!(
                    "SELECT {} FROM habit_completions WHERE habit_id = ?1 AND date = ?2",
                    COMPLETION_COLUMNS
                ),
                params![habit_id.to_string(), date],
                completion_from_row,
            )
            .optional()?;
        Ok(completion)
    }

    async fn add_completion(
        &self,
        habit_id: &HabitId,
        date: NaiveDate,
    ) -> StorageResult<Completion> {
        let conn = self.lock()?;
        if !habit_exists(&conn, habit_id)? {
            return Err(StorageError::habit_not_found(habit_id));
        }

        let completion = Completion::new(habit_id.clone(), date);
        insert_completion(&conn, &completion)?;

        tracing::debug!("Created completion {} for habit {} on {}", completion.id, habit_id, date);
        Ok(completion)
    }

    async fn remove_completion(&self, completion_id: &CompletionId) -> StorageResult<()> {
        let conn = self.lock()?;
        let rows_affected = conn.execute(
            "DELETE FROM habit_completions WHERE id = ?1",
            params![completion_id.to_string()],
        )?;

        if rows_affected == 0 {
            return Err(StorageError::CompletionNotFound {
                completion_id: completion_id.to_string(),
            });
        }

        tracing::debug!("Removed completion {}", completion_id);
        Ok(())
    }

    async fn list_completions(
        &self,
        habit_id: &HabitId,
        range: DateRange,
    ) -> StorageResult<Vec<Completion>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM habit_completions
             WHERE habit_id = ?1
               AND (?2 IS NULL OR date >= ?2)
               AND (?3 IS NULL OR date <= ?3)
             ORDER BY date ASC",
            COMPLETION_COLUMNS
        ))?;
        let completions = stmt
            .query_map(params![habit_id.to_string(), range.from, range.to], completion_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(completions)
    }

    async fn theme_preference(&self) -> StorageResult<Option<ThemePreference>> {
        let conn = self.lock()?;
        Ok(select_theme_preferences(&conn)?.into_iter().next())
    }

    async fn save_theme_preference(&self, preference: &ThemePreference) -> StorageResult<()> {
        let conn = self.lock()?;
        insert_theme_preference(&conn, preference)?;
        tracing::debug!(
            "Saved theme preference: {} / {}",
            preference.theme_mode.as_str(),
            preference.theme_color
        );
        Ok(())
    }

    async fn export_all(&self) -> StorageResult<Backup> {
        let conn = self.lock()?;

        let habits = conn
            .prepare(&format!(
                "SELECT {} FROM habits ORDER BY created_at ASC, rowid ASC",
                HABIT_COLUMNS
            ))?
            .query_map([], habit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let completions = conn
            .prepare(&format!(
                "SELECT {} FROM habit_completions ORDER BY habit_id ASC, date ASC",
                COMPLETION_COLUMNS
            ))?
            .query_map([], completion_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let settings = select_theme_preferences(&conn)?;

        Ok(Backup { habits, completions, settings })
    }

    async fn replace_all(&self, backup: &Backup) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM habit_completions", [])?;
        tx.execute("DELETE FROM habits", [])?;

        for habit in &backup.habits {
            insert_habit(&tx, habit)?;
        }
        for completion in &backup.completions {
            insert_completion(&tx, completion)?;
        }

        if !backup.settings.is_empty() {
            tx.execute("DELETE FROM theme_preferences", [])?;
            for preference in &backup.settings {
                insert_theme_preference(&tx, preference)?;
            }
        }

        tx.commit()?;

        tracing::info!(
            "Replaced store contents: {} habit(s), {} completion(s)",
            backup.habits.len(),
            backup.completions.len()
        );
        Ok(())
    }
}
