/// Export and import of the whole store

use std::path::Path;

use tracing::info;

use crate::backup::Backup;
use crate::clock::Clock;
use crate::domain::Habit;
use crate::storage::HabitStore;
use crate::tracker::HabitTracker;
use crate::TrackerResult;

impl<S: HabitStore, C: Clock> HabitTracker<S, C> {
    pub async fn export(&self) -> TrackerResult<Backup> {
        Ok(self.store.export_all().await?)
    }

    /// Pretty-printed export document
    pub async fn export_json(&self) -> TrackerResult<String> {
        Ok(self.export().await?.to_json_pretty()?)
    }

    pub async fn export_to_file(&self, path: &Path) -> TrackerResult<()> {
        let json = self.export_json().await?;
        tokio::fs::write(path, json).await?;
        info!("Exported data to {}", path.display());
        Ok(())
    }

    /// Replace all habits and completions with `backup`
    ///
    /// Cached streaks in the document are not trusted; every habit is
    /// recalculated from the imported completions.
    pub async fn import(&self, backup: Backup) -> TrackerResult<Vec<Habit>> {
        backup.validate()?;
        self.store.replace_all(&backup).await?;
        info!(
            "Imported {} habit(s) and {} completion(s)",
            backup.habits.len(),
            backup.completions.len()
        );
        self.recalculate_all().await
    }

    pub async fn import_json(&self, json: &str) -> TrackerResult<Vec<Habit>> {
        let backup = Backup::from_json(json)?;
        self.import(backup).await
    }

    pub async fn import_from_file(&self, path: &Path) -> TrackerResult<Vec<Habit>> {
        let json = tokio::fs::read_to_string(path).await?;
        self.import_json(&json).await
    }
}
