use anyhow::Result;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue, DatabaseConnection, EntityTrait};

use crate::entities::{prelude::*, settings};

const ONBOARDING_COMPLETED: &str = "onboarding_completed";
const RECENT_WORDS: &str = "recent_words";

/// How many recently played words are remembered
pub const RECENT_WORDS_LIMIT: usize = 5;

/// Key-value app settings.
///
/// The plain methods are fire-and-forget: failures are logged and the
/// caller sees a default (`false`, empty list) instead of an error. The
/// `try_` variants expose the underlying result.
#[derive(Clone)]
pub struct SettingsRepository {
    db: DatabaseConnection,
}

impl SettingsRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let model = Settings::find_by_id(key.to_string()).one(&self.db).await?;
        Ok(model.map(|m| m.value))
    }

    pub async fn set_value(&self, key: &str, value: String) -> Result<()> {
        let model = settings::ActiveModel {
            key: ActiveValue::Set(key.to_string()),
            value: ActiveValue::Set(value),
            updated_at: ActiveValue::Set(chrono::Utc::now().into()),
        };

        Settings::insert(model)
            .on_conflict(
                OnConflict::column(settings::Column::Key)
                    .update_columns([settings::Column::Value, settings::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(())
    }

    pub async fn try_is_onboarding_complete(&self) -> Result<bool> {
        Ok(self.get_value(ONBOARDING_COMPLETED).await?.as_deref() == Some("true"))
    }

    pub async fn try_get_recent_words(&self) -> Result<Vec<String>> {
        match self.get_value(RECENT_WORDS).await? {
            Some(value) => Ok(serde_json::from_str(&value)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn try_save_recent_words(&self, words: &[String]) -> Result<()> {
        let start = words.len().saturating_sub(RECENT_WORDS_LIMIT);
        let value = serde_json::to_string(&words[start..])?;
        self.set_value(RECENT_WORDS, value).await
    }

    pub async fn is_onboarding_complete(&self) -> bool {
        self.try_is_onboarding_complete().await.unwrap_or_else(|e| {
            tracing::error!("Error checking onboarding status: {}", e);
            false
        })
    }

    pub async fn set_onboarding_complete(&self) {
        if let Err(e) = self.set_value(ONBOARDING_COMPLETED, "true".to_string()).await {
            tracing::error!("Error saving onboarding status: {}", e);
        }
    }

    pub async fn get_recent_words(&self) -> Vec<String> {
        self.try_get_recent_words().await.unwrap_or_else(|e| {
            tracing::error!("Error getting recent words: {}", e);
            Vec::new()
        })
    }

    /// Store the last `RECENT_WORDS_LIMIT` entries of `words`
    pub async fn save_recent_words(&self, words: &[String]) {
        if let Err(e) = self.try_save_recent_words(words).await {
            tracing::error!("Error saving recent words: {}", e);
        }
    }

    /// Remove every stored setting
    pub async fn clear_all(&self) {
        match Settings::delete_many().exec(&self.db).await {
            Ok(result) => tracing::info!("Cleared {} settings", result.rows_affected),
            Err(e) => tracing::error!("Error clearing settings: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use migration::{Migrator, MigratorTrait};

    async fn create_test_repository() -> SettingsRepository {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        SettingsRepository::new(db)
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[tokio::test]
    async fn test_onboarding_defaults_to_incomplete() {
        let repo = create_test_repository().await;
        assert!(!repo.is_onboarding_complete().await);
    }

    #[tokio::test]
    async fn test_set_onboarding_complete() {
        let repo = create_test_repository().await;

        repo.set_onboarding_complete().await;
        assert!(repo.is_onboarding_complete().await);

        // Setting twice overwrites instead of failing on the primary key
        repo.set_onboarding_complete().await;
        assert!(repo.is_onboarding_complete().await);
    }

    #[tokio::test]
    async fn test_recent_words_round_trip() {
        let repo = create_test_repository().await;
        assert!(repo.get_recent_words().await.is_empty());

        repo.save_recent_words(&words(&["CAT", "DOG"])).await;
        assert_eq!(repo.get_recent_words().await, words(&["CAT", "DOG"]));
    }

    #[tokio::test]
    async fn test_recent_words_keep_last_five() {
        let repo = create_test_repository().await;

        repo.save_recent_words(&words(&["A", "B", "C", "D", "E", "F", "G"]))
            .await;

        assert_eq!(
            repo.get_recent_words().await,
            words(&["C", "D", "E", "F", "G"])
        );
    }

    #[tokio::test]
    async fn test_clear_all() {
        let repo = create_test_repository().await;
        repo.set_onboarding_complete().await;
        repo.save_recent_words(&words(&["CAT"])).await;

        repo.clear_all().await;

        assert!(!repo.is_onboarding_complete().await);
        assert!(repo.get_recent_words().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_recent_words_fall_back_to_empty() {
        let repo = create_test_repository().await;
        repo.set_value(RECENT_WORDS, "not json".to_string())
            .await
            .unwrap();

        assert!(repo.try_get_recent_words().await.is_err());
        assert!(repo.get_recent_words().await.is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_swallowed_without_schema() {
        let db = connect_to_memory_database().await.unwrap();
        let repo = SettingsRepository::new(db);

        repo.set_onboarding_complete().await;
        repo.save_recent_words(&words(&["CAT"])).await;

        assert!(!repo.is_onboarding_complete().await);
        assert!(repo.get_recent_words().await.is_empty());
        assert!(repo.try_is_onboarding_complete().await.is_err());
    }
}
