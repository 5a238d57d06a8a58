use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::db::models::UserDoc;
use crate::wizard::history::push_recent;
use crate::wizard::session::Session;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn init(database_url: &str) -> Result<Self> {
        // An in-memory SQLite database exists per connection, so a pool of
        // several would each see an empty schema.
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            5
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_store (\
                user_id INTEGER PRIMARY KEY,\
                doc TEXT NOT NULL,\
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP\
            );",
        )
        .execute(&pool)
        .await?;

        info!("Database tables created successfully");

        Ok(Database { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Loads the user's durable document, defaulting to an empty one for
    /// users seen for the first time.
    pub async fn load_user(&self, user_id: i64) -> Result<UserDoc> {
        let row = sqlx::query("SELECT doc FROM user_store WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let doc: String = row.try_get("doc")?;
                Ok(serde_json::from_str(&doc)?)
            }
            None => Ok(UserDoc::default()),
        }
    }

    pub async fn save_user(&self, user_id: i64, doc: &UserDoc) -> Result<()> {
        let doc_json = serde_json::to_string(doc)?;
        sqlx::query(
            "INSERT INTO user_store (user_id, doc) VALUES (?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET \
             doc = excluded.doc, \
             updated_at = CURRENT_TIMESTAMP",
        )
        .bind(user_id)
        .bind(doc_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Move-to-front insert into the user's recent prompts, capped and
    /// deduped. A user's events are serialized upstream, so read-modify-write
    /// is safe here.
    pub async fn record_prompt(&self, user_id: i64, prompt: &str) -> Result<()> {
        let mut doc = self.load_user(user_id).await?;
        push_recent(&mut doc.recent_prompts, prompt);
        self.save_user(user_id, &doc).await
    }

    /// Overwrites the single saved-settings slot wholesale.
    pub async fn save_settings(&self, user_id: i64, session: &Session) -> Result<()> {
        let mut doc = self.load_user(user_id).await?;
        doc.saved_settings = Some(session.clone());
        doc.saved_at = Some(chrono::Utc::now());
        self.save_user(user_id, &doc).await
    }

    pub async fn load_saved_settings(&self, user_id: i64) -> Result<Option<Session>> {
        Ok(self.load_user(user_id).await?.saved_settings)
    }

    pub async fn recent_prompts(&self, user_id: i64) -> Result<Vec<String>> {
        Ok(self.load_user(user_id).await?.recent_prompts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::history::MAX_RECENT_PROMPTS;
    use crate::wizard::session::{AspectRatio, OutputType, Quality, StylePreset};

    async fn test_db() -> Database {
        Database::init("sqlite::memory:")
            .await
            .expect("in-memory database")
    }

    fn sample_session() -> Session {
        Session {
            prompt: "a red fox".to_string(),
            negative_prompt: "blur".to_string(),
            timeout_seconds: 45,
            num_images: 4,
            quality: Quality::High,
            ratio: AspectRatio::Landscape,
            style: StylePreset::Watercolor,
            output_type: OutputType::Urls,
        }
    }

    #[tokio::test]
    async fn unknown_user_loads_an_empty_document() {
        let db = test_db().await;
        let doc = db.load_user(1).await.unwrap();
        assert!(doc.recent_prompts.is_empty());
        assert!(doc.saved_settings.is_none());
    }

    #[tokio::test]
    async fn recorded_prompts_are_capped_and_deduped() {
        let db = test_db().await;
        for i in 0..8 {
            db.record_prompt(1, &format!("prompt {i}")).await.unwrap();
        }
        db.record_prompt(1, "prompt 4").await.unwrap();

        let prompts = db.recent_prompts(1).await.unwrap();
        assert_eq!(prompts.len(), MAX_RECENT_PROMPTS);
        assert_eq!(prompts[0], "prompt 4");
        assert_eq!(
            prompts.iter().filter(|p| p.as_str() == "prompt 4").count(),
            1
        );
    }

    #[tokio::test]
    async fn saved_settings_round_trip() {
        let db = test_db().await;
        assert!(db.load_saved_settings(1).await.unwrap().is_none());

        let session = sample_session();
        db.save_settings(1, &session).await.unwrap();
        assert_eq!(db.load_saved_settings(1).await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn saving_settings_keeps_recent_prompts() {
        let db = test_db().await;
        db.record_prompt(1, "a red fox").await.unwrap();
        db.save_settings(1, &sample_session()).await.unwrap();

        let doc = db.load_user(1).await.unwrap();
        assert_eq!(doc.recent_prompts, vec!["a red fox"]);
        assert!(doc.saved_settings.is_some());
    }

    #[tokio::test]
    async fn users_do_not_share_documents() {
        let db = test_db().await;
        db.record_prompt(1, "a red fox").await.unwrap();
        assert!(db.recent_prompts(2).await.unwrap().is_empty());
    }
}
