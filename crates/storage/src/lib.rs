use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use shared::{domain::SavedRecipeRecord, error::PersistenceError, protocol::PersistedSlot};

/// The single saved-recipe slot. A save replaces whatever was there; there is
/// no history.
#[async_trait]
pub trait RecipeSlot: Send + Sync {
    async fn save(&self, record: &SavedRecipeRecord) -> Result<(), PersistenceError>;
    /// Returns `None` for an empty slot. A payload that no longer decodes is
    /// treated as empty.
    async fn load(&self) -> Result<Option<SavedRecipeRecord>, PersistenceError>;
    async fn clear(&self) -> Result<(), PersistenceError>;
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        create_database_dir(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn write_slot_payload(&self, payload: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO saved_recipe_slot (slot, payload, updated_at) VALUES (1, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(slot) DO UPDATE SET payload = excluded.payload, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(payload)
        .execute(&self.pool)
        .await
        .context("failed to write saved recipe slot")?;
        Ok(())
    }

    pub async fn read_slot_payload(&self) -> Result<Option<String>> {
        let row = sqlx::query("SELECT payload FROM saved_recipe_slot WHERE slot = 1")
            .fetch_optional(&self.pool)
            .await
            .context("failed to read saved recipe slot")?;
        Ok(row.map(|row| row.get::<String, _>(0)))
    }

    pub async fn delete_slot_payload(&self) -> Result<()> {
        sqlx::query("DELETE FROM saved_recipe_slot WHERE slot = 1")
            .execute(&self.pool)
            .await
            .context("failed to clear saved recipe slot")?;
        Ok(())
    }
}

#[async_trait]
impl RecipeSlot for Storage {
    async fn save(&self, record: &SavedRecipeRecord) -> Result<(), PersistenceError> {
        let payload = encode_slot(record)?;
        self.write_slot_payload(&payload)
            .await
            .map_err(|err| PersistenceError::Write(format!("{err:#}")))?;
        info!(recipe_name = %record.name, steps = record.recipe.len(), "saved recipe to slot");
        Ok(())
    }

    async fn load(&self) -> Result<Option<SavedRecipeRecord>, PersistenceError> {
        let payload = self
            .read_slot_payload()
            .await
            .map_err(|err| PersistenceError::Read(format!("{err:#}")))?;
        Ok(payload.as_deref().and_then(decode_slot))
    }

    async fn clear(&self) -> Result<(), PersistenceError> {
        self.delete_slot_payload()
            .await
            .map_err(|err| PersistenceError::Write(format!("{err:#}")))
    }
}

/// Process-local slot holding the encoded payload, for views that never
/// touch disk and for tests.
#[derive(Default)]
pub struct MemorySlot {
    payload: Mutex<Option<String>>,
    fail_writes: bool,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot whose writes always fail, like a browser store over quota.
    pub fn failing_writes() -> Self {
        Self {
            payload: Mutex::new(None),
            fail_writes: true,
        }
    }

    pub async fn set_raw_payload(&self, payload: impl Into<String>) {
        *self.payload.lock().await = Some(payload.into());
    }

    pub async fn raw_payload(&self) -> Option<String> {
        self.payload.lock().await.clone()
    }
}

#[async_trait]
impl RecipeSlot for MemorySlot {
    async fn save(&self, record: &SavedRecipeRecord) -> Result<(), PersistenceError> {
        if self.fail_writes {
            return Err(PersistenceError::Write("storage quota exceeded".to_string()));
        }
        let payload = encode_slot(record)?;
        *self.payload.lock().await = Some(payload);
        Ok(())
    }

    async fn load(&self) -> Result<Option<SavedRecipeRecord>, PersistenceError> {
        Ok(self.payload.lock().await.as_deref().and_then(decode_slot))
    }

    async fn clear(&self) -> Result<(), PersistenceError> {
        if self.fail_writes {
            return Err(PersistenceError::Write("storage quota exceeded".to_string()));
        }
        *self.payload.lock().await = None;
        Ok(())
    }
}

fn encode_slot(record: &SavedRecipeRecord) -> Result<String, PersistenceError> {
    serde_json::to_string(&PersistedSlot::from_record(record))
        .map_err(|err| PersistenceError::Write(err.to_string()))
}

fn decode_slot(payload: &str) -> Option<SavedRecipeRecord> {
    match serde_json::from_str::<PersistedSlot>(payload) {
        Ok(slot) => slot.into_record(Utc::now()),
        Err(error) => {
            warn!(%error, "failed to load saved recipe; treating slot as empty");
            None
        }
    }
}

/// Creates the directory a file-backed slot database will live in. In-memory
/// databases and non-SQLite URLs have nothing to create.
pub fn create_database_dir(database_url: &str) -> Result<()> {
    match database_file(database_url).as_deref().and_then(Path::parent) {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .with_context(|| format!("cannot create '{}' for the recipe database", dir.display())),
        _ => Ok(()),
    }
}

/// The file behind a `sqlite:` URL, without its `?mode=...` options.
fn database_file(database_url: &str) -> Option<PathBuf> {
    let rest = database_url.strip_prefix("sqlite:")?;
    if rest.starts_with(":memory:") {
        return None;
    }
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let file = rest.split_once('?').map_or(rest, |(file, _)| file);
    (!file.is_empty()).then(|| PathBuf::from(file))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
