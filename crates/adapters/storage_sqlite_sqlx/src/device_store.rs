//! `SQLite` implementation of [`DeviceStore`].

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use lightsync_app::ports::DeviceStore;
use lightsync_domain::device::{DeviceId, DeviceRecord};
use lightsync_domain::error::SyncError;

use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`DeviceRecord`].
struct Wrapper(DeviceRecord);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<DeviceRecord> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("device_id")?;
        let name: String = row.try_get("name")?;
        let command_topic: String = row.try_get("command_topic")?;
        let light_on: bool = row.try_get("is_light_on")?;
        let rgb_mode: bool = row.try_get("is_rgb_mode")?;

        let id = DeviceId::new(id).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(DeviceRecord {
            id,
            name,
            command_topic,
            light_on,
            rgb_mode,
        }))
    }
}

const INSERT_IF_ABSENT: &str = "INSERT OR IGNORE INTO devices (device_id, name, command_topic, is_light_on, is_rgb_mode) VALUES (?, ?, ?, 0, 0)";
const SELECT_BY_ID: &str = "SELECT * FROM devices WHERE device_id = ?";
const SELECT_ALL: &str = "SELECT * FROM devices ORDER BY device_id";
const UPDATE: &str =
    "UPDATE devices SET name = ?, is_light_on = ?, is_rgb_mode = ? WHERE device_id = ?";
const DELETE_BY_ID: &str = "DELETE FROM devices WHERE device_id = ?";

/// `SQLite`-backed device store.
///
/// The command topic is written once on insert and never updated.
pub struct SqliteDeviceStore {
    pool: SqlitePool,
}

impl SqliteDeviceStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl DeviceStore for SqliteDeviceStore {
    fn insert_if_absent(
        &self,
        id: DeviceId,
        topic: String,
        default_name: String,
    ) -> impl Future<Output = Result<bool, SyncError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(INSERT_IF_ABSENT)
                .bind(id.as_str())
                .bind(&default_name)
                .bind(&topic)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(result.rows_affected() == 1)
        }
    }

    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<DeviceRecord>, SyncError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id.as_str())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<DeviceRecord>, SyncError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn update(&self, record: DeviceRecord) -> impl Future<Output = Result<bool, SyncError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(UPDATE)
                .bind(&record.name)
                .bind(record.light_on)
                .bind(record.rgb_mode)
                .bind(record.id.as_str())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(result.rows_affected() == 1)
        }
    }

    fn delete_by_id(&self, id: DeviceId) -> impl Future<Output = Result<bool, SyncError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(DELETE_BY_ID)
                .bind(id.as_str())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(result.rows_affected() == 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::connect;

    async fn setup() -> SqliteDeviceStore {
        SqliteDeviceStore::new(connect("sqlite::memory:").await.unwrap())
    }

    fn id(s: &str) -> DeviceId {
        DeviceId::new(s).unwrap()
    }

    async fn insert(store: &SqliteDeviceStore, name: &str) -> bool {
        store
            .insert_if_absent(
                id(name),
                format!("home/light/{name}"),
                "ESP Device".to_string(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn should_insert_first_sight_row_with_defaults() {
        let store = setup().await;

        assert!(insert(&store, "esp42").await);

        let fetched = store.get_by_id(id("esp42")).await.unwrap().unwrap();
        assert_eq!(
            fetched,
            DeviceRecord::first_sight(id("esp42"), "home/light/esp42")
        );
    }

    #[tokio::test]
    async fn should_not_overwrite_existing_row_when_inserting_again() {
        let store = setup().await;
        insert(&store, "esp42").await;
        let mut record = store.get_by_id(id("esp42")).await.unwrap().unwrap();
        record.name = "Desk".to_string();
        store.update(record).await.unwrap();

        assert!(!insert(&store, "esp42").await);

        let fetched = store.get_by_id(id("esp42")).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Desk");
    }

    #[tokio::test]
    async fn should_return_none_when_device_not_found() {
        let store = setup().await;
        let result = store.get_by_id(id("ghost")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn should_list_all_devices_ordered_by_id() {
        let store = setup().await;
        insert(&store, "c").await;
        insert(&store, "a").await;
        insert(&store, "b").await;

        let ids: Vec<String> = store
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn should_update_mutable_fields_when_device_exists() {
        let store = setup().await;
        insert(&store, "esp42").await;

        let record = DeviceRecord {
            name: "Kitchen".to_string(),
            light_on: true,
            rgb_mode: true,
            ..DeviceRecord::first_sight(id("esp42"), "ignored/topic/esp42")
        };
        assert!(store.update(record).await.unwrap());

        let fetched = store.get_by_id(id("esp42")).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Kitchen");
        assert!(fetched.light_on);
        assert!(fetched.rgb_mode);
        assert_eq!(fetched.command_topic, "home/light/esp42");
    }

    #[tokio::test]
    async fn should_report_false_when_updating_missing_device() {
        let store = setup().await;
        let record = DeviceRecord::first_sight(id("ghost"), "home/light/ghost");
        assert!(!store.update(record).await.unwrap());
    }

    #[tokio::test]
    async fn should_delete_device_once() {
        let store = setup().await;
        insert(&store, "esp42").await;

        assert!(store.delete_by_id(id("esp42")).await.unwrap());
        assert!(!store.delete_by_id(id("esp42")).await.unwrap());
        assert!(store.get_by_id(id("esp42")).await.unwrap().is_none());
    }
}
