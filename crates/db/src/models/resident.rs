use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::care_plan::calendar_date;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Resident {
    pub id: Uuid,
    pub name: String,
    pub birthday: NaiveDate,
    pub room_number: i64,
    /// Opaque reference resolved to a URL by the external image store.
    pub icon: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateResident {
    pub name: String,
    #[serde(deserialize_with = "calendar_date::deserialize")]
    pub birthday: NaiveDate,
    pub room_number: i64,
    pub icon: Option<String>,
}

const RESIDENT_COLUMNS: &str = "id, name, birthday, room_number, icon, is_deleted, created_at";

impl Resident {
    /// Fetch a resident by id; soft-deleted rows are treated as absent.
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Resident>(&format!(
            "SELECT {RESIDENT_COLUMNS} FROM residents WHERE id = $1 AND is_deleted = 0"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Resident>(&format!(
            "SELECT {RESIDENT_COLUMNS} FROM residents WHERE is_deleted = 0 ORDER BY created_at DESC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        data: &CreateResident,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Resident>(&format!(
            "INSERT INTO residents (id, name, birthday, room_number, icon)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {RESIDENT_COLUMNS}"
        ))
        .bind(id)
        .bind(&data.name)
        .bind(data.birthday)
        .bind(data.room_number)
        .bind(&data.icon)
        .fetch_one(executor)
        .await
    }

    /// Flag the resident as deleted without removing the row.
    pub async fn soft_delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE residents SET is_deleted = 1 WHERE id = $1 AND is_deleted = 0")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn update_icon(
        pool: &SqlitePool,
        id: Uuid,
        icon: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Resident>(&format!(
            "UPDATE residents SET icon = $2 WHERE id = $1 AND is_deleted = 0
             RETURNING {RESIDENT_COLUMNS}"
        ))
        .bind(id)
        .bind(icon)
        .fetch_optional(pool)
        .await
    }
}
