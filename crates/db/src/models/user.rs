use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Regular,
}

/// Staff lifecycle state. Registration starts at `pending`; an admin either
/// approves the account or declines it, which removes the row outright.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "approval_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct User {
    pub id: Uuid,
    /// Login name; the original deployment used the staff member's email.
    pub username: String,
    pub fullname: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: UserRole,
    /// Free-form job title given at registration (manager, nurse, ...).
    pub job_title: Option<String>,
    pub status: ApprovalStatus,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Public projection of a user, safe to put on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct StaffMember {
    pub id: Uuid,
    pub username: String,
    pub fullname: String,
    pub role: UserRole,
    pub job_title: Option<String>,
    pub status: ApprovalStatus,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for StaffMember {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            fullname: user.fullname,
            role: user.role,
            job_title: user.job_title,
            status: user.status,
            icon: user.icon,
            created_at: user.created_at,
        }
    }
}

const USER_COLUMNS: &str =
    "id, username, fullname, password_hash, role, job_title, status, icon, created_at";

impl User {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(pool)
        .await
    }

    /// Insert a new account in `pending` status.
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        username: &str,
        fullname: &str,
        password_hash: &str,
        role: UserRole,
        job_title: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, fullname, password_hash, role, job_title, status)
             VALUES ($1, $2, $3, $4, $5, $6, 'pending')
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(username)
        .bind(fullname)
        .bind(password_hash)
        .bind(role)
        .bind(job_title)
        .fetch_one(pool)
        .await
    }

    pub async fn set_status(
        pool: &SqlitePool,
        id: Uuid,
        status: ApprovalStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET status = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_profile(
        pool: &SqlitePool,
        id: Uuid,
        fullname: &str,
        icon: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET fullname = $2, icon = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(fullname)
        .bind(icon)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_password_hash(
        pool: &SqlitePool,
        username: &str,
        password_hash: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE username = $1")
            .bind(username)
            .bind(password_hash)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Every account except the caller's own, newest first.
    pub async fn find_all_except(
        pool: &SqlitePool,
        caller_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id != $1 ORDER BY created_at DESC"
        ))
        .bind(caller_id)
        .fetch_all(pool)
        .await
    }

    /// Derived read behind the "new registrations awaiting approval" flag.
    pub async fn has_pending(pool: &SqlitePool) -> Result<bool, sqlx::Error> {
        let pending: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE status = 'pending'")
                .fetch_one(pool)
                .await?;
        Ok(pending > 0)
    }
}
