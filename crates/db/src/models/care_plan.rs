use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Parsing and serde helpers for calendar dates. Birthdays are compared and
/// stored as plain dates: a wire value carrying a time-of-day or timezone is
/// truncated to its date portion before it ever reaches the merge logic.
pub mod calendar_date {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Result<NaiveDate, String> {
        let raw = raw.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date())
            })
            .or_else(|_| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|dt| dt.date())
            })
            .map_err(|_| format!("unparseable date: {raw}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(de)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn deserialize_opt<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(de)?;
        raw.map(|s| parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// One care plan per resident. `name`, `birthday` and `room_number` are
/// denormalized onto the parent resident row and kept in sync by
/// [`CarePlan::save_merged`].
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct CarePlan {
    pub resident_id: Uuid,
    pub name: String,
    pub birthday: NaiveDate,
    pub room_number: i64,
    pub care_instructions: Option<String>,
    pub medication_schedule: Option<String>,
    pub age: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
    pub medications: Option<String>,
    pub key_contacts: Option<String>,
    pub support: Option<String>,
    pub behavior: Option<String>,
    pub personal_care: Option<String>,
    pub mobility: Option<String>,
    pub sleep: Option<String>,
    pub nutrition: Option<String>,
    /// JSON object mapping field name -> timestamp of its last real change.
    /// Absent until the first edit touches a field. Raw storage form; the
    /// wire carries the parsed map (see [`CarePlanResponse`]).
    #[serde(skip_serializing, default)]
    pub updates: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CarePlan {
    /// Parse the `updates` JSON column. Missing or unreadable data yields an
    /// empty map; entries are only ever added, never removed.
    pub fn parsed_updates(&self) -> BTreeMap<String, DateTime<Utc>> {
        self.updates
            .as_ref()
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default()
    }

    pub fn set_updates(
        &mut self,
        map: &BTreeMap<String, DateTime<Utc>>,
    ) -> Result<(), sqlx::Error> {
        self.updates =
            Some(serde_json::to_string(map).map_err(|e| sqlx::Error::Protocol(e.to_string()))?);
        Ok(())
    }
}

/// Partial update for a care plan. Absent fields leave the stored value and
/// its change timestamp untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateCarePlan {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "calendar_date::deserialize_opt")]
    pub birthday: Option<NaiveDate>,
    pub room_number: Option<i64>,
    pub care_instructions: Option<String>,
    pub medication_schedule: Option<String>,
    pub age: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
    pub medications: Option<String>,
    pub key_contacts: Option<String>,
    pub support: Option<String>,
    pub behavior: Option<String>,
    pub personal_care: Option<String>,
    pub mobility: Option<String>,
    pub sleep: Option<String>,
    pub nutrition: Option<String>,
    /// Optimistic concurrency check: when set, the merge is rejected with a
    /// conflict if the stored `updated_at` no longer matches.
    pub expected_updated_at: Option<DateTime<Utc>>,
}

/// Wire shape for a care plan: the flat record with the `updates` map parsed
/// out and the parent resident's icon merged in.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CarePlanResponse {
    #[serde(flatten)]
    #[ts(flatten)]
    pub plan: CarePlan,
    #[serde(rename = "updates")]
    pub parsed_updates: BTreeMap<String, DateTime<Utc>>,
    pub icon: Option<String>,
}

impl CarePlanResponse {
    pub fn new(plan: CarePlan, icon: Option<String>) -> Self {
        let parsed_updates = plan.parsed_updates();
        Self {
            plan,
            parsed_updates,
            icon,
        }
    }
}

const CARE_PLAN_COLUMNS: &str = "resident_id, name, birthday, room_number, care_instructions, \
     medication_schedule, age, medical_history, allergies, medications, key_contacts, support, \
     behavior, personal_care, mobility, sleep, nutrition, updates, updated_by, created_at, \
     updated_at";

impl CarePlan {
    pub async fn find_by_resident_id(
        pool: &SqlitePool,
        resident_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, CarePlan>(&format!(
            "SELECT {CARE_PLAN_COLUMNS} FROM care_plans WHERE resident_id = $1"
        ))
        .bind(resident_id)
        .fetch_optional(pool)
        .await
    }

    /// Insert the initial care plan for a freshly created resident. All
    /// narrative and clinical fields start unset, `updates` starts empty and
    /// `updated_by` starts null.
    pub async fn create_initial<'e, E>(
        executor: E,
        resident_id: Uuid,
        name: &str,
        birthday: NaiveDate,
        room_number: i64,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        sqlx::query_as::<_, CarePlan>(&format!(
            "INSERT INTO care_plans (resident_id, name, birthday, room_number, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING {CARE_PLAN_COLUMNS}"
        ))
        .bind(resident_id)
        .bind(name)
        .bind(birthday)
        .bind(room_number)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    /// Write back a merged care plan together with the resident's denormalized
    /// identity columns, in one transaction. The write is guarded by a
    /// compare-and-swap on `updated_at`; `None` means another editor won the
    /// race and nothing was written.
    pub async fn save_merged(
        pool: &SqlitePool,
        plan: &CarePlan,
        base_updated_at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE care_plans
             SET name = $2, birthday = $3, room_number = $4, care_instructions = $5,
                 medication_schedule = $6, age = $7, medical_history = $8, allergies = $9,
                 medications = $10, key_contacts = $11, support = $12, behavior = $13,
                 personal_care = $14, mobility = $15, sleep = $16, nutrition = $17,
                 updates = $18, updated_by = $19, updated_at = $20
             WHERE resident_id = $1
               AND datetime(updated_at, 'subsec') = datetime($21, 'subsec')",
        )
        .bind(plan.resident_id)
        .bind(&plan.name)
        .bind(plan.birthday)
        .bind(plan.room_number)
        .bind(&plan.care_instructions)
        .bind(&plan.medication_schedule)
        .bind(&plan.age)
        .bind(&plan.medical_history)
        .bind(&plan.allergies)
        .bind(&plan.medications)
        .bind(&plan.key_contacts)
        .bind(&plan.support)
        .bind(&plan.behavior)
        .bind(&plan.personal_care)
        .bind(&plan.mobility)
        .bind(&plan.sleep)
        .bind(&plan.nutrition)
        .bind(&plan.updates)
        .bind(&plan.updated_by)
        .bind(now)
        .bind(base_updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query("UPDATE residents SET name = $2, birthday = $3, room_number = $4 WHERE id = $1")
            .bind(plan.resident_id)
            .bind(&plan.name)
            .bind(plan.birthday)
            .bind(plan.room_number)
            .execute(&mut *tx)
            .await?;

        let saved = sqlx::query_as::<_, CarePlan>(&format!(
            "SELECT {CARE_PLAN_COLUMNS} FROM care_plans WHERE resident_id = $1"
        ))
        .bind(plan.resident_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(saved))
    }

    pub async fn delete_by_resident_id<'e, E>(
        executor: E,
        resident_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM care_plans WHERE resident_id = $1")
            .bind(resident_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
