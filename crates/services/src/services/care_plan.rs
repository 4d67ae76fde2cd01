//! Care-plan retrieval and the field-level merge engine.

use chrono::Utc;
use db::models::{
    care_plan::{CarePlan, CarePlanResponse, UpdateCarePlan},
    resident::Resident,
    user::User,
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CarePlanError {
    #[error("care plan not found")]
    NotFound,
    #[error("editor not found")]
    EditorNotFound,
    #[error("care plan was modified by another editor")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

type ApplyFn = fn(&mut CarePlan, &UpdateCarePlan) -> bool;

struct FieldMerge {
    name: &'static str,
    apply: ApplyFn,
}

/// Replace `current` when the update carries a different value. Returns
/// whether the stored value actually changed.
fn replace<T: PartialEq + Clone>(current: &mut T, incoming: Option<&T>) -> bool {
    match incoming {
        Some(value) if *current != *value => {
            *current = value.clone();
            true
        }
        _ => false,
    }
}

/// Same as [`replace`] for nullable fields; a transition from unset to set
/// counts as a change.
fn replace_opt<T: PartialEq + Clone>(current: &mut Option<T>, incoming: Option<&T>) -> bool {
    match incoming {
        Some(value) if current.as_ref() != Some(value) => {
            *current = Some(value.clone());
            true
        }
        _ => false,
    }
}

/// One entry per care-plan field. The same table drives both the value merge
/// and the change-timestamp bookkeeping, so a field can never be written
/// without being compared (or compared without being written).
const FIELDS: &[FieldMerge] = &[
    FieldMerge {
        name: "name",
        apply: |p, u| replace(&mut p.name, u.name.as_ref()),
    },
    FieldMerge {
        name: "birthday",
        apply: |p, u| replace(&mut p.birthday, u.birthday.as_ref()),
    },
    FieldMerge {
        name: "room_number",
        apply: |p, u| replace(&mut p.room_number, u.room_number.as_ref()),
    },
    FieldMerge {
        name: "care_instructions",
        apply: |p, u| replace_opt(&mut p.care_instructions, u.care_instructions.as_ref()),
    },
    FieldMerge {
        name: "medication_schedule",
        apply: |p, u| replace_opt(&mut p.medication_schedule, u.medication_schedule.as_ref()),
    },
    FieldMerge {
        name: "age",
        apply: |p, u| replace_opt(&mut p.age, u.age.as_ref()),
    },
    FieldMerge {
        name: "medical_history",
        apply: |p, u| replace_opt(&mut p.medical_history, u.medical_history.as_ref()),
    },
    FieldMerge {
        name: "allergies",
        apply: |p, u| replace_opt(&mut p.allergies, u.allergies.as_ref()),
    },
    FieldMerge {
        name: "medications",
        apply: |p, u| replace_opt(&mut p.medications, u.medications.as_ref()),
    },
    FieldMerge {
        name: "key_contacts",
        apply: |p, u| replace_opt(&mut p.key_contacts, u.key_contacts.as_ref()),
    },
    FieldMerge {
        name: "support",
        apply: |p, u| replace_opt(&mut p.support, u.support.as_ref()),
    },
    FieldMerge {
        name: "behavior",
        apply: |p, u| replace_opt(&mut p.behavior, u.behavior.as_ref()),
    },
    FieldMerge {
        name: "personal_care",
        apply: |p, u| replace_opt(&mut p.personal_care, u.personal_care.as_ref()),
    },
    FieldMerge {
        name: "mobility",
        apply: |p, u| replace_opt(&mut p.mobility, u.mobility.as_ref()),
    },
    FieldMerge {
        name: "sleep",
        apply: |p, u| replace_opt(&mut p.sleep, u.sleep.as_ref()),
    },
    FieldMerge {
        name: "nutrition",
        apply: |p, u| replace_opt(&mut p.nutrition, u.nutrition.as_ref()),
    },
];

pub struct CarePlanService;

impl CarePlanService {
    /// Full care plan for a resident, with the `updates` map parsed and the
    /// resident's icon merged in. Soft-deleted residents read as missing.
    pub async fn get(
        pool: &SqlitePool,
        resident_id: Uuid,
    ) -> Result<CarePlanResponse, CarePlanError> {
        let resident = Resident::find_by_id(pool, resident_id)
            .await?
            .ok_or(CarePlanError::NotFound)?;
        let plan = CarePlan::find_by_resident_id(pool, resident_id)
            .await?
            .ok_or(CarePlanError::NotFound)?;
        Ok(CarePlanResponse::new(plan, resident.icon))
    }

    /// Merge a partial update into the stored care plan.
    ///
    /// Per field: an absent field is retained untouched; a present field is
    /// compared against the stored value and, only when it differs, written
    /// and stamped in the `updates` map. `updated_by` is set to the editor's
    /// username on every merge, changed fields or not. The care-plan row and
    /// the resident's denormalized identity columns are written in a single
    /// transaction.
    pub async fn apply_partial_update(
        pool: &SqlitePool,
        resident_id: Uuid,
        editor_id: Uuid,
        update: &UpdateCarePlan,
    ) -> Result<CarePlanResponse, CarePlanError> {
        let resident = Resident::find_by_id(pool, resident_id)
            .await?
            .ok_or(CarePlanError::NotFound)?;
        let editor = User::find_by_id(pool, editor_id)
            .await?
            .ok_or(CarePlanError::EditorNotFound)?;
        let mut plan = CarePlan::find_by_resident_id(pool, resident_id)
            .await?
            .ok_or(CarePlanError::NotFound)?;

        let base_updated_at = plan.updated_at;
        if let Some(expected) = update.expected_updated_at
            && expected != base_updated_at
        {
            return Err(CarePlanError::Conflict);
        }

        let mut updates = plan.parsed_updates();
        let now = Utc::now();
        let mut changed = Vec::new();
        for field in FIELDS {
            if (field.apply)(&mut plan, update) {
                updates.insert(field.name.to_string(), now);
                changed.push(field.name);
            }
        }
        plan.set_updates(&updates)?;
        plan.updated_by = Some(editor.username.clone());

        let saved = CarePlan::save_merged(pool, &plan, base_updated_at)
            .await?
            .ok_or(CarePlanError::Conflict)?;

        info!(
            resident_id = %resident_id,
            editor = %editor.username,
            changed_fields = ?changed,
            "care plan updated"
        );

        Ok(CarePlanResponse::new(saved, resident.icon))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use db::models::user::{ApprovalStatus, UserRole};

    use super::*;
    use crate::services::test_support::{seed_resident, seed_user, test_db};

    fn update() -> UpdateCarePlan {
        UpdateCarePlan::default()
    }

    #[tokio::test]
    async fn test_first_edit_stamps_only_changed_fields() {
        let db = test_db().await;
        let resident = seed_resident(&db.pool, "Ada", 12).await;
        let editor = seed_user(&db.pool, "carer@example.com", UserRole::Regular, ApprovalStatus::Approved).await;

        let response = CarePlanService::apply_partial_update(
            &db.pool,
            resident.id,
            editor.id,
            &UpdateCarePlan {
                medical_history: Some("Hypertension".to_string()),
                ..update()
            },
        )
        .await
        .unwrap();

        let stamps = response.parsed_updates;
        assert_eq!(stamps.len(), 1);
        assert!(stamps.contains_key("medical_history"));
        assert_eq!(response.plan.medical_history.as_deref(), Some("Hypertension"));
        assert_eq!(response.plan.updated_by.as_deref(), Some("carer@example.com"));
    }

    #[tokio::test]
    async fn test_noop_update_leaves_timestamps_but_sets_editor() {
        let db = test_db().await;
        let resident = seed_resident(&db.pool, "Ada", 12).await;
        let first = seed_user(&db.pool, "first@example.com", UserRole::Regular, ApprovalStatus::Approved).await;
        let second = seed_user(&db.pool, "second@example.com", UserRole::Regular, ApprovalStatus::Approved).await;

        let before = CarePlanService::apply_partial_update(
            &db.pool,
            resident.id,
            first.id,
            &UpdateCarePlan {
                allergies: Some("Penicillin".to_string()),
                ..update()
            },
        )
        .await
        .unwrap();

        // Re-sending identical values must not move any field timestamp,
        // while updated_by still records the second editor.
        let after = CarePlanService::apply_partial_update(
            &db.pool,
            resident.id,
            second.id,
            &UpdateCarePlan {
                name: Some("Ada".to_string()),
                allergies: Some("Penicillin".to_string()),
                ..update()
            },
        )
        .await
        .unwrap();

        assert_eq!(after.parsed_updates, before.parsed_updates);
        assert_eq!(after.plan.updated_by.as_deref(), Some("second@example.com"));
    }

    #[tokio::test]
    async fn test_selective_timestamping() {
        let db = test_db().await;
        let resident = seed_resident(&db.pool, "Ada", 12).await;
        let editor = seed_user(&db.pool, "carer@example.com", UserRole::Regular, ApprovalStatus::Approved).await;

        CarePlanService::apply_partial_update(
            &db.pool,
            resident.id,
            editor.id,
            &UpdateCarePlan {
                medical_history: Some("A".to_string()),
                allergies: Some("A".to_string()),
                ..update()
            },
        )
        .await
        .unwrap();

        let before = CarePlanService::get(&db.pool, resident.id).await.unwrap();
        let allergies_stamp = before.parsed_updates["allergies"];

        let after = CarePlanService::apply_partial_update(
            &db.pool,
            resident.id,
            editor.id,
            &UpdateCarePlan {
                medical_history: Some("B".to_string()),
                allergies: Some("A".to_string()),
                ..update()
            },
        )
        .await
        .unwrap();

        assert!(after.parsed_updates["medical_history"] > allergies_stamp);
        assert_eq!(after.parsed_updates["allergies"], allergies_stamp);
    }

    #[tokio::test]
    async fn test_birthday_equivalent_timestamp_is_not_a_change() {
        let db = test_db().await;
        let resident = seed_resident(&db.pool, "Ada", 12).await;
        let editor = seed_user(&db.pool, "carer@example.com", UserRole::Regular, ApprovalStatus::Approved).await;

        // Wire payloads often carry the stored 1940-05-01 as a timestamp.
        let parsed: UpdateCarePlan = serde_json::from_value(serde_json::json!({
            "birthday": "1940-05-01T23:15:00Z"
        }))
        .unwrap();

        let response =
            CarePlanService::apply_partial_update(&db.pool, resident.id, editor.id, &parsed)
                .await
                .unwrap();

        assert!(!response.parsed_updates.contains_key("birthday"));
        assert_eq!(
            response.plan.birthday,
            NaiveDate::from_ymd_opt(1940, 5, 1).unwrap()
        );
    }

    #[tokio::test]
    async fn test_identity_fields_denormalized_onto_resident() {
        let db = test_db().await;
        let resident = seed_resident(&db.pool, "Ada", 12).await;
        let editor = seed_user(&db.pool, "carer@example.com", UserRole::Regular, ApprovalStatus::Approved).await;

        CarePlanService::apply_partial_update(
            &db.pool,
            resident.id,
            editor.id,
            &UpdateCarePlan {
                name: Some("Ada Lovelace".to_string()),
                room_number: Some(14),
                ..update()
            },
        )
        .await
        .unwrap();

        let refreshed = Resident::find_by_id(&db.pool, resident.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refreshed.name, "Ada Lovelace");
        assert_eq!(refreshed.room_number, 14);
    }

    #[tokio::test]
    async fn test_stale_expected_updated_at_conflicts() {
        let db = test_db().await;
        let resident = seed_resident(&db.pool, "Ada", 12).await;
        let editor = seed_user(&db.pool, "carer@example.com", UserRole::Regular, ApprovalStatus::Approved).await;

        let base = CarePlanService::get(&db.pool, resident.id).await.unwrap();
        CarePlanService::apply_partial_update(
            &db.pool,
            resident.id,
            editor.id,
            &UpdateCarePlan {
                mobility: Some("Walks with frame".to_string()),
                ..update()
            },
        )
        .await
        .unwrap();

        let stale = CarePlanService::apply_partial_update(
            &db.pool,
            resident.id,
            editor.id,
            &UpdateCarePlan {
                mobility: Some("Wheelchair".to_string()),
                expected_updated_at: Some(base.plan.updated_at),
                ..update()
            },
        )
        .await;

        assert!(matches!(stale, Err(CarePlanError::Conflict)));
        let current = CarePlanService::get(&db.pool, resident.id).await.unwrap();
        assert_eq!(current.plan.mobility.as_deref(), Some("Walks with frame"));
    }

    #[tokio::test]
    async fn test_unknown_resident_is_not_found() {
        let db = test_db().await;
        let editor = seed_user(&db.pool, "carer@example.com", UserRole::Regular, ApprovalStatus::Approved).await;

        let missing = Uuid::new_v4();
        assert!(matches!(
            CarePlanService::get(&db.pool, missing).await,
            Err(CarePlanError::NotFound)
        ));
        assert!(matches!(
            CarePlanService::apply_partial_update(&db.pool, missing, editor.id, &update()).await,
            Err(CarePlanError::NotFound)
        ));
    }
}
